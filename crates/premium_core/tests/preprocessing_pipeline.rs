//! End-to-end preprocessing tests over generated policy files

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use premium_core::imputation::{AgeBand, FillStrategy, FillValue, ImputationRule, Imputer};
use premium_core::tenure::{days_since, TenureBucket};
use premium_core::{Dataset, Preprocessor};
use proptest::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str = "id,Age,Gender,Annual Income,Marital Status,Number of Dependents,Education Level,Occupation,Health Score,Location,Policy Type,Previous Claims,Vehicle Age,Credit Score,Insurance Duration,Policy Start Date,Customer Feedback,Smoking Status,Exercise Frequency,Property Type";

fn processing() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn cell<T: ToString>(missing: bool, value: T) -> String {
    if missing {
        String::new()
    } else {
        value.to_string()
    }
}

fn row(i: usize) -> String {
    let start = processing() - Duration::days(i as i64 * 50) - Duration::hours(3);
    [
        i.to_string(),
        cell(i % 7 == 3, 18 + (i * 3) % 50),
        ["Male", "Female"][i % 2].to_string(),
        cell(i % 5 == 0, 20000 + i * 1000),
        cell(i % 9 == 4, ["Single", "Married", "Divorced"][i % 3]),
        cell(i % 6 == 1, i % 4),
        ["High School", "Bachelor's", "Master's", "PhD"][i % 4].to_string(),
        cell(i % 4 == 2, ["Employed", "Self-Employed", "Unemployed"][i % 3]),
        cell(i % 8 == 5, format!("{:.2}", 10.5 + (i % 30) as f64)),
        ["Urban", "Suburban", "Rural"][i % 3].to_string(),
        ["Basic", "Comprehensive", "Premium"][(i / 2) % 3].to_string(),
        cell(i % 3 == 0, i % 3),
        cell(i % 10 == 7, i % 20),
        cell(i % 11 == 2, 300 + i * 12),
        cell(i % 13 == 6, 1 + i % 9),
        start.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        cell(i % 5 == 3, ["Poor", "Average", "Good"][i % 3]),
        ["Yes", "No"][(i / 3) % 2].to_string(),
        ["Daily", "Weekly", "Monthly", "Rarely"][i % 4].to_string(),
        ["House", "Apartment", "Condo"][(i / 4) % 3].to_string(),
    ]
    .join(",")
}

/// Write `rows` generated records, optionally with a premium column
fn policy_file(rows: usize, labeled: bool) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    if labeled {
        writeln!(file, "{},Premium Amount", HEADER)?;
    } else {
        writeln!(file, "{}", HEADER)?;
    }
    for i in 0..rows {
        if labeled {
            writeln!(file, "{},{}", row(i), 500 + (i * 37) % 2000)?;
        } else {
            writeln!(file, "{}", row(i))?;
        }
    }
    file.flush()?;
    Ok(file)
}

#[test]
fn test_loaded_file_matches_generator() -> Result<()> {
    let file = policy_file(40, true)?;
    let ds = Dataset::from_csv(file.path())?;

    assert_eq!(ds.len(), 40);
    assert_eq!(ds.require_target()?[1], 537.0);

    let report = ds.features.missing_report();
    let income = report.iter().find(|r| r.column == "annual_income").unwrap();
    assert_eq!(income.missing, 8);
    assert!((income.percent - 20.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_young_applicants_get_zero_income() -> Result<()> {
    let ds = Dataset::from_csv(policy_file(40, true)?.path())?;
    let (_, imputed) = Imputer::standard().fit_transform(&ds.features)?;

    let ages = ds.features.numeric("age")?;
    let raw_income = ds.features.numeric("annual_income")?;
    let income = imputed.numeric("annual_income")?;
    let raw_occupation = ds.features.categorical("occupation")?;
    let occupation = imputed.categorical("occupation")?;

    let mut young = 0;
    for i in 0..ds.len() {
        if raw_income[i].is_none() && ages[i].is_some_and(|a| a <= 22.0) {
            assert_eq!(income[i], Some(0.0));
            young += 1;
        }
        if raw_occupation[i].is_none() && ages[i].is_some_and(|a| a <= 22.0 || a >= 60.0) {
            assert_eq!(occupation[i].as_deref(), Some("Unemployed"));
        }
    }
    assert!(young > 0, "generator should produce a young applicant with missing income");

    for column in ["annual_income", "number_of_dependents", "previous_claims", "credit_score", "health_score", "age"] {
        assert!(
            imputed.numeric(column)?.iter().all(Option::is_some),
            "{} still has missing values",
            column
        );
    }
    assert!(imputed
        .categorical("customer_feedback")?
        .iter()
        .all(Option::is_some));
    Ok(())
}

#[test]
fn test_feature_matrix_layout() -> Result<()> {
    let ds = Dataset::from_csv(policy_file(40, true)?.path())?;
    let (_, matrix) = Preprocessor::new(Some(processing())).fit_transform(&ds.features)?;

    assert_eq!(matrix.n_rows(), 40);
    assert!(matrix.column_index("policy_start_date").is_none());
    assert!(matrix.column_index("gender").is_none());
    assert!(matrix.column_index("customer_tenure").is_some());
    assert!(matrix.column_index("gender_Male").is_some());
    // "Female" sorts first and is the dropped reference level
    assert!(matrix.column_index("gender_Female").is_none());
    assert!(matrix.column_index("marital_status_nan").is_some());

    let income = matrix.column("annual_income").unwrap();
    assert!(income.iter().all(|v| v.is_finite()));

    // imputed "Unknown" feedback is missing again after encoding
    let feedback = matrix.column("customer_feedback").unwrap();
    for (i, value) in feedback.iter().enumerate() {
        assert_eq!(value.is_nan(), i % 5 == 3, "row {}", i);
    }

    // row i started i * 50 days (plus a few hours) before processing
    let tenure = matrix.column("customer_tenure").unwrap();
    for (i, value) in tenure.iter().enumerate() {
        let start = processing() - Duration::days(i as i64 * 50) - Duration::hours(3);
        let expected = match TenureBucket::from_days(days_since(start, processing())) {
            TenureBucket::New => 0.0,
            TenureBucket::Regular => 1.0,
            TenureBucket::LongTerm => 2.0,
        };
        assert_eq!(*value, expected, "row {}", i);
    }
    Ok(())
}

#[test]
fn test_refit_free_transform_is_bit_identical() -> Result<()> {
    let file = policy_file(30, true)?;
    let ds = Dataset::from_csv(file.path())?;
    let (fitted, first) = Preprocessor::new(Some(processing())).fit_transform(&ds.features)?;

    let again = Dataset::from_csv(file.path())?;
    let second = fitted.transform(&again.features)?;

    assert_eq!(first.names(), second.names());
    for i in 0..first.n_rows() {
        let a: Vec<u64> = first.row(i).iter().map(|v| v.to_bits()).collect();
        let b: Vec<u64> = second.row(i).iter().map(|v| v.to_bits()).collect();
        assert_eq!(a, b, "row {}", i);
    }
    Ok(())
}

#[test]
fn test_unlabeled_rows_use_training_state() -> Result<()> {
    let train = Dataset::from_csv(policy_file(40, true)?.path())?;
    let test = Dataset::from_csv(policy_file(12, false)?.path())?;
    assert!(test.target.is_none());

    let (fitted, train_matrix) =
        Preprocessor::new(Some(processing())).fit_transform(&train.features)?;
    let test_matrix = fitted.transform(&test.features)?;

    assert_eq!(test_matrix.names(), train_matrix.names());
    assert_eq!(test_matrix.n_rows(), 12);
    // the first twelve rows are shared, so their encoding must agree
    for i in 0..12 {
        let a: Vec<u64> = train_matrix.row(i).iter().map(|v| v.to_bits()).collect();
        let b: Vec<u64> = test_matrix.row(i).iter().map(|v| v.to_bits()).collect();
        assert_eq!(a, b, "row {}", i);
    }
    Ok(())
}

#[test]
fn test_end_to_end_income_example() -> Result<()> {
    use premium_core::{Column, Table};

    let table = Table::from_columns(vec![
        Column::numeric("age", vec![Some(20.0), Some(30.0), Some(61.0), Some(45.0)]),
        Column::numeric(
            "annual_income",
            vec![None, Some(50000.0), None, Some(60000.0)],
        ),
    ])?;
    let rule = |otherwise| {
        ImputationRule::when_age(
            "annual_income",
            AgeBand::at_most(22.0),
            FillValue::Number(0.0),
            otherwise,
        )
    };

    let imputer = Imputer::new(vec![rule(FillStrategy::Median), ImputationRule::median("age")])?;
    let (_, out) = imputer.fit_transform(&table)?;
    assert_eq!(
        out.numeric("annual_income")?,
        &[Some(0.0), Some(50000.0), Some(50000.0), Some(60000.0)]
    );

    // with no young applicant the fallthrough median sees only observed values
    let mut older = table.clone();
    older.drop_column("age")?;
    older.add_column(Column::numeric(
        "age",
        vec![Some(25.0), Some(30.0), Some(61.0), Some(45.0)],
    ))?;
    let (fitted, _) = imputer.fit_transform(&older)?;
    assert_eq!(fitted.median("annual_income"), Some(55000.0));
    Ok(())
}

fn income_imputer() -> Imputer {
    Imputer::new(vec![
        ImputationRule::when_age(
            "annual_income",
            AgeBand::at_most(22.0),
            FillValue::Number(0.0),
            FillStrategy::Median,
        ),
        ImputationRule::median("age"),
    ])
    .unwrap()
}

proptest! {
    #[test]
    fn imputed_income_respects_age_rule(
        rows in prop::collection::vec((18.0f64..80.0, prop::option::of(1.0f64..1e6)), 1..60),
    ) {
        let ages: Vec<Option<f64>> = rows.iter().map(|(a, _)| Some(*a)).collect();
        let incomes: Vec<Option<f64>> = rows.iter().map(|(_, i)| *i).collect();
        prop_assume!(rows.iter().any(|(a, i)| i.is_some() || *a <= 22.0));

        let table = premium_core::Table::from_columns(vec![
            premium_core::Column::numeric("age", ages.clone()),
            premium_core::Column::numeric("annual_income", incomes.clone()),
        ]).unwrap();
        let (fitted, out) = income_imputer().fit_transform(&table).unwrap();
        let filled = out.numeric("annual_income").unwrap();
        let median = fitted.median("annual_income").unwrap();

        for i in 0..rows.len() {
            match incomes[i] {
                Some(v) => prop_assert_eq!(filled[i], Some(v)),
                None if ages[i].unwrap() <= 22.0 => prop_assert_eq!(filled[i], Some(0.0)),
                None => prop_assert_eq!(filled[i], Some(median)),
            }
        }
    }

    #[test]
    fn tenure_bucket_is_monotonic(a in 0i64..5000, b in 0i64..5000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let rank = |d| TenureBucket::from_days(d) as u8;
        prop_assert!(rank(lo) <= rank(hi));
    }
}
