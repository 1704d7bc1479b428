//! Rule-based and statistical imputation
//!
//! Each column carries exactly one [`ImputationRule`]. Application runs in two
//! phases: every conditional and constant fill first, then one shared median
//! estimator over the columns whose strategy ends in [`FillStrategy::Median`].
//! The medians are fitted on the partially imputed table, so they see the
//! conditional fills (income 0 for young applicants, for example).

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::{PremiumError, Result};
use crate::schema::{ColumnKind, Field};
use crate::table::Table;

/// Age range that triggers a conditional fill. Bounds are inclusive; a row
/// with missing age never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBand {
    pub at_most: Option<f64>,
    pub at_least: Option<f64>,
}

impl AgeBand {
    /// age <= limit
    pub fn at_most(limit: f64) -> Self {
        Self {
            at_most: Some(limit),
            at_least: None,
        }
    }

    /// age <= young OR age >= old
    pub fn outside(young: f64, old: f64) -> Self {
        Self {
            at_most: Some(young),
            at_least: Some(old),
        }
    }

    pub fn contains(&self, age: Option<f64>) -> bool {
        let Some(age) = age else { return false };
        self.at_most.is_some_and(|m| age <= m) || self.at_least.is_some_and(|m| age >= m)
    }
}

/// Value written into a missing cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillValue {
    Number(f64),
    Category(String),
}

impl FillValue {
    fn kind(&self) -> ColumnKind {
        match self {
            FillValue::Number(_) => ColumnKind::Numeric,
            FillValue::Category(_) => ColumnKind::Categorical,
        }
    }
}

/// How a column's missing values are repaired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillStrategy {
    /// Fixed value for every missing cell
    Constant(FillValue),
    /// Member of the shared median estimator
    Median,
    /// Left missing for native handling downstream
    Passthrough,
    /// Fill rows whose age falls in `band`; the others fall through
    WhenAge {
        band: AgeBand,
        value: FillValue,
        otherwise: Box<FillStrategy>,
    },
}

impl FillStrategy {
    /// Strategy applied to rows no conditional matched
    fn terminal(&self) -> &FillStrategy {
        match self {
            FillStrategy::WhenAge { otherwise, .. } => otherwise.terminal(),
            other => other,
        }
    }

    /// Whether every missing cell is guaranteed to be filled
    pub fn fills_all(&self) -> bool {
        !matches!(self.terminal(), FillStrategy::Passthrough)
    }
}

/// Binding of one column to its fill strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationRule {
    pub column: String,
    pub strategy: FillStrategy,
}

impl ImputationRule {
    pub fn constant(column: impl Into<String>, value: FillValue) -> Self {
        Self {
            column: column.into(),
            strategy: FillStrategy::Constant(value),
        }
    }

    pub fn median(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            strategy: FillStrategy::Median,
        }
    }

    pub fn passthrough(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            strategy: FillStrategy::Passthrough,
        }
    }

    pub fn when_age(
        column: impl Into<String>,
        band: AgeBand,
        value: FillValue,
        otherwise: FillStrategy,
    ) -> Self {
        Self {
            column: column.into(),
            strategy: FillStrategy::WhenAge {
                band,
                value,
                otherwise: Box::new(otherwise),
            },
        }
    }
}

/// Unfitted rule set
#[derive(Debug, Clone, PartialEq)]
pub struct Imputer {
    rules: Vec<ImputationRule>,
    age_column: String,
}

impl Imputer {
    /// Build an imputer; each column may carry only one rule
    pub fn new(rules: Vec<ImputationRule>) -> Result<Self> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.column == rule.column) {
                return Err(PremiumError::SchemaMismatch(format!(
                    "column '{}' has more than one imputation rule",
                    rule.column
                )));
            }
        }
        Ok(Self {
            rules,
            age_column: Field::Age.name().to_string(),
        })
    }

    /// Rule set for the policy schema
    pub fn standard() -> Self {
        let rules = vec![
            ImputationRule::when_age(
                Field::AnnualIncome.name(),
                AgeBand::at_most(22.0),
                FillValue::Number(0.0),
                FillStrategy::Median,
            ),
            ImputationRule::when_age(
                Field::Occupation.name(),
                AgeBand::outside(22.0, 60.0),
                FillValue::Category("Unemployed".into()),
                FillStrategy::Passthrough,
            ),
            ImputationRule::constant(Field::NumberOfDependents.name(), FillValue::Number(0.0)),
            ImputationRule::constant(
                Field::CustomerFeedback.name(),
                FillValue::Category("Unknown".into()),
            ),
            ImputationRule::constant(Field::PreviousClaims.name(), FillValue::Number(0.0)),
            ImputationRule::median(Field::CreditScore.name()),
            ImputationRule::median(Field::HealthScore.name()),
            ImputationRule::median(Field::Age.name()),
            ImputationRule::passthrough(Field::MaritalStatus.name()),
            ImputationRule::passthrough(Field::VehicleAge.name()),
            ImputationRule::passthrough(Field::InsuranceDuration.name()),
        ];
        Self {
            rules,
            age_column: Field::Age.name().to_string(),
        }
    }

    pub fn rules(&self) -> &[ImputationRule] {
        &self.rules
    }

    fn rule_for(&self, column: &str) -> Option<&ImputationRule> {
        self.rules.iter().find(|r| r.column == column)
    }

    /// Columns feeding the shared median estimator, in rule order
    pub fn median_columns(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| matches!(r.strategy.terminal(), FillStrategy::Median))
            .map(|r| r.column.as_str())
            .collect()
    }

    /// Check rule targets and missing-value coverage
    pub fn validate(&self, table: &Table) -> Result<()> {
        for rule in &self.rules {
            let kind = table.column(&rule.column)?.data.kind();
            check_strategy_kind(&rule.column, &rule.strategy, kind)?;
            if matches!(rule.strategy, FillStrategy::WhenAge { .. }) {
                table.numeric(&self.age_column)?;
            }
        }

        for column in table.columns() {
            let missing = column.data.missing_count();
            if missing > 0 && self.rule_for(&column.name).is_none() {
                return Err(PremiumError::UncoveredMissing {
                    column: column.name.clone(),
                    count: missing,
                });
            }
        }
        Ok(())
    }

    /// Fit the median estimator on the rule-filled table
    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn fit(&self, table: &Table) -> Result<FittedImputer> {
        self.validate(table)?;
        let filled = self.apply_rules(table)?;

        let mut medians = Vec::new();
        for column in self.median_columns() {
            let median = median(filled.numeric(column)?)
                .ok_or_else(|| PremiumError::EmptyColumn(column.to_string()))?;
            debug!("Median for {}: {}", column, median);
            medians.push((column.to_string(), median));
        }

        Ok(FittedImputer {
            imputer: self.clone(),
            medians,
        })
    }

    /// Fit and apply in one pass
    pub fn fit_transform(&self, table: &Table) -> Result<(FittedImputer, Table)> {
        let fitted = self.fit(table)?;
        let imputed = fitted.transform(table)?;
        Ok((fitted, imputed))
    }

    /// Phase one: conditional and constant fills
    fn apply_rules(&self, table: &Table) -> Result<Table> {
        let mut out = table.clone();
        let ages: Vec<Option<f64>> = match table.numeric(&self.age_column) {
            Ok(v) => v.to_vec(),
            Err(_) => vec![None; table.len()],
        };

        for rule in &self.rules {
            let mut strategy = &rule.strategy;
            let mut filled = 0usize;
            loop {
                match strategy {
                    FillStrategy::WhenAge {
                        band,
                        value,
                        otherwise,
                    } => {
                        filled += fill_where(&mut out, &rule.column, value, |row| band.contains(ages[row]))?;
                        strategy = otherwise.as_ref();
                    }
                    FillStrategy::Constant(value) => {
                        filled += fill_where(&mut out, &rule.column, value, |_| true)?;
                        break;
                    }
                    FillStrategy::Median | FillStrategy::Passthrough => break,
                }
            }
            if filled > 0 {
                debug!("Rule on {} filled {} cells", rule.column, filled);
            }
        }
        Ok(out)
    }
}

/// Imputer with fitted medians
#[derive(Debug, Clone, PartialEq)]
pub struct FittedImputer {
    imputer: Imputer,
    medians: Vec<(String, f64)>,
}

impl FittedImputer {
    /// Fitted medians, one per median column
    pub fn medians(&self) -> &[(String, f64)] {
        &self.medians
    }

    pub fn median(&self, column: &str) -> Option<f64> {
        self.medians
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, m)| *m)
    }

    /// Apply both phases with the stored medians
    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn transform(&self, table: &Table) -> Result<Table> {
        self.imputer.validate(table)?;
        let mut out = self.imputer.apply_rules(table)?;

        for (column, median) in &self.medians {
            let value = FillValue::Number(*median);
            let filled = fill_where(&mut out, column, &value, |_| true)?;
            if filled > 0 {
                debug!("Median fill on {} wrote {} cells", column, filled);
            }
        }

        let remaining: usize = self
            .imputer
            .rules
            .iter()
            .filter(|r| !r.strategy.fills_all())
            .map(|r| out.column(&r.column).map(|c| c.data.missing_count()).unwrap_or(0))
            .sum();
        info!(
            "Imputation complete: {} rows, {} cells left missing for native handling",
            out.len(),
            remaining
        );
        Ok(out)
    }
}

fn check_strategy_kind(column: &str, strategy: &FillStrategy, kind: ColumnKind) -> Result<()> {
    let ok = match strategy {
        FillStrategy::Constant(value) => value.kind() == kind,
        FillStrategy::Median => kind == ColumnKind::Numeric,
        FillStrategy::Passthrough => true,
        FillStrategy::WhenAge {
            value, otherwise, ..
        } => {
            check_strategy_kind(column, otherwise, kind)?;
            value.kind() == kind
        }
    };
    if ok {
        Ok(())
    } else {
        Err(PremiumError::SchemaMismatch(format!(
            "imputation rule for '{}' does not fit a {:?} column",
            column, kind
        )))
    }
}

/// Fill missing cells of `column` on rows selected by `pred`, returning the
/// number of cells written
fn fill_where<F>(table: &mut Table, column: &str, value: &FillValue, pred: F) -> Result<usize>
where
    F: Fn(usize) -> bool,
{
    let mut filled = 0;
    match value {
        FillValue::Number(v) => {
            for (row, cell) in table.numeric_mut(column)?.iter_mut().enumerate() {
                if cell.is_none() && pred(row) {
                    *cell = Some(*v);
                    filled += 1;
                }
            }
        }
        FillValue::Category(v) => {
            for (row, cell) in table.categorical_mut(column)?.iter_mut().enumerate() {
                if cell.is_none() && pred(row) {
                    *cell = Some(v.clone());
                    filled += 1;
                }
            }
        }
    }
    Ok(filled)
}

/// Median of the observed values; even counts average the two middle values
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
    if observed.is_empty() {
        return None;
    }
    observed.sort_by(|a, b| a.total_cmp(b));
    let len = observed.len();
    Some(if len % 2 == 0 {
        (observed[len / 2 - 1] + observed[len / 2]) / 2.0
    } else {
        observed[len / 2]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn income_table(ages: Vec<Option<f64>>, incomes: Vec<Option<f64>>) -> Table {
        Table::from_columns(vec![
            Column::numeric("age", ages),
            Column::numeric("annual_income", incomes),
        ])
        .unwrap()
    }

    fn income_only() -> Imputer {
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

    #[test]
    fn test_conditional_then_median_fallthrough() {
        let table = income_table(
            vec![Some(20.0), Some(30.0), Some(61.0), Some(45.0)],
            vec![None, Some(50000.0), None, Some(60000.0)],
        );
        let (fitted, out) = income_only().fit_transform(&table).unwrap();
        // the median is taken after the conditional zero: median(0, 50000, 60000)
        assert_eq!(fitted.median("annual_income"), Some(50000.0));
        assert_eq!(
            out.numeric("annual_income").unwrap(),
            &[Some(0.0), Some(50000.0), Some(50000.0), Some(60000.0)]
        );
    }

    #[test]
    fn test_missing_age_never_matches_band() {
        let band = AgeBand::outside(22.0, 60.0);
        assert!(!band.contains(None));
        assert!(band.contains(Some(22.0)));
        assert!(band.contains(Some(60.0)));
        assert!(!band.contains(Some(40.0)));
    }

    #[test]
    fn test_occupation_rule_overlaps_income_rule() {
        let table = Table::from_columns(vec![
            Column::numeric("age", vec![Some(18.0), Some(65.0), Some(40.0)]),
            Column::numeric("annual_income", vec![None, None, None]),
            Column::categorical("occupation", vec![None::<&str>, None, None]),
        ])
        .unwrap();
        let imputer = Imputer::new(vec![
            ImputationRule::when_age(
                "annual_income",
                AgeBand::at_most(22.0),
                FillValue::Number(0.0),
                FillStrategy::Passthrough,
            ),
            ImputationRule::when_age(
                "occupation",
                AgeBand::outside(22.0, 60.0),
                FillValue::Category("Unemployed".into()),
                FillStrategy::Passthrough,
            ),
        ])
        .unwrap();
        let (_, out) = imputer.fit_transform(&table).unwrap();
        assert_eq!(out.numeric("annual_income").unwrap(), &[Some(0.0), None, None]);
        assert_eq!(
            out.categorical("occupation").unwrap(),
            &[Some("Unemployed".to_string()), Some("Unemployed".to_string()), None]
        );
    }

    #[test]
    fn test_uncovered_missing_is_fatal() {
        let table = Table::from_columns(vec![
            Column::numeric("age", vec![Some(30.0), Some(40.0)]),
            Column::numeric("vehicle_age", vec![Some(1.0), None]),
        ])
        .unwrap();
        let imputer = Imputer::new(vec![ImputationRule::median("age")]).unwrap();
        let err = imputer.fit(&table).unwrap_err();
        assert!(matches!(err, PremiumError::UncoveredMissing { count: 1, .. }));
    }

    #[test]
    fn test_rule_on_absent_column_is_fatal() {
        let table = income_table(vec![Some(30.0)], vec![Some(1.0)]);
        let imputer = Imputer::new(vec![ImputationRule::median("credit_score")]).unwrap();
        assert!(matches!(
            imputer.validate(&table),
            Err(PremiumError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_duplicate_rules_rejected() {
        let err = Imputer::new(vec![
            ImputationRule::median("age"),
            ImputationRule::passthrough("age"),
        ])
        .unwrap_err();
        assert!(matches!(err, PremiumError::SchemaMismatch(_)));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let table = income_table(vec![Some(30.0)], vec![Some(1.0)]);
        let imputer = Imputer::new(vec![ImputationRule::constant(
            "annual_income",
            FillValue::Category("none".into()),
        )])
        .unwrap();
        assert!(imputer.validate(&table).is_err());
    }

    #[test]
    fn test_all_missing_median_column() {
        let table = income_table(vec![None, None], vec![Some(1.0), Some(2.0)]);
        let imputer = Imputer::new(vec![ImputationRule::median("age")]).unwrap();
        assert!(matches!(
            imputer.fit(&table),
            Err(PremiumError::EmptyColumn(ref c)) if c == "age"
        ));
    }

    #[test]
    fn test_fitted_medians_reused_on_new_data() {
        let train = income_table(
            vec![Some(30.0), Some(40.0), Some(50.0)],
            vec![Some(10.0), Some(20.0), Some(90.0)],
        );
        let fitted = income_only().fit(&train).unwrap();
        let fresh = income_table(vec![None, Some(35.0)], vec![Some(1.0), None]);
        let out = fitted.transform(&fresh).unwrap();
        assert_eq!(out.numeric("age").unwrap(), &[Some(40.0), Some(35.0)]);
        assert_eq!(out.numeric("annual_income").unwrap(), &[Some(1.0), Some(20.0)]);
    }

    #[test]
    fn test_median_helper() {
        assert_eq!(median(&[Some(3.0), None, Some(1.0), Some(2.0)]), Some(2.0));
        assert_eq!(median(&[Some(4.0), Some(1.0)]), Some(2.5));
        assert_eq!(median(&[None]), None);
    }

    #[test]
    fn test_standard_rules_cover_one_column_each() {
        let imputer = Imputer::standard();
        assert!(Imputer::new(imputer.rules().to_vec()).is_ok());
        assert_eq!(
            imputer.median_columns(),
            vec!["annual_income", "credit_score", "health_score", "age"]
        );
    }
}
