//! Fixed policy record schema
//!
//! Every field carries a canonical snake_case column name, the header used in
//! the source CSV files and its native column kind.

use serde::{Deserialize, Serialize};

/// Native kind of a column before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Date,
}

/// Feature fields of a policy application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Age,
    Gender,
    AnnualIncome,
    MaritalStatus,
    NumberOfDependents,
    EducationLevel,
    Occupation,
    HealthScore,
    Location,
    PolicyType,
    PreviousClaims,
    VehicleAge,
    CreditScore,
    InsuranceDuration,
    PolicyStartDate,
    CustomerFeedback,
    SmokingStatus,
    ExerciseFrequency,
    PropertyType,
}

/// Row identifier column (excluded from features)
pub const ID_HEADER: &str = "id";

/// Target column header (training file only)
pub const TARGET_HEADER: &str = "Premium Amount";

/// Column added by the tenure deriver
pub const CUSTOMER_TENURE: &str = "customer_tenure";

impl Field {
    /// All feature fields in source file order
    pub const ALL: [Field; 19] = [
        Field::Age,
        Field::Gender,
        Field::AnnualIncome,
        Field::MaritalStatus,
        Field::NumberOfDependents,
        Field::EducationLevel,
        Field::Occupation,
        Field::HealthScore,
        Field::Location,
        Field::PolicyType,
        Field::PreviousClaims,
        Field::VehicleAge,
        Field::CreditScore,
        Field::InsuranceDuration,
        Field::PolicyStartDate,
        Field::CustomerFeedback,
        Field::SmokingStatus,
        Field::ExerciseFrequency,
        Field::PropertyType,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Age => "age",
            Field::Gender => "gender",
            Field::AnnualIncome => "annual_income",
            Field::MaritalStatus => "marital_status",
            Field::NumberOfDependents => "number_of_dependents",
            Field::EducationLevel => "education_level",
            Field::Occupation => "occupation",
            Field::HealthScore => "health_score",
            Field::Location => "location",
            Field::PolicyType => "policy_type",
            Field::PreviousClaims => "previous_claims",
            Field::VehicleAge => "vehicle_age",
            Field::CreditScore => "credit_score",
            Field::InsuranceDuration => "insurance_duration",
            Field::PolicyStartDate => "policy_start_date",
            Field::CustomerFeedback => "customer_feedback",
            Field::SmokingStatus => "smoking_status",
            Field::ExerciseFrequency => "exercise_frequency",
            Field::PropertyType => "property_type",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            Field::Age => "Age",
            Field::Gender => "Gender",
            Field::AnnualIncome => "Annual Income",
            Field::MaritalStatus => "Marital Status",
            Field::NumberOfDependents => "Number of Dependents",
            Field::EducationLevel => "Education Level",
            Field::Occupation => "Occupation",
            Field::HealthScore => "Health Score",
            Field::Location => "Location",
            Field::PolicyType => "Policy Type",
            Field::PreviousClaims => "Previous Claims",
            Field::VehicleAge => "Vehicle Age",
            Field::CreditScore => "Credit Score",
            Field::InsuranceDuration => "Insurance Duration",
            Field::PolicyStartDate => "Policy Start Date",
            Field::CustomerFeedback => "Customer Feedback",
            Field::SmokingStatus => "Smoking Status",
            Field::ExerciseFrequency => "Exercise Frequency",
            Field::PropertyType => "Property Type",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Field::Age
            | Field::AnnualIncome
            | Field::NumberOfDependents
            | Field::HealthScore
            | Field::PreviousClaims
            | Field::VehicleAge
            | Field::CreditScore
            | Field::InsuranceDuration => ColumnKind::Numeric,
            Field::PolicyStartDate => ColumnKind::Date,
            _ => ColumnKind::Categorical,
        }
    }

    /// Look up a field by its canonical column name
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }
}
