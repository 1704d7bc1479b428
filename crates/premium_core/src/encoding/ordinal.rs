//! Ordinal encoding against explicit category orders

use serde::{Deserialize, Serialize};

use crate::errors::{PremiumError, Result};
use crate::schema::{Field, CUSTOMER_TENURE};
use crate::table::Table;
use crate::tenure::TenureBucket;

/// Explicit total order over an ordinal field's levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOrder {
    pub column: String,
    pub levels: Vec<String>,
    /// Level that is ranked during encoding and then reset to missing
    pub sentinel: Option<String>,
}

impl CategoryOrder {
    pub fn new<S: Into<String>>(column: impl Into<String>, levels: Vec<S>) -> Self {
        Self {
            column: column.into(),
            levels: levels.into_iter().map(Into::into).collect(),
            sentinel: None,
        }
    }

    /// Mark an existing level as "unobserved"
    pub fn with_sentinel(mut self, level: impl Into<String>) -> Self {
        self.sentinel = Some(level.into());
        self
    }

    /// Zero-based rank of a level
    pub fn rank(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == level)
    }

    fn sentinel_rank(&self) -> Option<usize> {
        self.sentinel.as_deref().and_then(|s| self.rank(s))
    }

    /// Encode a column. Missing stays missing (`NaN`), as does the sentinel.
    pub fn encode(&self, values: &[Option<String>]) -> Result<Vec<f64>> {
        let sentinel = self.sentinel_rank();
        values
            .iter()
            .map(|v| match v {
                None => Ok(f64::NAN),
                Some(level) => {
                    let rank = self.rank(level).ok_or_else(|| PremiumError::UnknownCategory {
                        column: self.column.clone(),
                        value: level.clone(),
                    })?;
                    if Some(rank) == sentinel {
                        Ok(f64::NAN)
                    } else {
                        Ok(rank as f64)
                    }
                }
            })
            .collect()
    }
}

/// Set of ordinal columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    orders: Vec<CategoryOrder>,
}

impl OrdinalEncoder {
    pub fn new(orders: Vec<CategoryOrder>) -> Self {
        Self { orders }
    }

    /// Education, feedback (with the "Unknown" sentinel) and tenure
    pub fn standard() -> Self {
        Self::new(vec![
            CategoryOrder::new(
                Field::EducationLevel.name(),
                vec!["High School", "Bachelor's", "Master's", "PhD"],
            ),
            CategoryOrder::new(
                Field::CustomerFeedback.name(),
                vec!["Poor", "Average", "Good", "Unknown"],
            )
            .with_sentinel("Unknown"),
            CategoryOrder::new(
                CUSTOMER_TENURE,
                vec![
                    TenureBucket::New.label(),
                    TenureBucket::Regular.label(),
                    TenureBucket::LongTerm.label(),
                ],
            ),
        ])
    }

    pub fn orders(&self) -> &[CategoryOrder] {
        &self.orders
    }

    pub fn order_for(&self, column: &str) -> Option<&CategoryOrder> {
        self.orders.iter().find(|o| o.column == column)
    }

    /// Check that every ordinal column is present and all observed levels rank
    pub fn validate(&self, table: &Table) -> Result<()> {
        for order in &self.orders {
            order.encode(table.categorical(&order.column)?)?;
        }
        Ok(())
    }
}
