//! Customer tenure derivation
//!
//! Replaces the policy start timestamp with a tenure bucket computed against a
//! processing time. The processing time defaults to the local clock, so two
//! runs on different days can bucket the same row differently; pin it through
//! the configuration for reproducible runs.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

use crate::errors::{PremiumError, Result};
use crate::schema::{Field, CUSTOMER_TENURE};
use crate::table::{Column, Table};

/// Last day counted as a new customer
pub const NEW_CUSTOMER_DAYS: i64 = 365;

/// Last day counted as a regular customer
pub const REGULAR_CUSTOMER_DAYS: i64 = 365 * 3;

/// Tenure bucket, closed on the lower bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenureBucket {
    New,
    Regular,
    LongTerm,
}

impl TenureBucket {
    pub fn from_days(days: i64) -> Self {
        if days <= NEW_CUSTOMER_DAYS {
            TenureBucket::New
        } else if days <= REGULAR_CUSTOMER_DAYS {
            TenureBucket::Regular
        } else {
            TenureBucket::LongTerm
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TenureBucket::New => "New Customer",
            TenureBucket::Regular => "Regular Customer",
            TenureBucket::LongTerm => "Long Term Customer",
        }
    }
}

impl fmt::Display for TenureBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whole days elapsed between `start` and `processing`
pub fn days_since(start: NaiveDateTime, processing: NaiveDateTime) -> i64 {
    (processing - start).num_days()
}

/// Adds `customer_tenure` and drops `policy_start_date`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TenureDeriver {
    processing: NaiveDateTime,
}

impl TenureDeriver {
    pub fn new(processing: NaiveDateTime) -> Self {
        Self { processing }
    }

    /// Late-bound processing time from the local clock
    pub fn now() -> Self {
        Self::new(Local::now().naive_local())
    }

    pub fn processing_time(&self) -> NaiveDateTime {
        self.processing
    }

    #[instrument(skip_all, fields(processing = %self.processing))]
    pub fn derive(&self, table: &Table) -> Result<Table> {
        let source = Field::PolicyStartDate.name();
        let starts = table.date(source)?;

        let mut buckets = Vec::with_capacity(starts.len());
        let mut counts = [0usize; 3];
        for start in starts {
            let start = start.ok_or_else(|| PremiumError::UncoveredMissing {
                column: source.to_string(),
                count: starts.iter().filter(|s| s.is_none()).count(),
            })?;
            let bucket = TenureBucket::from_days(days_since(start, self.processing));
            counts[bucket as usize] += 1;
            buckets.push(Some(bucket.label()));
        }

        let mut out = table.clone();
        out.drop_column(source)?;
        out.add_column(Column::categorical(CUSTOMER_TENURE, buckets))?;

        info!(
            "Derived tenure: {} new, {} regular, {} long term",
            counts[0], counts[1], counts[2]
        );
        Ok(out)
    }
}
