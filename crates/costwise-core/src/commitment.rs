//! Savings commitment recommender
//!
//! Commits only to usage that never dropped during the lookback window: the
//! recommended coverage is the strict minimum of the trailing usage-rate
//! series, less whatever is already committed.

use serde::{Deserialize, Serialize};
use statistical::{mean, standard_deviation};

use crate::config::CommitmentConfig;
use crate::error::{Error, Result};
use crate::models::{CostObservation, Provenance, TimeSeries};
use crate::result::{CommitmentRecommendation, CommitmentStatus, NoRecommendationReason};

pub const HOURS_PER_YEAR: f64 = 8760.0;
pub const HOURS_PER_DAY: f64 = 24.0;

/// Commitment term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    OneYear,
    ThreeYear,
}

impl Term {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneYear => "one_year",
            Self::ThreeYear => "three_year",
        }
    }
}

impl std::str::FromStr for Term {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "one_year" | "1y" | "1yr" | "1" => Ok(Self::OneYear),
            "three_year" | "3y" | "3yr" | "3" => Ok(Self::ThreeYear),
            _ => Err(format!("Unknown term: {} (valid: one_year, three_year)", s)),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Commitment payment option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payment {
    NoUpfront,
    PartialUpfront,
    AllUpfront,
}

impl Payment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoUpfront => "no_upfront",
            Self::PartialUpfront => "partial_upfront",
            Self::AllUpfront => "all_upfront",
        }
    }
}

impl std::str::FromStr for Payment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "no_upfront" | "none" => Ok(Self::NoUpfront),
            "partial_upfront" | "partial" => Ok(Self::PartialUpfront),
            "all_upfront" | "all" => Ok(Self::AllUpfront),
            _ => Err(format!(
                "Unknown payment option: {} (valid: no_upfront, partial_upfront, all_upfront)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Payment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hourly usage-rate series from daily costs, optionally limited to some
/// dimensions
pub fn usage_rate_series(observations: &[CostObservation], dimensions: &[String]) -> Vec<f64> {
    let selected: Vec<&CostObservation> = observations
        .iter()
        .filter(|o| dimensions.is_empty() || dimensions.iter().any(|d| *d == o.dimension))
        .collect();
    TimeSeries::daily("usage", selected)
        .values()
        .into_iter()
        .map(|daily| daily / HOURS_PER_DAY)
        .collect()
}

pub struct CommitmentRecommender {
    config: CommitmentConfig,
}

impl CommitmentRecommender {
    pub fn new(config: CommitmentConfig) -> Self {
        Self { config }
    }

    /// Recommend a commitment for an hourly on-demand usage series
    /// (oldest first). `existing` is the $/hour already covered.
    pub fn recommend(
        &self,
        usage: &[f64],
        term: Term,
        payment: Payment,
        existing: f64,
    ) -> Result<CommitmentRecommendation> {
        if !existing.is_finite() || existing < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "existing commitment must be a non-negative $/hour, got {}",
                existing
            )));
        }
        if usage.iter().any(|u| !u.is_finite() || *u < 0.0) {
            return Err(Error::InvalidParameter(
                "usage rates must be non-negative numbers".to_string(),
            ));
        }

        let discount = self.config.discount(term, payment);
        let start = usage.len().saturating_sub(self.config.lookback_periods);
        let window = &usage[start..];

        let mut rec = CommitmentRecommendation {
            term,
            payment,
            status: CommitmentStatus::Recommended,
            hourly_rate: 0.0,
            estimated_annual_savings: 0.0,
            roi: 0.0,
            discount,
            sustained_minimum: 0.0,
            existing_commitment: existing,
            coefficient_of_variation: 0.0,
            lookback_periods: window.len(),
            provenance: Provenance::DataBacked,
        };

        if usage.len() < self.config.min_history || window.len() < 2 {
            rec.status = CommitmentStatus::NoRecommendation(
                NoRecommendationReason::InsufficientHistory,
            );
            return Ok(rec);
        }

        let sustained_min = window.iter().copied().fold(f64::INFINITY, f64::min);
        let avg = mean(window);
        let cv = if avg > 0.0 {
            standard_deviation(window, Some(avg)) / avg
        } else {
            0.0
        };
        rec.sustained_minimum = sustained_min;
        rec.coefficient_of_variation = cv;

        if sustained_min <= 0.0 || cv > self.config.max_volatility {
            rec.status =
                CommitmentStatus::NoRecommendation(NoRecommendationReason::UsageTooVolatile);
            return Ok(rec);
        }
        if existing >= sustained_min {
            rec.status =
                CommitmentStatus::NoRecommendation(NoRecommendationReason::AlreadyCovered);
            return Ok(rec);
        }

        let covered = sustained_min - existing;
        rec.hourly_rate = covered * (1.0 - discount);
        rec.estimated_annual_savings = covered * discount * HOURS_PER_YEAR;
        rec.roi = rec.estimated_annual_savings / (rec.hourly_rate * HOURS_PER_YEAR);

        tracing::debug!(
            "Commitment {} {}: ${:.4}/h covers ${:.4}/h of sustained usage",
            term,
            payment,
            rec.hourly_rate,
            covered
        );
        Ok(rec)
    }
}
