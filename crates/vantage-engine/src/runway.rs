//! Runway: months of cash left at the current burn.
//!
//! Pure function of (company facts, now). Missing cash or burn is a typed
//! absence (`months: None`), never a default — the issue detector turns it
//! into DATA_MISSING. Zero or negative burn with cash present is *infinite*
//! runway, a distinct state that triggers no runway issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vantage_model::Company;

use crate::weights::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runway {
    /// Months of runway. None when cash/burn is missing or burn is ≤ 0.
    pub months: Option<f64>,
    /// True when burn ≤ 0 and cash is known: the company is not consuming cash.
    pub infinite: bool,
    pub cash: Option<f64>,
    pub burn: Option<f64>,
    /// Set when the underlying financials are stale or undated; surfaced as a
    /// warning, never as an error.
    pub low_confidence: bool,
    pub explain: String,
}

pub fn compute_runway(company: &Company, now: DateTime<Utc>, config: &EngineConfig) -> Runway {
    let low_confidence = match company.as_of {
        None => true,
        Some(as_of) => {
            (now - as_of).num_seconds() as f64 / 86_400.0 > config.freshness.data_stale_days
        }
    };

    let (cash, burn) = (company.cash, company.burn);
    match (cash, burn) {
        (Some(cash), Some(burn)) if burn > 0.0 => {
            let months = cash / burn;
            Runway {
                months: Some(months),
                infinite: false,
                cash: Some(cash),
                burn: Some(burn),
                low_confidence,
                explain: format!(
                    "${cash:.0} cash at ${burn:.0}/mo burn = {months:.1} months runway"
                ),
            }
        }
        (Some(cash), Some(burn)) => Runway {
            months: None,
            infinite: true,
            cash: Some(cash),
            burn: Some(burn),
            low_confidence,
            explain: "burn is zero or negative; runway is not being consumed".to_string(),
        },
        _ => Runway {
            months: None,
            infinite: false,
            cash,
            burn,
            low_confidence,
            explain: "cash or burn missing; runway cannot be computed".to_string(),
        },
    }
}
