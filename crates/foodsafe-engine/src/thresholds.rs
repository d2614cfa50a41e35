//! Temperature threshold classification per reading kind.

use foodsafe_common::types::{CheckStatus, ComplianceVerdict, ReadingKind};

/// Default hot-holding standard for food probe checks, in °C.
/// Stricter regional rules (e.g. 82.0) can be passed per call.
pub const DEFAULT_FOOD_STANDARD_CELSIUS: f64 = 75.0;

const FRIDGE_OK_MAX: f64 = 5.0;
const FRIDGE_WARN_MAX: f64 = 8.0;
const FREEZER_OK_MAX: f64 = -18.0;
const FREEZER_WARN_MAX: f64 = -15.0;

/// Classifies a single temperature reading.
///
/// Bands (boundaries inclusive of the lower band):
/// - fridge: ≤5.0 ok, ≤8.0 warn, above fail
/// - freezer: ≤−18.0 ok, ≤−15.0 warn, above fail
/// - food: ≥ standard ok, below fail (no warn tier); the standard defaults
///   to [`DEFAULT_FOOD_STANDARD_CELSIUS`] and can be overridden per call
/// - delivery: reuses the fridge bands until a supplier-specific rule set
///   is defined
///
/// Total for all finite inputs; never errors. Non-finite values are a caller
/// error and must be rejected at the ingestion boundary.
pub fn classify(
    kind: ReadingKind,
    value_celsius: f64,
    food_standard: Option<f64>,
) -> ComplianceVerdict {
    match kind {
        ReadingKind::Fridge => banded(value_celsius, FRIDGE_OK_MAX, FRIDGE_WARN_MAX, "Fridge"),
        ReadingKind::Freezer => banded(value_celsius, FREEZER_OK_MAX, FREEZER_WARN_MAX, "Freezer"),
        ReadingKind::Delivery => banded(value_celsius, FRIDGE_OK_MAX, FRIDGE_WARN_MAX, "Delivery"),
        ReadingKind::Food => {
            let standard = food_standard.unwrap_or(DEFAULT_FOOD_STANDARD_CELSIUS);
            if value_celsius >= standard {
                ComplianceVerdict {
                    status: CheckStatus::Ok,
                    requires_action: false,
                    message: format!(
                        "Food at {value_celsius:.1}°C meets the {standard:.1}°C standard"
                    ),
                }
            } else {
                ComplianceVerdict {
                    status: CheckStatus::Fail,
                    requires_action: true,
                    message: format!(
                        "Food at {value_celsius:.1}°C is below the {standard:.1}°C standard"
                    ),
                }
            }
        }
    }
}

fn banded(value: f64, ok_max: f64, warn_max: f64, label: &str) -> ComplianceVerdict {
    if value <= ok_max {
        ComplianceVerdict {
            status: CheckStatus::Ok,
            requires_action: false,
            message: format!("{label} at {value:.1}°C is within the {ok_max:.1}°C target"),
        }
    } else if value <= warn_max {
        ComplianceVerdict {
            status: CheckStatus::Warn,
            requires_action: false,
            message: format!("{label} at {value:.1}°C is above the {ok_max:.1}°C target"),
        }
    } else {
        ComplianceVerdict {
            status: CheckStatus::Fail,
            requires_action: true,
            message: format!("{label} at {value:.1}°C exceeds the {warn_max:.1}°C limit"),
        }
    }
}
