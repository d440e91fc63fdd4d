//! Environment-driven configuration.

use rust_decimal::Decimal;

/// Pricing rule constants; every field can be overridden from the
/// environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    /// Subtotals strictly above this ship free.
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
    /// Fraction of the subtotal, e.g. `0.08`.
    pub tax_rate: Decimal,
    /// Surcharge applied only to cash-on-delivery orders.
    pub cod_fee: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::from(100),
            flat_shipping_fee: Decimal::from(10),
            tax_rate: Decimal::new(8, 2),
            cod_fee: Decimal::from(5),
        }
    }
}

impl PricingConfig {
    /// Reads `FREE_SHIPPING_THRESHOLD`, `FLAT_SHIPPING_FEE`, `TAX_RATE` and
    /// `COD_FEE`, keeping the default for any key that is unset or fails to
    /// parse.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            free_shipping_threshold: env_decimal(
                "FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold,
            ),
            flat_shipping_fee: env_decimal("FLAT_SHIPPING_FEE", defaults.flat_shipping_fee),
            tax_rate: env_decimal("TAX_RATE", defaults.tax_rate),
            cod_fee: env_decimal("COD_FEE", defaults.cod_fee),
        }
    }
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable pricing override");
                default
            }
        },
        Err(_) => default,
    }
}
