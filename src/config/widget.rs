//! Flat widget option store.
//!
//! Every recognized option of the notification widget lives here as a typed
//! field. Host pages hand over a flat string map (data attributes, embedded
//! JSON); [`ToastConfig::merge`] coerces and validates each entry, dropping
//! invalid ones with a logged warning while still applying the rest.

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Where the display surface anchors its toasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Top,
    Bottom,
}

impl std::str::FromStr for Position {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" => Ok(Position::Top),
            "bottom" => Ok(Position::Bottom),
            other => Err(ConfigError::invalid(
                "position",
                format!("expected 'top' or 'bottom', got '{other}'"),
            )),
        }
    }
}

/// The merged widget configuration.
///
/// Option names follow the host-facing camelCase spelling; interval values
/// are milliseconds. Readers always see the latest merged view
/// (last-writer-wins per key).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToastConfig {
    // Producer toggles
    pub enable_realtime_notifications: bool,
    pub enable_rotator_notifications: bool,
    pub enable_aggregate_notifications: bool,

    // Display surface
    pub max_toasts: u32,
    pub position: Position,

    // Timing (milliseconds)
    #[serde(rename = "rotatorInterval")]
    pub rotator_interval_ms: u64,
    #[serde(rename = "autoHideDelay")]
    pub auto_hide_delay_ms: u64,
    pub realtime_delay_multiplier: f64,

    // Rotator fetch scope
    pub rotator_data_limit: u32,
    pub rotator_period_days: u32,
    pub rotator_include_checkouts: bool,
    pub rotator_include_purchases: bool,
    #[serde(rename = "rotatorRefreshInterval")]
    pub rotator_refresh_interval_ms: u64,

    // Aggregate cadence and scope
    #[serde(rename = "aggregateDisplayInterval")]
    pub aggregate_display_interval_ms: u64,
    #[serde(rename = "aggregateRefreshInterval")]
    pub aggregate_refresh_interval_ms: u64,
    pub aggregate_period_days: u32,
    pub max_products_to_show: u32,

    // Renderer behavior
    pub show_dismiss_button: bool,
    pub censor_buyer_names: bool,
    pub show_order_id: bool,

    // Display copy
    pub checkout_text: String,
    pub purchase_text: String,
    pub checkout_count_text: String,
    pub purchase_count_text: String,

    // Icon source
    pub product_image_url: Option<String>,

    // Backend collection
    pub table_name: String,

    // Event taxonomy: the type strings drifted across deployments, so the
    // classification reads them from config rather than hardcoding one
    // generation's values.
    pub event_type_checkout: String,
    pub event_type_payment: String,
    pub paid_status: String,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            enable_realtime_notifications: true,
            enable_rotator_notifications: true,
            enable_aggregate_notifications: true,
            max_toasts: 3,
            position: Position::Top,
            rotator_interval_ms: 5_000,
            auto_hide_delay_ms: 5_000,
            realtime_delay_multiplier: 2.0,
            rotator_data_limit: 10,
            rotator_period_days: 14,
            rotator_include_checkouts: true,
            rotator_include_purchases: true,
            rotator_refresh_interval_ms: 5 * 60 * 1_000,
            aggregate_display_interval_ms: 30 * 1_000,
            aggregate_refresh_interval_ms: 5 * 60 * 1_000,
            aggregate_period_days: 1,
            max_products_to_show: 3,
            show_dismiss_button: true,
            censor_buyer_names: true,
            show_order_id: false,
            checkout_text: "just checked out".to_string(),
            purchase_text: "just bought".to_string(),
            checkout_count_text: "checked out".to_string(),
            purchase_count_text: "bought".to_string(),
            product_image_url: None,
            table_name: "notifications".to_string(),
            event_type_checkout: "order.created".to_string(),
            event_type_payment: "order.payment_status_changed".to_string(),
            paid_status: "paid".to_string(),
        }
    }
}

impl ToastConfig {
    /// Apply a single named option from its raw string form.
    ///
    /// Coerces "true"/"false" to booleans and numeric strings to numbers,
    /// then validates the value. Returns an error without touching the
    /// current value when the key is unknown or the value malformed.
    pub fn apply(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        match key {
            "enableRealtimeNotifications" => {
                self.enable_realtime_notifications = parse_bool(key, raw)?
            }
            "enableRotatorNotifications" => {
                self.enable_rotator_notifications = parse_bool(key, raw)?
            }
            "enableAggregateNotifications" => {
                self.enable_aggregate_notifications = parse_bool(key, raw)?
            }
            "maxToasts" => {
                let n = parse_u32(key, raw)?;
                if !(1..=10).contains(&n) {
                    return Err(ConfigError::invalid(key, "must be between 1 and 10"));
                }
                self.max_toasts = n;
            }
            "position" => self.position = raw.parse()?,
            "rotatorInterval" => self.rotator_interval_ms = parse_positive_ms(key, raw)?,
            "autoHideDelay" => self.auto_hide_delay_ms = parse_positive_ms(key, raw)?,
            "realtimeDelayMultiplier" => {
                let f: f64 = raw
                    .parse()
                    .map_err(|_| ConfigError::invalid(key, "not a number"))?;
                if !(f.is_finite() && f > 0.0) {
                    return Err(ConfigError::invalid(key, "must be a positive number"));
                }
                self.realtime_delay_multiplier = f;
            }
            "rotatorDataLimit" => {
                let n = parse_u32(key, raw)?;
                if n == 0 {
                    return Err(ConfigError::invalid(key, "must be positive"));
                }
                self.rotator_data_limit = n;
            }
            "rotatorPeriodDays" => self.rotator_period_days = parse_u32(key, raw)?,
            "rotatorIncludeCheckouts" => self.rotator_include_checkouts = parse_bool(key, raw)?,
            "rotatorIncludePurchases" => self.rotator_include_purchases = parse_bool(key, raw)?,
            "rotatorRefreshInterval" => {
                self.rotator_refresh_interval_ms = parse_positive_ms(key, raw)?
            }
            "aggregateDisplayInterval" => {
                self.aggregate_display_interval_ms = parse_positive_ms(key, raw)?
            }
            "aggregateRefreshInterval" => {
                self.aggregate_refresh_interval_ms = parse_positive_ms(key, raw)?
            }
            "aggregatePeriodDays" => self.aggregate_period_days = parse_u32(key, raw)?,
            "maxProductsToShow" => self.max_products_to_show = parse_u32(key, raw)?,
            "showDismissButton" => self.show_dismiss_button = parse_bool(key, raw)?,
            "censorBuyerNames" => self.censor_buyer_names = parse_bool(key, raw)?,
            "showOrderId" => self.show_order_id = parse_bool(key, raw)?,
            "checkoutText" => self.checkout_text = raw.to_string(),
            "purchaseText" => self.purchase_text = raw.to_string(),
            "checkoutCountText" => self.checkout_count_text = raw.to_string(),
            "purchaseCountText" => self.purchase_count_text = raw.to_string(),
            "productImageUrl" => {
                reqwest::Url::parse(raw)
                    .map_err(|e| ConfigError::invalid(key, format!("invalid URL: {e}")))?;
                self.product_image_url = Some(raw.to_string());
            }
            "tableName" => {
                if raw.is_empty() {
                    return Err(ConfigError::invalid(key, "cannot be empty"));
                }
                self.table_name = raw.to_string();
            }
            "eventTypeCheckout" => self.event_type_checkout = raw.to_string(),
            "eventTypePayment" => self.event_type_payment = raw.to_string(),
            "paidStatus" => self.paid_status = raw.to_string(),
            other => return Err(ConfigError::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    /// Apply a batch of host-page overrides.
    ///
    /// Invalid entries are dropped with a warning; valid entries are still
    /// applied. Never fails the caller.
    pub fn merge(&mut self, overrides: &BTreeMap<String, String>) {
        for (key, raw) in overrides {
            if let Err(e) = self.apply(key, raw) {
                tracing::warn!(key = %key, value = %raw, error = %e, "Ignoring invalid configuration override");
            }
        }
    }

    /// Validate a fully merged configuration (also covers values that came
    /// in through serde rather than `apply`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10).contains(&self.max_toasts) {
            return Err(ConfigError::invalid("maxToasts", "must be between 1 and 10"));
        }
        if self.rotator_interval_ms == 0
            || self.auto_hide_delay_ms == 0
            || self.rotator_refresh_interval_ms == 0
            || self.aggregate_display_interval_ms == 0
            || self.aggregate_refresh_interval_ms == 0
        {
            return Err(ConfigError::invalid(
                "intervals",
                "all interval options must be positive",
            ));
        }
        if !(self.realtime_delay_multiplier.is_finite() && self.realtime_delay_multiplier > 0.0) {
            return Err(ConfigError::invalid(
                "realtimeDelayMultiplier",
                "must be a positive number",
            ));
        }
        if self.table_name.is_empty() {
            return Err(ConfigError::invalid("tableName", "cannot be empty"));
        }
        if let Some(url) = &self.product_image_url {
            reqwest::Url::parse(url)
                .map_err(|e| ConfigError::invalid("productImageUrl", format!("invalid URL: {e}")))?;
        }
        Ok(())
    }

    pub fn rotator_interval(&self) -> Duration {
        Duration::from_millis(self.rotator_interval_ms)
    }

    pub fn auto_hide_delay(&self) -> Duration {
        Duration::from_millis(self.auto_hide_delay_ms)
    }

    /// Lifetime for live-pushed toasts: the base delay scaled by the
    /// realtime multiplier.
    pub fn realtime_lifetime(&self) -> Duration {
        Duration::from_millis(
            (self.auto_hide_delay_ms as f64 * self.realtime_delay_multiplier).round() as u64,
        )
    }

    pub fn rotator_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.rotator_refresh_interval_ms)
    }

    pub fn aggregate_display_interval(&self) -> Duration {
        Duration::from_millis(self.aggregate_display_interval_ms)
    }

    pub fn aggregate_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.aggregate_refresh_interval_ms)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::invalid(key, "expected 'true' or 'false'")),
    }
}

fn parse_u32(key: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::invalid(key, "not a whole number"))
}

fn parse_positive_ms(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let n: u64 = raw
        .parse()
        .map_err(|_| ConfigError::invalid(key, "not a whole number"))?;
    if n == 0 {
        return Err(ConfigError::invalid(key, "must be positive"));
    }
    Ok(n)
}
