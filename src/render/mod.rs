//! Toast content construction.
//!
//! Stateless mapping from a normalized [`NotificationRecord`] (or an
//! aggregate count entry) plus configuration to a [`ToastContent`] model.
//! Every text field is plain text: buyer and product names pass through as
//! inert strings and are never interpreted as markup, so a hostile name in
//! the backend table cannot inject anything into the visual surface.

use crate::config::ToastConfig;
use crate::redact::redact;
use crate::store::{EventClass, EventTaxonomy, NotificationRecord, ProductCount};
use crate::timefmt::{self, Locale};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// The three toast variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Checkout,
    Purchase,
    Aggregate,
}

impl From<EventClass> for ToastKind {
    fn from(class: EventClass) -> Self {
        match class {
            EventClass::Checkout => ToastKind::Checkout,
            EventClass::Purchase => ToastKind::Purchase,
        }
    }
}

/// Where the toast's leading visual comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "value")]
pub enum IconSource {
    /// The bundled per-kind animation.
    Builtin,
    /// A product image URL (record override or configured default).
    ProductImage(String),
}

/// Headline parts, kept separate so the host can style them independently.
/// For aggregate toasts `actor` carries the formatted count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Headline {
    pub actor: String,
    pub action: String,
    pub product: String,
}

/// Secondary line under the headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Subtext {
    /// Single-event toasts: when it happened.
    Event {
        relative: String,
        day: String,
        clock: String,
    },
    /// Aggregate toasts: the trailing-period phrase.
    Period { phrase: String },
}

/// Immutable content model for one toast.
///
/// Created here, admitted to the display surface, destroyed on eviction or
/// expiry. Carries no behavior of its own.
#[derive(Debug, Clone, Serialize)]
pub struct ToastContent {
    pub kind: ToastKind,
    pub headline: Headline,
    pub subtext: Subtext,
    pub icon: IconSource,
    pub dismissible: bool,
    /// How long the toast stays up before auto-expiry.
    pub lifetime: Duration,
}

/// Per-call rendering inputs that aren't part of the record or config.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderFlags {
    /// Set for live-pushed events; governs the dismiss affordance.
    pub realtime: bool,
    /// Overrides the configured auto-hide delay (the live channel passes
    /// the multiplied delay here).
    pub custom_delay: Option<Duration>,
}

/// Build the content model for a single notification record.
pub fn render_record(
    record: &NotificationRecord,
    config: &ToastConfig,
    taxonomy: &EventTaxonomy,
    locale: &Locale,
    flags: RenderFlags,
    now: DateTime<Utc>,
) -> ToastContent {
    let kind = ToastKind::from(taxonomy.classify(record));

    let actor = display_actor(record, config, locale);

    let product = record
        .product_name
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| locale.placeholder_product.clone());

    let action = match kind {
        ToastKind::Purchase => config.purchase_text.clone(),
        _ => config.checkout_text.clone(),
    };

    let icon = record
        .product_image_url
        .clone()
        .or_else(|| config.product_image_url.clone())
        .map(IconSource::ProductImage)
        .unwrap_or(IconSource::Builtin);

    ToastContent {
        kind,
        headline: Headline {
            actor,
            action,
            product,
        },
        subtext: Subtext::Event {
            relative: timefmt::relative_phrase(record.created_at, now, locale),
            day: timefmt::day_name(record.created_at, locale),
            clock: timefmt::hours_minutes(record.created_at),
        },
        icon,
        // Rotator and aggregate toasts are never user-dismissible; only
        // live-pushed ones are, and only when the host enables the button.
        dismissible: flags.realtime && config.show_dismiss_button,
        lifetime: flags.custom_delay.unwrap_or_else(|| config.auto_hide_delay()),
    }
}

/// Build the content model for an aggregate count toast.
pub fn render_aggregate(
    entry: &ProductCount,
    class: EventClass,
    config: &ToastConfig,
    locale: &Locale,
) -> ToastContent {
    let action = match class {
        EventClass::Checkout => config.checkout_count_text.clone(),
        EventClass::Purchase => config.purchase_count_text.clone(),
    };

    ToastContent {
        kind: ToastKind::Aggregate,
        headline: Headline {
            actor: entry.count.to_string(),
            action,
            product: entry.product_name.clone(),
        },
        subtext: Subtext::Period {
            phrase: locale.period_phrase(config.aggregate_period_days),
        },
        icon: config
            .product_image_url
            .clone()
            .map(IconSource::ProductImage)
            .unwrap_or(IconSource::Builtin),
        dismissible: false,
        lifetime: config.auto_hide_delay(),
    }
}

fn display_actor(record: &NotificationRecord, config: &ToastConfig, locale: &Locale) -> String {
    if config.show_order_id {
        if let Some(order_id) = record.order_id.as_deref().filter(|o| !o.is_empty()) {
            return format!("Order #{order_id}");
        }
    }

    let name = record.buyer_name.as_deref().unwrap_or("");
    if config.censor_buyer_names {
        redact(name, &locale.placeholder_name)
    } else if name.trim().is_empty() {
        locale.placeholder_name.clone()
    } else {
        name.to_string()
    }
}
