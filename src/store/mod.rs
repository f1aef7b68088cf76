//! Notification data-source abstraction.
//!
//! The engine never talks to a concrete backend directly; everything goes
//! through [`NotificationStore`], an object-safe async trait covering the
//! four operations the producers need: subscribe to inserts, mark a row
//! displayed, query a recent window, and grouped counts. [`rest::RestStore`]
//! implements it against a PostgREST-style HTTP backend;
//! [`memory::MemoryStore`] backs tests and in-process embedding.

mod error;
pub mod memory;
pub mod rest;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use rest::RestStore;

use crate::config::ToastConfig;
use crate::timefmt;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Deserializer, Serialize};

/// One row of the backend notification table.
///
/// `displayed` transitions false to true at most once per row, driven by the
/// live channel after a successful render dispatch (best-effort; the update
/// may fail and the row be redelivered).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub event_type: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_image_url: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "tolerant_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "tolerant_timestamp")]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub displayed: bool,
}

impl NotificationRecord {
    /// Most recent activity timestamp: `last_updated_at` when present,
    /// `created_at` otherwise.
    pub fn effective_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at.or(self.created_at)
    }
}

/// Malformed timestamps become `None` rather than a decode failure; the
/// renderer substitutes locale fallbacks downstream.
fn tolerant_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(timefmt::parse_timestamp))
}

/// The two commercial event classes the widget distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Checkout,
    Purchase,
}

/// Grouped count of events for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCount {
    pub product_name: String,
    pub count: u64,
}

/// Filter for [`NotificationStore::fetch_recent`].
#[derive(Debug, Clone)]
pub struct RecentQuery {
    /// Trailing window in days.
    pub period_days: u32,
    /// Maximum rows returned.
    pub limit: u32,
    pub include_checkouts: bool,
    pub include_purchases: bool,
}

/// The event-type strings that identify checkouts and confirmed payments.
///
/// These drifted across backend deployments (`order.updated`,
/// `order.created`, `order.payment_status_changed`), so they come from
/// config instead of being baked in.
#[derive(Debug, Clone)]
pub struct EventTaxonomy {
    pub checkout_event: String,
    pub payment_event: String,
    pub paid_status: String,
}

impl EventTaxonomy {
    pub fn from_config(config: &ToastConfig) -> Self {
        Self {
            checkout_event: config.event_type_checkout.clone(),
            payment_event: config.event_type_payment.clone(),
            paid_status: config.paid_status.clone(),
        }
    }

    /// A record is a purchase iff its event type is the payment-status-change
    /// event and its payment status equals the paid value; everything else
    /// counts as a checkout.
    pub fn classify(&self, record: &NotificationRecord) -> EventClass {
        let paid = record.event_type == self.payment_event
            && record.payment_status.as_deref() == Some(self.paid_status.as_str());
        if paid {
            EventClass::Purchase
        } else {
            EventClass::Checkout
        }
    }

    /// Whether a record passes the rotator inclusion filters.
    pub fn included(&self, record: &NotificationRecord, query: &RecentQuery) -> bool {
        match self.classify(record) {
            EventClass::Checkout => query.include_checkouts,
            EventClass::Purchase => query.include_purchases,
        }
    }
}

impl Default for EventTaxonomy {
    fn default() -> Self {
        Self::from_config(&ToastConfig::default())
    }
}

/// Unified interface to the notification backend.
///
/// Object-safe; the engine holds it as `Arc<dyn NotificationStore>`. All
/// operations return errors as values — nothing panics across this
/// boundary. Implementations must be safe to call concurrently from the
/// three producers.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Subscribe to insert events, server-side filtered to rows not yet
    /// displayed. The stream ends when the store shuts down; dropping it
    /// cancels the subscription.
    async fn subscribe(&self) -> Result<BoxStream<'static, NotificationRecord>, StoreError>;

    /// Mark a row as displayed (sets `displayed` and bumps
    /// `last_updated_at`).
    async fn mark_displayed(&self, id: i64) -> Result<(), StoreError>;

    /// Fetch up to `query.limit` records within the trailing window,
    /// newest first, matching the inclusion filters.
    async fn fetch_recent(
        &self,
        query: &RecentQuery,
    ) -> Result<Vec<NotificationRecord>, StoreError>;

    /// Count events of one class per product within a trailing window.
    /// Zero-count products are omitted.
    async fn count_by_product(
        &self,
        class: EventClass,
        period_days: u32,
    ) -> Result<Vec<ProductCount>, StoreError>;
}
