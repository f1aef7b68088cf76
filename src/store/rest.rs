//! PostgREST-style HTTP implementation of [`NotificationStore`].
//!
//! Speaks the filter/order/limit query dialect of a Supabase-compatible
//! REST layer: selects with horizontal filters, PATCH by id, and grouped
//! count selects. The live subscription is a cancellable polling loop over
//! the undisplayed rows; dropping the returned stream stops it.

use super::{
    EventClass, EventTaxonomy, NotificationRecord, NotificationStore, ProductCount, RecentQuery,
    StoreError,
};
use crate::config::BackendSettings;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures_util::stream::BoxStream;
use reqwest::Client;
use std::time::Duration;

/// REST notification store over a PostgREST-compatible backend.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
    taxonomy: EventTaxonomy,
    poll_interval: Duration,
}

impl RestStore {
    /// Create a store with a default HTTP client.
    pub fn new(settings: &BackendSettings, table: &str, taxonomy: EventTaxonomy) -> Self {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .expect("Failed to build HTTP client");

        Self::with_client(settings, table, taxonomy, client)
    }

    /// Create a store with a custom HTTP client (for testing).
    pub fn with_client(
        settings: &BackendSettings,
        table: &str,
        taxonomy: EventTaxonomy,
        client: Client,
    ) -> Self {
        Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            table: table.to_string(),
            taxonomy,
            poll_interval: settings.poll_interval(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn get(&self, params: &[(String, String)]) -> reqwest::RequestBuilder {
        self.client
            .get(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(params)
    }

    /// Horizontal filter selecting the requested event classes, in the
    /// backend's `or=(...)` dialect. `None` means nothing is included and
    /// the query can be skipped entirely.
    fn class_filter(&self, query: &RecentQuery) -> Option<(String, String)> {
        let t = &self.taxonomy;
        match (query.include_checkouts, query.include_purchases) {
            (true, true) => Some((
                "or".to_string(),
                format!(
                    "(event_type.eq.{},and(event_type.eq.{},payment_status.eq.{}))",
                    t.checkout_event, t.payment_event, t.paid_status
                ),
            )),
            (true, false) => Some((
                "event_type".to_string(),
                format!("eq.{}", t.checkout_event),
            )),
            (false, true) => Some((
                "and".to_string(),
                format!(
                    "(event_type.eq.{},payment_status.eq.{})",
                    t.payment_event, t.paid_status
                ),
            )),
            (false, false) => None,
        }
    }

    async fn decode_rows(
        response: reqwest::Response,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Http(status.as_u16()));
        }
        response
            .json::<Vec<NotificationRecord>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// One poll of the live subscription: rows not yet displayed, oldest
    /// first so display follows arrival order.
    async fn fetch_undisplayed(&self) -> Result<Vec<NotificationRecord>, StoreError> {
        let params = vec![
            ("select".to_string(), "*".to_string()),
            ("displayed".to_string(), "eq.false".to_string()),
            ("order".to_string(), "created_at.asc".to_string()),
        ];
        let response = self.get(&params).send().await?;
        Self::decode_rows(response).await
    }
}

#[async_trait]
impl NotificationStore for RestStore {
    async fn subscribe(&self) -> Result<BoxStream<'static, NotificationRecord>, StoreError> {
        let store = self.clone();
        let stream = async_stream::stream! {
            let mut interval = tokio::time::interval(store.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                match store.fetch_undisplayed().await {
                    Ok(rows) => {
                        for row in rows {
                            yield row;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Live poll failed, retrying next tick");
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn mark_displayed(&self, id: i64) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .query(&[("id", format!("eq.{id}"))])
            .json(&serde_json::json!({
                "displayed": true,
                "last_updated_at": Utc::now().to_rfc3339(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Http(status.as_u16()));
        }
        Ok(())
    }

    async fn fetch_recent(
        &self,
        query: &RecentQuery,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let Some(filter) = self.class_filter(query) else {
            return Ok(Vec::new());
        };

        let since = Utc::now() - ChronoDuration::days(i64::from(query.period_days));
        let params = vec![
            ("select".to_string(), "*".to_string()),
            ("created_at".to_string(), format!("gte.{}", since.to_rfc3339())),
            filter,
            ("order".to_string(), "created_at.desc".to_string()),
            ("limit".to_string(), query.limit.to_string()),
        ];

        let response = self.get(&params).send().await?;
        Self::decode_rows(response).await
    }

    async fn count_by_product(
        &self,
        class: EventClass,
        period_days: u32,
    ) -> Result<Vec<ProductCount>, StoreError> {
        let since = Utc::now() - ChronoDuration::days(i64::from(period_days));
        let t = &self.taxonomy;

        let mut params = vec![
            ("select".to_string(), "product_name,count:count()".to_string()),
            ("created_at".to_string(), format!("gte.{}", since.to_rfc3339())),
        ];
        match class {
            EventClass::Checkout => {
                params.push(("event_type".to_string(), format!("eq.{}", t.checkout_event)));
            }
            EventClass::Purchase => {
                params.push(("event_type".to_string(), format!("eq.{}", t.payment_event)));
                params.push((
                    "payment_status".to_string(),
                    format!("eq.{}", t.paid_status),
                ));
            }
        }

        let response = self.get(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Http(status.as_u16()));
        }

        let counts = response
            .json::<Vec<ProductCount>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(counts.into_iter().filter(|c| c.count > 0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RestStore {
        let settings = BackendSettings {
            url: "https://example.supabase.co/".to_string(),
            api_key: "key".to_string(),
            ..Default::default()
        };
        RestStore::new(&settings, "notifications", EventTaxonomy::default())
    }

    fn query(checkouts: bool, purchases: bool) -> RecentQuery {
        RecentQuery {
            period_days: 14,
            limit: 10,
            include_checkouts: checkouts,
            include_purchases: purchases,
        }
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        assert_eq!(
            store().table_url(),
            "https://example.supabase.co/rest/v1/notifications"
        );
    }

    #[test]
    fn filter_for_both_classes_uses_or_clause() {
        let (key, value) = store().class_filter(&query(true, true)).unwrap();
        assert_eq!(key, "or");
        assert_eq!(
            value,
            "(event_type.eq.order.created,and(event_type.eq.order.payment_status_changed,payment_status.eq.paid))"
        );
    }

    #[test]
    fn filter_for_checkouts_only() {
        let (key, value) = store().class_filter(&query(true, false)).unwrap();
        assert_eq!(key, "event_type");
        assert_eq!(value, "eq.order.created");
    }

    #[test]
    fn filter_for_purchases_only_requires_paid_status() {
        let (key, value) = store().class_filter(&query(false, true)).unwrap();
        assert_eq!(key, "and");
        assert_eq!(
            value,
            "(event_type.eq.order.payment_status_changed,payment_status.eq.paid)"
        );
    }

    #[test]
    fn filter_for_neither_class_skips_query() {
        assert!(store().class_filter(&query(false, false)).is_none());
    }

    #[tokio::test]
    async fn fetch_recent_with_no_classes_returns_empty_without_network() {
        let rows = store().fetch_recent(&query(false, false)).await.unwrap();
        assert!(rows.is_empty());
    }
}
