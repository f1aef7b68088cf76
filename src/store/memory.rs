//! In-process implementation of [`NotificationStore`].
//!
//! Backs tests, demos, and hosts that feed the engine directly instead of
//! through a remote backend. Inserted rows are held in a plain vector;
//! undisplayed inserts are fanned out to live subscribers over a broadcast
//! channel.

use super::{
    EventClass, EventTaxonomy, NotificationRecord, NotificationStore, ProductCount, RecentQuery,
    StoreError,
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures_util::stream::BoxStream;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

const SUBSCRIBER_BUFFER: usize = 64;

/// In-memory notification store.
pub struct MemoryStore {
    rows: Mutex<Vec<NotificationRecord>>,
    taxonomy: EventTaxonomy,
    inserts: broadcast::Sender<NotificationRecord>,
}

impl MemoryStore {
    pub fn new(taxonomy: EventTaxonomy) -> Self {
        let (inserts, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            rows: Mutex::new(Vec::new()),
            taxonomy,
            inserts,
        }
    }

    /// Insert a row, notifying live subscribers when it is undisplayed
    /// (mirrors the backend's insert-event channel with its server-side
    /// `displayed=false` filter).
    pub fn insert(&self, record: NotificationRecord) {
        let undisplayed = !record.displayed;
        self.rows
            .lock()
            .expect("memory store lock poisoned")
            .push(record.clone());
        if undisplayed {
            // No receivers is fine; rotator and aggregate read the table.
            let _ = self.inserts.send(record);
        }
    }

    /// Snapshot of a row by id, mainly for assertions in tests.
    pub fn row(&self, id: i64) -> Option<NotificationRecord> {
        self.rows
            .lock()
            .expect("memory store lock poisoned")
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(EventTaxonomy::default())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn subscribe(&self) -> Result<BoxStream<'static, NotificationRecord>, StoreError> {
        let mut rx = self.inserts.subscribe();
        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(record) => yield record,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Live subscriber lagged, dropping events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn mark_displayed(&self, id: i64) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("memory store lock poisoned");
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.displayed = true;
                row.last_updated_at = Some(Utc::now());
                Ok(())
            }
            None => Err(StoreError::Decode(format!("no row with id {id}"))),
        }
    }

    async fn fetch_recent(
        &self,
        query: &RecentQuery,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let since = Utc::now() - ChronoDuration::days(i64::from(query.period_days));
        let rows = self.rows.lock().expect("memory store lock poisoned");

        let mut matched: Vec<NotificationRecord> = rows
            .iter()
            .filter(|r| r.created_at.map(|ts| ts >= since).unwrap_or(false))
            .filter(|r| self.taxonomy.included(r, query))
            .cloned()
            .collect();

        // Newest first, like the backend's order=created_at.desc
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(query.limit as usize);
        Ok(matched)
    }

    async fn count_by_product(
        &self,
        class: EventClass,
        period_days: u32,
    ) -> Result<Vec<ProductCount>, StoreError> {
        let since = Utc::now() - ChronoDuration::days(i64::from(period_days));
        let rows = self.rows.lock().expect("memory store lock poisoned");

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for row in rows.iter() {
            if row.created_at.map(|ts| ts >= since).unwrap_or(false)
                && self.taxonomy.classify(row) == class
            {
                // Grouping needs a product key; display copy is the
                // renderer's concern, so nameless rows are simply skipped
                let Some(product) = row.product_name.clone() else {
                    continue;
                };
                *counts.entry(product).or_insert(0) += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(product_name, count)| ProductCount {
                product_name,
                count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn record(id: i64, event_type: &str, product: &str) -> NotificationRecord {
        NotificationRecord {
            id,
            event_type: event_type.to_string(),
            payment_status: None,
            buyer_name: Some("Ana Silva".to_string()),
            product_name: Some(product.to_string()),
            product_image_url: None,
            order_id: None,
            created_at: Some(Utc::now()),
            last_updated_at: None,
            displayed: false,
        }
    }

    fn paid(mut r: NotificationRecord) -> NotificationRecord {
        r.event_type = "order.payment_status_changed".to_string();
        r.payment_status = Some("paid".to_string());
        r
    }

    #[tokio::test]
    async fn subscribe_receives_undisplayed_inserts_only() {
        let store = MemoryStore::default();
        let mut stream = store.subscribe().await.unwrap();

        let mut seen = record(1, "order.created", "Widget");
        seen.displayed = true;
        store.insert(seen);
        store.insert(record(2, "order.created", "Widget"));

        let first = stream.next().await.unwrap();
        assert_eq!(first.id, 2);
    }

    #[tokio::test]
    async fn mark_displayed_flips_flag_and_bumps_timestamp() {
        let store = MemoryStore::default();
        store.insert(record(1, "order.created", "Widget"));

        store.mark_displayed(1).await.unwrap();

        let row = store.row(1).unwrap();
        assert!(row.displayed);
        assert!(row.last_updated_at.is_some());
    }

    #[tokio::test]
    async fn fetch_recent_honors_window_limit_and_filters() {
        let store = MemoryStore::default();
        store.insert(record(1, "order.created", "A"));
        store.insert(paid(record(2, "x", "B")));
        let mut old = record(3, "order.created", "C");
        old.created_at = Some(Utc::now() - ChronoDuration::days(30));
        store.insert(old);

        let rows = store
            .fetch_recent(&RecentQuery {
                period_days: 14,
                limit: 10,
                include_checkouts: true,
                include_purchases: false,
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);
    }

    #[tokio::test]
    async fn count_by_product_groups_and_classifies() {
        let store = MemoryStore::default();
        store.insert(record(1, "order.created", "A"));
        store.insert(record(2, "order.created", "A"));
        store.insert(record(3, "order.created", "B"));
        store.insert(paid(record(4, "x", "A")));

        let checkouts = store
            .count_by_product(EventClass::Checkout, 1)
            .await
            .unwrap();
        assert_eq!(
            checkouts,
            vec![
                ProductCount {
                    product_name: "A".to_string(),
                    count: 2
                },
                ProductCount {
                    product_name: "B".to_string(),
                    count: 1
                },
            ]
        );

        let purchases = store
            .count_by_product(EventClass::Purchase, 1)
            .await
            .unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].product_name, "A");
    }

    #[tokio::test]
    async fn count_by_product_skips_rows_without_a_product_name() {
        let store = MemoryStore::default();
        store.insert(record(1, "order.created", "A"));
        let mut nameless = record(2, "order.created", "ignored");
        nameless.product_name = None;
        store.insert(nameless);

        let counts = store
            .count_by_product(EventClass::Checkout, 1)
            .await
            .unwrap();

        assert_eq!(
            counts,
            vec![ProductCount {
                product_name: "A".to_string(),
                count: 1
            }]
        );
    }
}
