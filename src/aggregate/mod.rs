//! Aggregate count reporter.
//!
//! Periodically computes per-product event counts over a trailing period
//! and drip-feeds summary toasts ("7 bought Blue Widget in the last 24
//! hours") between the other producers' output. Two independent timers:
//! a slow refresh that recomputes the counts and a much faster display
//! tick that presents one cached entry at a time.

use crate::config::ToastConfig;
use crate::render;
use crate::store::{EventClass, NotificationStore, ProductCount};
use crate::surface::DisplaySurface;
use crate::timefmt::Locale;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cached grouped counts, replaced wholesale on every refresh.
///
/// The rotation cursor survives refreshes so round-robin presentation
/// continues fairly instead of restarting from the first product.
#[derive(Debug, Default)]
struct AggregateCache {
    last_updated: Option<DateTime<Utc>>,
    checkout_counts: Vec<ProductCount>,
    purchase_counts: Vec<ProductCount>,
    rotation_cursor: usize,
}

/// Aggregate producer over grouped event counts.
pub struct AggregateReporter {
    store: Arc<dyn NotificationStore>,
    surface: DisplaySurface,
    config: ToastConfig,
    locale: Locale,
    cache: Mutex<AggregateCache>,
}

impl AggregateReporter {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        surface: DisplaySurface,
        config: ToastConfig,
        locale: Locale,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            surface,
            config,
            locale,
            cache: Mutex::new(AggregateCache::default()),
        })
    }

    /// Run refresh and display timers until cancelled.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.refresh().await;

            let mut refresh = tokio::time::interval(self.config.aggregate_refresh_interval());
            refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            refresh.tick().await;

            let mut display = tokio::time::interval(self.config.aggregate_display_interval());
            display.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            display.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Aggregate reporter cancelled");
                        break;
                    }
                    _ = refresh.tick() => {
                        self.refresh().await;
                    }
                    _ = display.tick() => self.tick(),
                }
            }
        })
    }

    /// Recompute grouped counts and replace the cache wholesale. Each class
    /// is queried independently; a failure on one side keeps that side's
    /// previous data rather than wiping the whole cache.
    async fn refresh(&self) -> bool {
        let period = self.config.aggregate_period_days;
        let checkouts = self.store.count_by_product(EventClass::Checkout, period).await;
        let purchases = self.store.count_by_product(EventClass::Purchase, period).await;

        let mut cache = self.lock_cache();
        match checkouts {
            Ok(counts) => cache.checkout_counts = counts,
            Err(e) => tracing::warn!(error = %e, "Checkout count refresh failed"),
        }
        match purchases {
            Ok(counts) => cache.purchase_counts = counts,
            Err(e) => tracing::warn!(error = %e, "Purchase count refresh failed"),
        }
        cache.last_updated = Some(Utc::now());

        let non_empty = !cache.checkout_counts.is_empty() || !cache.purchase_counts.is_empty();
        tracing::debug!(
            checkouts = cache.checkout_counts.len(),
            purchases = cache.purchase_counts.len(),
            "Aggregate cache refreshed"
        );
        non_empty
    }

    /// Present one cached entry. With more candidates than
    /// `maxProductsToShow` the cursor walks them round-robin so every
    /// product gets shown before any repeats; small sets pick at random.
    fn tick(&self) {
        let mut cache = self.lock_cache();
        if cache.last_updated.is_none() {
            return;
        }

        let candidates: Vec<(EventClass, ProductCount)> = cache
            .checkout_counts
            .iter()
            .map(|c| (EventClass::Checkout, c.clone()))
            .chain(
                cache
                    .purchase_counts
                    .iter()
                    .map(|c| (EventClass::Purchase, c.clone())),
            )
            .collect();
        if candidates.is_empty() {
            return;
        }

        let index = if candidates.len() > self.config.max_products_to_show as usize {
            let index = cache.rotation_cursor % candidates.len();
            cache.rotation_cursor = cache.rotation_cursor.wrapping_add(1);
            index
        } else {
            rand::thread_rng().gen_range(0..candidates.len())
        };
        drop(cache);

        let (class, entry) = &candidates[index];
        let content = render::render_aggregate(entry, *class, &self.config, &self.locale);
        self.surface.present(&content);
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, AggregateCache> {
        self.cache.lock().expect("aggregate cache lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Position;
    use crate::render::ToastKind;
    use crate::store::{MemoryStore, NotificationRecord};
    use crate::surface::SurfaceEvent;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn record(id: i64, product: &str, purchase: bool) -> NotificationRecord {
        NotificationRecord {
            id,
            event_type: if purchase {
                "order.payment_status_changed".to_string()
            } else {
                "order.created".to_string()
            },
            payment_status: purchase.then(|| "paid".to_string()),
            buyer_name: None,
            product_name: Some(product.to_string()),
            product_image_url: None,
            order_id: None,
            created_at: Some(Utc::now()),
            last_updated_at: None,
            displayed: true,
        }
    }

    fn reporter(store: &Arc<MemoryStore>, surface: &DisplaySurface) -> Arc<AggregateReporter> {
        AggregateReporter::new(
            store.clone() as Arc<dyn NotificationStore>,
            surface.clone(),
            ToastConfig::default(),
            Locale::default(),
        )
    }

    fn admitted_products(events: &mut broadcast::Receiver<SurfaceEvent>) -> Vec<String> {
        let mut products = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SurfaceEvent::Admitted { content, .. } = event {
                assert_eq!(content.kind, ToastKind::Aggregate);
                products.push(content.headline.product);
            }
        }
        products
    }

    #[tokio::test(start_paused = true)]
    async fn presents_cached_counts_on_the_display_cadence() {
        let store = Arc::new(MemoryStore::default());
        store.insert(record(1, "A", false));
        store.insert(record(2, "A", false));

        let surface = DisplaySurface::new(3, Position::Top);
        let mut events = surface.events();

        let cancel = CancellationToken::new();
        let task = reporter(&store, &surface).spawn(cancel.clone());

        // Default display interval is 30 seconds
        tokio::time::sleep(Duration::from_secs(31)).await;
        let products = admitted_products(&mut events);
        assert_eq!(products, vec!["A".to_string()]);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(admitted_products(&mut events).len(), 1);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn empty_table_means_no_aggregate_toasts() {
        let store = Arc::new(MemoryStore::default());
        let surface = DisplaySurface::new(3, Position::Top);

        let cancel = CancellationToken::new();
        let task = reporter(&store, &surface).spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(surface.len(), 0);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn large_candidate_sets_rotate_round_robin_without_repeats() {
        let store = Arc::new(MemoryStore::default());
        // Four checkout products plus one purchase product: six candidates
        // would exceed maxProductsToShow=3, five do too
        for (i, product) in ["A", "B", "C", "D"].iter().enumerate() {
            store.insert(record(i as i64 + 1, product, false));
        }
        store.insert(record(10, "E", true));

        let surface = DisplaySurface::new(10, Position::Top);
        let mut events = surface.events();

        let cancel = CancellationToken::new();
        let task = reporter(&store, &surface).spawn(cancel.clone());

        // Five display ticks visit all five candidates exactly once
        tokio::time::sleep(Duration::from_secs(5 * 30 + 1)).await;
        let mut products = admitted_products(&mut events);
        assert_eq!(products.len(), 5);
        products.sort();
        assert_eq!(products, vec!["A", "B", "C", "D", "E"]);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn small_candidate_sets_pick_from_the_set() {
        let store = Arc::new(MemoryStore::default());
        store.insert(record(1, "A", false));
        store.insert(record(2, "B", true));

        let surface = DisplaySurface::new(10, Position::Top);
        let mut events = surface.events();

        let cancel = CancellationToken::new();
        let task = reporter(&store, &surface).spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(4 * 30 + 1)).await;
        let products = admitted_products(&mut events);
        assert_eq!(products.len(), 4);
        assert!(products.iter().all(|p| p == "A" || p == "B"));

        cancel.cancel();
        task.await.unwrap();
    }
}
