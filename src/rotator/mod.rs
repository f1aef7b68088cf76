//! Historical notification rotator.
//!
//! Keeps a shuffled queue of recent notifications and presents one at a
//! time on a fixed cadence: each toast gets the auto-hide delay on the
//! surface, then the rotator waits the configured gap before showing the
//! next. The queue cycles front to back so a short history keeps rotating
//! indefinitely.
//!
//! A periodic refresh refetches the window from the store and replaces the
//! queue wholesale with a fresh shuffle. Refresh failures keep the current
//! queue; the rotator degrades to replaying what it already has.

use crate::config::ToastConfig;
use crate::render::{self, RenderFlags};
use crate::store::{EventTaxonomy, NotificationRecord, NotificationStore, RecentQuery};
use crate::surface::DisplaySurface;
use crate::timefmt::Locale;
use chrono::Utc;
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Rotating producer over the historical notification window.
pub struct HistoryRotator {
    store: Arc<dyn NotificationStore>,
    surface: DisplaySurface,
    config: ToastConfig,
    taxonomy: EventTaxonomy,
    locale: Locale,
    queue: Mutex<VecDeque<NotificationRecord>>,
    running: AtomicBool,
}

impl HistoryRotator {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        surface: DisplaySurface,
        config: ToastConfig,
        locale: Locale,
    ) -> Arc<Self> {
        let taxonomy = EventTaxonomy::from_config(&config);
        Arc::new(Self {
            store,
            surface,
            config,
            taxonomy,
            locale,
            queue: Mutex::new(VecDeque::new()),
            running: AtomicBool::new(true),
        })
    }

    /// Run refresh and rotation loops until cancelled. The initial fill
    /// happens before the first rotation so the queue isn't raced.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.refresh().await;
            let refresher = {
                let rotator = self.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { rotator.refresh_loop(cancel).await })
            };
            self.rotate_loop(cancel).await;
            let _ = refresher.await;
        })
    }

    async fn refresh_loop(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.rotator_refresh_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The immediate first tick; the initial fill already happened
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.refresh().await,
            }
        }
    }

    /// Refetch the historical window and replace the queue with a fresh
    /// shuffle. On error the existing queue is left untouched.
    async fn refresh(&self) {
        let query = RecentQuery {
            period_days: self.config.rotator_period_days,
            limit: self.config.rotator_data_limit,
            include_checkouts: self.config.rotator_include_checkouts,
            include_purchases: self.config.rotator_include_purchases,
        };

        match self.store.fetch_recent(&query).await {
            Ok(mut rows) => {
                rows.shuffle(&mut rand::thread_rng());
                let mut queue = self.lock_queue();
                queue.clear();
                queue.extend(rows);
                // A non-empty refresh restarts a rotator halted on empty
                if !queue.is_empty() {
                    self.running.store(true, Ordering::SeqCst);
                }
                tracing::debug!(items = queue.len(), "Rotator queue refreshed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rotator refresh failed, keeping current queue");
            }
        }
    }

    async fn rotate_loop(&self, cancel: CancellationToken) {
        loop {
            let pause = match self.next_record() {
                Some(record) => {
                    let content = render::render_record(
                        &record,
                        &self.config,
                        &self.taxonomy,
                        &self.locale,
                        RenderFlags::default(),
                        Utc::now(),
                    );
                    self.surface.present(&content);
                    // Full display time plus the gap before the next item
                    self.config.auto_hide_delay() + self.config.rotator_interval()
                }
                // Empty or halted: idle one gap and check again
                None => self.config.rotator_interval(),
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Take the next record, cycling it to the back of the queue. An empty
    /// queue halts rotation until a refresh brings data back.
    fn next_record(&self) -> Option<NotificationRecord> {
        if !self.running.load(Ordering::SeqCst) {
            return None;
        }
        let mut queue = self.lock_queue();
        match queue.pop_front() {
            Some(record) => {
                queue.push_back(record.clone());
                Some(record)
            }
            None => {
                self.running.store(false, Ordering::SeqCst);
                tracing::debug!("Rotator halted on empty queue");
                None
            }
        }
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<NotificationRecord>> {
        self.queue.lock().expect("rotator queue lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Position;
    use crate::store::MemoryStore;
    use crate::surface::SurfaceEvent;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn record(id: i64, product: &str) -> NotificationRecord {
        NotificationRecord {
            id,
            event_type: "order.created".to_string(),
            payment_status: None,
            buyer_name: Some("Ana".to_string()),
            product_name: Some(product.to_string()),
            product_image_url: None,
            order_id: None,
            created_at: Some(Utc::now()),
            last_updated_at: None,
            displayed: true,
        }
    }

    fn drain_admissions(events: &mut broadcast::Receiver<SurfaceEvent>) -> Vec<SurfaceEvent> {
        let mut admitted = Vec::new();
        loop {
            match events.try_recv() {
                Ok(event) => {
                    if matches!(event, SurfaceEvent::Admitted { .. }) {
                        admitted.push(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(e) => panic!("event channel error: {e}"),
            }
        }
        admitted
    }

    fn rotator(store: &Arc<MemoryStore>, surface: &DisplaySurface) -> Arc<HistoryRotator> {
        HistoryRotator::new(
            store.clone() as Arc<dyn NotificationStore>,
            surface.clone(),
            ToastConfig::default(),
            Locale::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn rotates_through_history_on_the_configured_cadence() {
        let store = Arc::new(MemoryStore::default());
        store.insert(record(1, "A"));
        store.insert(record(2, "B"));

        let surface = DisplaySurface::new(3, Position::Top);
        let mut events = surface.events();

        let cancel = CancellationToken::new();
        let task = rotator(&store, &surface).spawn(cancel.clone());

        // First item right after the initial fill
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(drain_admissions(&mut events).len(), 1);

        // Each cycle is autoHideDelay (5s) plus rotatorInterval (5s)
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(drain_admissions(&mut events).len(), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(drain_admissions(&mut events).len(), 2);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rotator_toasts_are_not_dismissible() {
        let store = Arc::new(MemoryStore::default());
        store.insert(record(1, "A"));

        let surface = DisplaySurface::new(3, Position::Top);
        let mut events = surface.events();

        let cancel = CancellationToken::new();
        let task = rotator(&store, &surface).spawn(cancel.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;

        match events.recv().await.unwrap() {
            SurfaceEvent::Admitted { content, .. } => {
                assert!(!content.dismissible);
                assert_eq!(content.lifetime, Duration::from_millis(5_000));
            }
            other => panic!("unexpected event {other:?}"),
        }

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn empty_history_presents_nothing() {
        let store = Arc::new(MemoryStore::default());
        let surface = DisplaySurface::new(3, Position::Top);

        let cancel = CancellationToken::new();
        let task = rotator(&store, &surface).spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(surface.len(), 0);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_restarts_a_rotator_halted_on_empty() {
        let store = Arc::new(MemoryStore::default());
        let surface = DisplaySurface::new(3, Position::Top);
        let mut events = surface.events();

        let cancel = CancellationToken::new();
        let task = rotator(&store, &surface).spawn(cancel.clone());

        // Nothing to rotate; the loop halts
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(drain_admissions(&mut events).is_empty());

        // Data arrives; the next periodic refresh (every 5 minutes by
        // default) restarts rotation
        store.insert(record(1, "A"));
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(!drain_admissions(&mut events).is_empty());

        cancel.cancel();
        task.await.unwrap();
    }

    fn admitted_products(events: &mut broadcast::Receiver<SurfaceEvent>) -> Vec<String> {
        drain_admissions(events)
            .into_iter()
            .map(|event| match event {
                SurfaceEvent::Admitted { content, .. } => content.headline.product,
                other => panic!("unexpected event {other:?}"),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycles_visit_each_record_once_in_stable_order() {
        let store = Arc::new(MemoryStore::default());
        store.insert(record(1, "A"));
        store.insert(record(2, "B"));
        store.insert(record(3, "C"));

        let surface = DisplaySurface::new(3, Position::Top);
        let mut events = surface.events();

        let cancel = CancellationToken::new();
        let task = rotator(&store, &surface).spawn(cancel.clone());

        // Six presentations: two full cycles over three records
        tokio::time::sleep(Duration::from_secs(51)).await;
        let products = admitted_products(&mut events);
        assert_eq!(products.len(), 6);

        // The shuffled order is arbitrary but each cycle covers all three,
        // and the second cycle repeats the first exactly
        let mut first_cycle = products[..3].to_vec();
        first_cycle.sort();
        assert_eq!(first_cycle, vec!["A", "B", "C"]);
        assert_eq!(products[..3], products[3..]);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn queue_cycles_instead_of_draining() {
        let store = Arc::new(MemoryStore::default());
        store.insert(record(1, "A"));

        let surface = DisplaySurface::new(3, Position::Top);
        let mut events = surface.events();

        let cancel = CancellationToken::new();
        let task = rotator(&store, &surface).spawn(cancel.clone());

        // A single record keeps reappearing cycle after cycle
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(drain_admissions(&mut events).len() >= 3);

        cancel.cancel();
        task.await.unwrap();
    }
}
