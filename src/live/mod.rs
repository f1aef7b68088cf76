//! Live event channel.
//!
//! Consumes the store's insert subscription and turns each new row into a
//! realtime toast with an extended lifetime. Delivery from the backend is
//! at-least-once (reconnects replay rows whose displayed flag hasn't
//! landed yet), so a client-side seen-id set suppresses duplicates within
//! the session.
//!
//! Marking a row displayed is best-effort and never blocks presentation:
//! the toast goes up first, the write-back runs in its own task, and a
//! failure just means the row may be redelivered on a later reconnect
//! (where the seen set absorbs it).

use crate::config::ToastConfig;
use crate::render::{self, RenderFlags};
use crate::store::{EventTaxonomy, NotificationRecord, NotificationStore};
use crate::surface::DisplaySurface;
use crate::timefmt::Locale;
use chrono::Utc;
use futures_util::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Realtime producer: one subscription, one toast per unseen insert.
pub struct LiveEventChannel {
    store: Arc<dyn NotificationStore>,
    surface: DisplaySurface,
    config: ToastConfig,
    taxonomy: EventTaxonomy,
    locale: Locale,
}

impl LiveEventChannel {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        surface: DisplaySurface,
        config: ToastConfig,
        locale: Locale,
    ) -> Self {
        let taxonomy = EventTaxonomy::from_config(&config);
        Self {
            store,
            surface,
            config,
            taxonomy,
            locale,
        }
    }

    /// Run the channel until cancelled or the subscription ends.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(self, cancel: CancellationToken) {
        let mut stream = match self.store.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open live subscription");
                return;
            }
        };
        tracing::info!("Live event channel subscribed");

        let mut seen: HashSet<i64> = HashSet::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Live event channel cancelled");
                    break;
                }
                next = stream.next() => match next {
                    Some(record) => self.handle(record, &mut seen),
                    None => {
                        tracing::info!("Live subscription ended");
                        break;
                    }
                },
            }
        }
    }

    fn handle(&self, record: NotificationRecord, seen: &mut HashSet<i64>) {
        // The subscription is server-side filtered to undisplayed rows;
        // this guards against a backend that doesn't honor the filter
        if record.displayed {
            return;
        }
        if !seen.insert(record.id) {
            tracing::trace!(id = record.id, "Skipping already-seen live event");
            return;
        }

        tracing::debug!(id = record.id, event_type = %record.event_type, "Presenting live event");
        let content = render::render_record(
            &record,
            &self.config,
            &self.taxonomy,
            &self.locale,
            RenderFlags {
                realtime: true,
                custom_delay: Some(self.config.realtime_lifetime()),
            },
            Utc::now(),
        );
        self.surface.present(&content);

        let store = self.store.clone();
        let id = record.id;
        tokio::spawn(async move {
            if let Err(e) = store.mark_displayed(id).await {
                tracing::warn!(id, error = %e, "Failed to mark notification displayed");
            }
        });
    }
}
