//! Engine lifecycle.
//!
//! Wires the enabled producers to one shared [`DisplaySurface`] and owns
//! their task handles. [`Engine::start`] validates the configuration,
//! builds the surface, and spawns only the producers the config enables;
//! [`Engine::shutdown`] cancels everything as a single operation and
//! closes the surface so late timer callbacks become no-ops.

use crate::aggregate::AggregateReporter;
use crate::config::{ConfigError, ToastConfig};
use crate::live::LiveEventChannel;
use crate::rotator::HistoryRotator;
use crate::store::NotificationStore;
use crate::surface::{DisplaySurface, SurfaceEvent};
use crate::timefmt::Locale;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running notification engine.
pub struct Engine {
    surface: DisplaySurface,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Validate the configuration and start the enabled producers.
    ///
    /// Must be called from within a tokio runtime. The engine runs until
    /// [`shutdown`](Self::shutdown).
    pub fn start(
        store: Arc<dyn NotificationStore>,
        config: ToastConfig,
        locale: Locale,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let surface = DisplaySurface::new(config.max_toasts, config.position);
        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();

        if config.enable_realtime_notifications {
            let channel = LiveEventChannel::new(
                store.clone(),
                surface.clone(),
                config.clone(),
                locale.clone(),
            );
            tasks.push(channel.spawn(cancel.child_token()));
        }
        if config.enable_rotator_notifications {
            let rotator = HistoryRotator::new(
                store.clone(),
                surface.clone(),
                config.clone(),
                locale.clone(),
            );
            tasks.push(rotator.spawn(cancel.child_token()));
        }
        if config.enable_aggregate_notifications {
            let reporter = AggregateReporter::new(
                store.clone(),
                surface.clone(),
                config.clone(),
                locale.clone(),
            );
            tasks.push(reporter.spawn(cancel.child_token()));
        }

        tracing::info!(
            realtime = config.enable_realtime_notifications,
            rotator = config.enable_rotator_notifications,
            aggregate = config.enable_aggregate_notifications,
            max_toasts = config.max_toasts,
            "Notification engine started"
        );

        Ok(Self {
            surface,
            cancel,
            tasks,
        })
    }

    /// The shared display surface (for manual dismissal or inspection).
    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    /// Subscribe to surface events for the host presentation layer.
    pub fn events(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.surface.events()
    }

    /// Stop all producers, wait for their tasks, and close the surface.
    /// No further surface mutation happens after this returns.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        self.surface.close();
        tracing::info!("Notification engine stopped");
    }
}
