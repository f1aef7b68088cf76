//! Social-proof notification engine.
//!
//! Multiplexes three toast producers onto one bounded display surface:
//! a live channel pushing fresh backend events as they happen, a rotator
//! replaying a shuffled window of recent history, and an aggregate
//! reporter drip-feeding per-product counts. Hosts embed the engine,
//! hand it a [`store::NotificationStore`], and subscribe to
//! [`surface::SurfaceEvent`]s to drive their own presentation.
//!
//! ```no_run
//! use proofpop::config::ToastConfig;
//! use proofpop::engine::Engine;
//! use proofpop::store::{MemoryStore, NotificationStore};
//! use proofpop::timefmt::Locale;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let store = Arc::new(MemoryStore::default()) as Arc<dyn NotificationStore>;
//! let engine = Engine::start(store, ToastConfig::default(), Locale::default()).unwrap();
//! let mut events = engine.events();
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod live;
pub mod logging;
pub mod redact;
pub mod render;
pub mod rotator;
pub mod store;
pub mod surface;
pub mod timefmt;

pub use config::{AppConfig, ToastConfig};
pub use engine::Engine;
pub use store::{NotificationStore, RestStore};
pub use surface::{DisplaySurface, SurfaceEvent, ToastHandle};
