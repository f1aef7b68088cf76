//! Bounded display surface for toast notifications.
//!
//! The single shared resource all three producers compete for. Holds at
//! most `maxToasts` live toasts in insertion order, evicting the oldest
//! when a new one is admitted at capacity. Producers only ever request
//! insertion through [`DisplaySurface::admit`]/[`DisplaySurface::present`];
//! the surface owns the what's-currently-showing invariant.
//!
//! The surface has no DOM. Hosts subscribe to the [`SurfaceEvent`]
//! broadcast and drive their own presentation from it; the fixed exit
//! animation delay is honored here so the event order matches what a
//! visual layer would show.
//!
//! Admission is reentrant-safe: any producer may call in from any task at
//! any time, including while another toast is mid-exit. All mutation goes
//! through one lock; ordering into the FIFO is last-call-wins. After
//! [`DisplaySurface::close`], every operation (including late timer
//! callbacks) is a safe no-op.

use crate::config::Position;
use crate::render::ToastContent;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Fixed exit-transition time before a dismissed toast's slot is freed.
/// Matches the presentation layer's hide animation; deliberately not
/// configurable.
pub const EXIT_ANIMATION_DELAY: Duration = Duration::from_millis(300);

const EVENT_BUFFER: usize = 64;

/// Opaque reference to an admitted toast, used for later dismissal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ToastHandle(u64);

/// What happened on the surface, for the host presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SurfaceEvent {
    /// A toast entered the surface.
    Admitted {
        handle: ToastHandle,
        content: ToastContent,
        position: Position,
    },
    /// A toast was pushed out immediately to make room (no exit
    /// transition; the new arrival takes its slot).
    Evicted { handle: ToastHandle },
    /// A toast began its exit transition (manual dismiss or expiry).
    Dismissed { handle: ToastHandle },
    /// The exit transition finished and the slot is free.
    Removed { handle: ToastHandle },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToastState {
    Visible,
    Leaving,
}

struct ActiveToast {
    handle: ToastHandle,
    state: ToastState,
    expire_task: Option<JoinHandle<()>>,
    exit_task: Option<JoinHandle<()>>,
}

impl ActiveToast {
    fn abort_tasks(&mut self) {
        if let Some(task) = self.expire_task.take() {
            task.abort();
        }
        if let Some(task) = self.exit_task.take() {
            task.abort();
        }
    }
}

struct Inner {
    active: Mutex<VecDeque<ActiveToast>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    events: broadcast::Sender<SurfaceEvent>,
    max_toasts: usize,
    position: Position,
}

/// Cloneable handle to the shared surface state.
#[derive(Clone)]
pub struct DisplaySurface {
    inner: Arc<Inner>,
}

impl DisplaySurface {
    /// Create a surface with a fixed capacity and anchor position.
    pub fn new(max_toasts: u32, position: Position) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Arc::new(Inner {
                active: Mutex::new(VecDeque::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                events,
                max_toasts: max_toasts.max(1) as usize,
                position,
            }),
        }
    }

    /// Subscribe to surface events. Each call gets an independent receiver.
    pub fn events(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.inner.events.subscribe()
    }

    /// Admit a toast, evicting the oldest active toast(s) while at
    /// capacity. The capacity invariant holds when this returns.
    pub fn admit(&self, content: &ToastContent) -> ToastHandle {
        let handle = ToastHandle(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        if self.inner.closed.load(Ordering::SeqCst) {
            return handle;
        }

        let mut active = self.lock_active();
        while active.len() >= self.inner.max_toasts {
            if let Some(mut oldest) = active.pop_front() {
                oldest.abort_tasks();
                self.emit(SurfaceEvent::Evicted {
                    handle: oldest.handle,
                });
                tracing::debug!(evicted = oldest.handle.0, "Surface at capacity, evicted oldest toast");
            }
        }

        active.push_back(ActiveToast {
            handle,
            state: ToastState::Visible,
            expire_task: None,
            exit_task: None,
        });
        drop(active);

        self.emit(SurfaceEvent::Admitted {
            handle,
            content: content.clone(),
            position: self.inner.position,
        });
        handle
    }

    /// Begin a toast's exit transition, freeing its slot after the fixed
    /// animation delay. Idempotent: dismissing an unknown or already
    /// leaving handle is a no-op.
    pub fn dismiss(&self, handle: ToastHandle) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }

        let mut active = self.lock_active();
        let Some(toast) = active
            .iter_mut()
            .find(|t| t.handle == handle && t.state == ToastState::Visible)
        else {
            return;
        };

        toast.state = ToastState::Leaving;
        if let Some(task) = toast.expire_task.take() {
            task.abort();
        }

        let surface = self.clone();
        toast.exit_task = Some(tokio::spawn(async move {
            tokio::time::sleep(EXIT_ANIMATION_DELAY).await;
            surface.remove(handle);
        }));
        drop(active);

        self.emit(SurfaceEvent::Dismissed { handle });
    }

    /// Schedule a dismiss after `after`. Cancelled automatically when the
    /// toast leaves earlier by eviction or a manual dismiss.
    pub fn auto_expire(&self, handle: ToastHandle, after: Duration) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }

        let surface = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            surface.dismiss(handle);
        });

        let mut active = self.lock_active();
        match active
            .iter_mut()
            .find(|t| t.handle == handle && t.state == ToastState::Visible)
        {
            Some(toast) => {
                if let Some(previous) = toast.expire_task.replace(task) {
                    previous.abort();
                }
            }
            // Already evicted or leaving; the timer has nothing to do.
            None => task.abort(),
        }
    }

    /// The shared admission point: admit and schedule expiry from the
    /// content's lifetime. All three producers call this.
    pub fn present(&self, content: &ToastContent) -> ToastHandle {
        let handle = self.admit(content);
        self.auto_expire(handle, content.lifetime);
        handle
    }

    /// Number of toasts currently occupying slots (including ones mid-exit).
    pub fn len(&self) -> usize {
        self.lock_active().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles currently on the surface, oldest first.
    pub fn active_handles(&self) -> Vec<ToastHandle> {
        self.lock_active().iter().map(|t| t.handle).collect()
    }

    /// Tear down the surface: abort all timers, drop all toasts, and turn
    /// every later call into a no-op. Safe to call more than once.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut active = self.lock_active();
        for toast in active.iter_mut() {
            toast.abort_tasks();
        }
        active.clear();
        tracing::debug!("Display surface closed");
    }

    fn remove(&self, handle: ToastHandle) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        let mut active = self.lock_active();
        let before = active.len();
        active.retain(|t| t.handle != handle);
        let removed = active.len() != before;
        drop(active);

        if removed {
            self.emit(SurfaceEvent::Removed { handle });
        }
    }

    fn emit(&self, event: SurfaceEvent) {
        // No receivers is fine; the surface works headless.
        let _ = self.inner.events.send(event);
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, VecDeque<ActiveToast>> {
        self.inner
            .active
            .lock()
            .expect("display surface lock poisoned")
    }
}
