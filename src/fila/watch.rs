/*!
 * Watching - Change Notifications for Stored Objects
 *
 * A subscription is handed back before the backend finishes registering.
 * Disposal closes the event gate at once, then waits for the registration
 * to settle and only then asks the backend to unregister.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::address::Fila;
use super::types::{FilaError, FilaResult};

/// Kind of change carried by a `StorageEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Modify,
    Delete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Create => f.write_str("create"),
            EventKind::Modify => f.write_str("modify"),
            EventKind::Delete => f.write_str("delete"),
        }
    }
}

/// Change notification delivered to watch callbacks
///
/// `secondary` is set for rename-like native events and names the other
/// side of the rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    Create { path: Fila, secondary: Option<Fila> },
    Modify { path: Fila, secondary: Option<Fila> },
    Delete { path: Fila, secondary: Option<Fila> },
}

impl StorageEvent {
    pub fn create(path: Fila) -> Self {
        StorageEvent::Create {
            path,
            secondary: None,
        }
    }

    pub fn modify(path: Fila) -> Self {
        StorageEvent::Modify {
            path,
            secondary: None,
        }
    }

    pub fn delete(path: Fila) -> Self {
        StorageEvent::Delete {
            path,
            secondary: None,
        }
    }

    /// Event kind without the payload
    pub fn kind(&self) -> EventKind {
        match self {
            StorageEvent::Create { .. } => EventKind::Create,
            StorageEvent::Modify { .. } => EventKind::Modify,
            StorageEvent::Delete { .. } => EventKind::Delete,
        }
    }

    /// Get the primary address involved in this event
    pub fn path(&self) -> &Fila {
        match self {
            StorageEvent::Create { path, .. }
            | StorageEvent::Modify { path, .. }
            | StorageEvent::Delete { path, .. } => path,
        }
    }

    /// Get the secondary address, if any
    pub fn secondary(&self) -> Option<&Fila> {
        match self {
            StorageEvent::Create { secondary, .. }
            | StorageEvent::Modify { secondary, .. }
            | StorageEvent::Delete { secondary, .. } => secondary.as_ref(),
        }
    }
}

impl fmt::Display for StorageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.path())?;
        if let Some(secondary) = self.secondary() {
            write!(f, " ({})", secondary)?;
        }
        Ok(())
    }
}

type Callback = Box<dyn Fn(StorageEvent) + Send + Sync>;

struct SinkInner {
    open: AtomicBool,
    callback: Callback,
}

/// Gate between a backend's event source and the caller's callback
///
/// Backends emit through the sink; once closed, emits are dropped.
#[derive(Clone)]
pub struct EventSink {
    inner: Arc<SinkInner>,
}

impl EventSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(StorageEvent) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SinkInner {
                open: AtomicBool::new(true),
                callback: Box::new(callback),
            }),
        }
    }

    /// Deliver an event; returns false when the sink is closed
    pub fn emit(&self, event: StorageEvent) -> bool {
        if !self.inner.open.load(Ordering::Acquire) {
            return false;
        }
        (self.inner.callback)(event);
        true
    }

    /// Stop delivering events
    pub fn close(&self) {
        self.inner.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("open", &self.is_open())
            .finish()
    }
}

/// Backend half of a registered watch
#[async_trait]
pub trait Unwatch: Send {
    /// Detach from the native watch source
    async fn unwatch(&mut self) -> FilaResult<()>;
}

type Registering = JoinHandle<FilaResult<Box<dyn Unwatch>>>;

enum Registration {
    Pending(Registering),
    Active(Box<dyn Unwatch>),
    Failed(FilaError),
    Disposed,
}

/// Wait for a pending registration and record its outcome
async fn settle(state: &mut Registration) {
    let outcome = match state {
        Registration::Pending(handle) => Some(handle.await),
        _ => None,
    };

    if let Some(result) = outcome {
        *state = match result {
            Ok(Ok(unwatch)) => Registration::Active(unwatch),
            Ok(Err(e)) => Registration::Failed(e),
            Err(join) => Registration::Failed(FilaError::Watch(join.to_string())),
        };
    }
}

async fn dispose_registration(state: &Mutex<Registration>) -> FilaResult<()> {
    let mut state = state.lock().await;
    settle(&mut state).await;

    match std::mem::replace(&mut *state, Registration::Disposed) {
        Registration::Active(mut unwatch) => unwatch.unwatch().await,
        _ => Ok(()),
    }
}

/// Handle for a live watch
///
/// Dropping an undisposed subscription closes it and schedules the
/// unregister call on the current runtime.
pub struct WatchSubscription {
    sink: EventSink,
    state: Arc<Mutex<Registration>>,
}

impl WatchSubscription {
    /// Start registering `registration` on the current tokio runtime
    pub(crate) fn spawn<F>(sink: EventSink, registration: F) -> Self
    where
        F: Future<Output = FilaResult<Box<dyn Unwatch>>> + Send + 'static,
    {
        let state = match tokio::runtime::Handle::try_current() {
            Ok(handle) => Registration::Pending(handle.spawn(registration)),
            Err(_) => {
                sink.close();
                Registration::Failed(FilaError::Watch(
                    "watch requires a running tokio runtime".into(),
                ))
            }
        };

        Self {
            sink,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Wait until the backend finished registering
    pub async fn ready(&self) -> FilaResult<()> {
        let mut state = self.state.lock().await;
        settle(&mut state).await;

        match &*state {
            Registration::Failed(e) => Err(e.clone()),
            _ => Ok(()),
        }
    }

    /// Stop the subscription
    ///
    /// No callback runs after this is called. Safe to call repeatedly and
    /// before registration completed.
    pub async fn dispose(&self) -> FilaResult<()> {
        self.sink.close();
        let result = dispose_registration(&self.state).await;
        debug!(ok = result.is_ok(), "watch disposed");
        result
    }

    pub fn is_disposed(&self) -> bool {
        !self.sink.is_open()
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        if !self.sink.is_open() {
            return;
        }
        self.sink.close();

        let state = Arc::clone(&self.state);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = dispose_registration(&state).await {
                        warn!(error = %e, "failed to unregister dropped watch");
                    }
                });
            }
            Err(_) => warn!("watch dropped outside a runtime; backend listener leaked"),
        }
    }
}

impl fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
