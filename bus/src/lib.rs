mod sink;

use event_core::event::{Event, EventKind};
use event_core::observer::{EventObserver, ObserverError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use sink::CaptureSink;

pub type ObserverId = u64;

type ObserverEntry = (ObserverId, Arc<dyn EventObserver>);

#[derive(Default)]
pub(crate) struct Registry {
    observers: RwLock<Vec<ObserverEntry>>,
    next_id: AtomicU64,
}

impl Registry {
    fn insert(&self, observer: Arc<dyn EventObserver>) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        info!("Registered observer '{}' as #{}", observer.name(), id);
        observers.push((id, observer));
        id
    }

    pub(crate) fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        match observers.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(idx) => {
                let (_, observer) = observers.remove(idx);
                info!("Unregistered observer '{}' (#{})", observer.name(), id);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> Vec<ObserverEntry> {
        self.observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Synchronous fan-out of triggered events to registered observers.
///
/// Cloning the bus yields another handle onto the same observer list.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn EventObserver>) -> ObserverId {
        self.registry.insert(observer)
    }

    pub fn unregister(&self, id: ObserverId) -> bool {
        self.registry.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.registry
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Opens a capture window. The sink records every event triggered on
    /// this bus until it is closed or dropped.
    pub fn capture(&self) -> CaptureSink {
        CaptureSink::open(&self.registry)
    }

    /// Fires `event` once. Observers run in registration order and the
    /// first failure stops delivery and is returned; the event stays fired.
    pub fn trigger(&self, event: &mut Event) -> Result<(), BusError> {
        if let Err(e) = event.mark_triggered() {
            warn!("Rejected re-trigger: {}", e);
            return Err(BusError::AlreadyTriggered {
                kind: event.kind(),
                id: event.id(),
            });
        }

        let observers = self.registry.snapshot();
        debug!(
            "Triggering {} for {} observers",
            event.kind().event_name(),
            observers.len()
        );

        for (id, observer) in observers {
            debug!("Delivering {} to '{}' (#{})", event.kind(), observer.name(), id);
            if let Err(e) = observer.observe(event) {
                error!(
                    "Observer '{}' failed on {}: {}",
                    observer.name(),
                    event.kind(),
                    e
                );
                return Err(BusError::Observer {
                    observer: observer.name().to_string(),
                    source: e,
                });
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventBus({} observers)", self.observer_count())
    }
}

#[derive(Debug, Clone)]
pub enum BusError {
    AlreadyTriggered { kind: EventKind, id: Uuid },
    Observer {
        observer: String,
        source: ObserverError,
    },
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusError::AlreadyTriggered { kind, id } => {
                write!(f, "Event {} ({}) already triggered", kind, id)
            }
            BusError::Observer { observer, source } => {
                write!(f, "Observer '{}' failed: {}", observer, source)
            }
        }
    }
}

impl std::error::Error for BusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BusError::Observer { source, .. } => Some(source),
            BusError::AlreadyTriggered { .. } => None,
        }
    }
}
