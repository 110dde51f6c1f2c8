use crate::{ObserverId, Registry};
use event_core::event::Event;
use event_core::observer::{EventObserver, ObserverError};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

struct CaptureObserver {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventObserver for CaptureObserver {
    fn name(&self) -> &str {
        "capture_sink"
    }

    fn observe(&self, event: &Event) -> Result<(), ObserverError> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }
}

/// Records events triggered while its window is open. Closing the window
/// (explicitly or by dropping the sink) stops recording; what was captured
/// stays readable.
pub struct CaptureSink {
    id: ObserverId,
    events: Arc<Mutex<Vec<Event>>>,
    registry: Weak<Registry>,
    open: bool,
}

impl CaptureSink {
    pub(crate) fn open(registry: &Arc<Registry>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let observer = CaptureObserver {
            events: events.clone(),
        };
        let id = registry.insert(Arc::new(observer));
        debug!("Capture window #{} opened", id);

        Self {
            id,
            events,
            registry: Arc::downgrade(registry),
            open: true,
        }
    }

    /// Every event captured so far, in delivery order.
    pub fn get_events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        debug!("Capture window #{} closed with {} events", self.id, self.count());
    }
}

impl Drop for CaptureSink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSink")
            .field("id", &self.id)
            .field("open", &self.open)
            .field("events", &self.count())
            .finish()
    }
}
