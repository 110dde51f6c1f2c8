use crate::event::Event;
use std::fmt;

#[derive(Debug, Clone)]
pub enum ObserverError {
    Rejected(String),
    Mapping(String),
    Io(String),
}

impl fmt::Display for ObserverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserverError::Rejected(msg) => write!(f, "Event rejected: {}", msg),
            ObserverError::Mapping(msg) => write!(f, "Event mapping error: {}", msg),
            ObserverError::Io(msg) => write!(f, "Observer I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ObserverError {}

/// Receives every event triggered on a bus it is registered with.
pub trait EventObserver: Send + Sync {
    fn name(&self) -> &str;

    fn observe(&self, event: &Event) -> Result<(), ObserverError>;
}

/// Adapts a closure into an observer.
pub struct FnObserver<F> {
    name: String,
    callback: F,
}

impl<F> FnObserver<F>
where
    F: Fn(&Event) -> Result<(), ObserverError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> EventObserver for FnObserver<F>
where
    F: Fn(&Event) -> Result<(), ObserverError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn observe(&self, event: &Event) -> Result<(), ObserverError> {
        (self.callback)(event)
    }
}

impl<F> fmt::Debug for FnObserver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnObserver({})", self.name)
    }
}
