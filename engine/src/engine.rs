use crate::config::{Config, EventConfig, LegacyOverride};
use bus::{EventBus, ObserverId};
use event_core::context::Context;
use event_core::event::{Event, EventError, EventParams};
use event_core::model::{Chapter, ModuleInstance};
use legacy_log::{LegacyLogAdapter, LegacyLogEntry, LegacyLogError, LegacyLogWriter, LegacyMapping};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Replays configured events through a bus with a legacy log writer
/// attached.
pub struct Engine {
    config: Config,
    bus: EventBus,
    writer: Arc<LegacyLogWriter>,
    writer_id: ObserverId,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self, EngineError> {
        info!("Initializing giportfolio event engine");

        let adapter = build_adapter(&config.legacy);
        let mut writer = LegacyLogWriter::new(adapter);
        if let Some(path) = &config.engine.legacy_log_path {
            writer = writer.with_file(path).map_err(EngineError::Legacy)?;
        }

        let bus = EventBus::new();
        let writer = Arc::new(writer);
        let writer_id = bus.register(writer.clone());

        Ok(Self {
            config,
            bus,
            writer,
            writer_id,
        })
    }

    #[allow(dead_code)]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[allow(dead_code)]
    pub fn legacy_entries(&self) -> Vec<LegacyLogEntry> {
        self.writer.entries()
    }

    pub fn run(&self) -> RunSummary {
        let sink = self.bus.capture();
        let mut summary = RunSummary::default();

        for (idx, event_config) in self.config.events.iter().enumerate() {
            let mut event = match build_event(event_config) {
                Ok(event) => event,
                Err(e) => {
                    error!("Skipping event #{} ({}): {}", idx, event_config.kind, e);
                    summary.failed += 1;
                    continue;
                }
            };

            match self.bus.trigger(&mut event) {
                Ok(()) => {
                    info!("Triggered {}", event.kind().event_name());
                    summary.triggered += 1;
                }
                Err(e) => {
                    error!("Failed to trigger event #{}: {}", idx, e);
                    summary.failed += 1;
                }
            }
        }

        summary.captured = sink.count();
        summary.legacy_entries = self.writer.entries().len();

        if self.config.engine.print_legacy {
            for entry in self.writer.entries() {
                match serde_json::to_string(&entry) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Could not print legacy entry: {}", e),
                }
            }
        }

        summary
    }

    pub fn get_status(&self) -> EngineStatus {
        EngineStatus {
            observers: self.bus.observer_count(),
            configured_events: self.config.events.len(),
            legacy_overrides: self.config.legacy.len(),
        }
    }

    pub fn shutdown(&mut self) {
        if self.bus.unregister(self.writer_id) {
            info!("Legacy log writer detached");
        }
    }
}

pub fn build_adapter(overrides: &[LegacyOverride]) -> LegacyLogAdapter {
    let mut adapter = LegacyLogAdapter::new();

    for legacy in overrides {
        let mut mapping = adapter
            .mapping(legacy.kind)
            .cloned()
            .unwrap_or_else(|| LegacyMapping::new("", ""));

        if let Some(action) = &legacy.action {
            mapping.action = action.clone();
        }
        if let Some(url) = &legacy.url {
            mapping.url = url.clone();
        }
        if let Some(object) = legacy.object {
            mapping.object = object;
        }
        if let Some(secondary) = legacy.secondary {
            mapping.secondary = secondary;
        }

        info!("Legacy mapping for {} overridden", legacy.kind);
        adapter = adapter.with_mapping(legacy.kind, mapping);
    }

    adapter
}

pub fn build_event(config: &EventConfig) -> Result<Event, EngineError> {
    let event = if config.kind.is_chapter_event() {
        let (Some(cmid), Some(instance_id), Some(chapter_id)) =
            (config.cmid, config.instance_id, config.chapter_id)
        else {
            return Err(EngineError::Config(format!(
                "{} needs cmid, instance_id and chapter_id",
                config.kind
            )));
        };
        let module = ModuleInstance {
            id: instance_id,
            cmid,
            course_id: config.course_id,
            name: String::new(),
        };
        let chapter = Chapter {
            id: chapter_id,
            portfolio_id: instance_id,
            title: String::new(),
            page_num: 0,
        };
        Event::create_from_chapter(config.kind, &module, &module.context(), &chapter)?
    } else if let Some(cmid) = config.cmid {
        let mut params = EventParams::new().with_context(Context::module(config.course_id, cmid));
        if let Some(id) = config.instance_id {
            params = params.with_object_id(id);
        }
        Event::create(config.kind, params)?
    } else {
        Event::create(
            config.kind,
            EventParams::new().with_context(Context::course(config.course_id)),
        )?
    };

    Ok(match config.user_id {
        Some(user_id) => event.with_user(user_id),
        None => event,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub triggered: usize,
    pub failed: usize,
    pub captured: usize,
    pub legacy_entries: usize,
}

#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub observers: usize,
    pub configured_events: usize,
    pub legacy_overrides: usize,
}

#[derive(Debug, Clone)]
pub enum EngineError {
    Config(String),
    Event(EventError),
    Legacy(LegacyLogError),
}

impl From<EventError> for EngineError {
    fn from(err: EventError) -> Self {
        EngineError::Event(err)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EngineError::Event(e) => write!(f, "Event error: {}", e),
            EngineError::Legacy(e) => write!(f, "Legacy log error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}
