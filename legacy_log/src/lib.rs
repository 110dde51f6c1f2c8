pub mod writer;

use event_core::event::{Event, EventKind};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use writer::LegacyLogWriter;

/// Module name written into every legacy entry.
pub const LEGACY_MODULE: &str = "giportfolio";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([a-z]+)\}").unwrap();
}

/// The six-field record older reporting tools read. Field order and the
/// empty strings for absent ids are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyLogEntry {
    pub course_id: i64,
    pub module: String,
    pub action: String,
    pub url: String,
    pub object_id: String,
    pub cm_id: String,
}

impl LegacyLogEntry {
    pub fn as_tuple(&self) -> (i64, &str, &str, &str, &str, &str) {
        (
            self.course_id,
            &self.module,
            &self.action,
            &self.url,
            &self.object_id,
            &self.cm_id,
        )
    }
}

/// Which id of the event fills a legacy id slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdField {
    Object,
    Instance,
    CourseModule,
    Course,
    None,
}

impl IdField {
    fn resolve(&self, event: &Event) -> Result<String, LegacyLogError> {
        let (field, value) = match self {
            IdField::None => return Ok(String::new()),
            IdField::Object => ("objectid", event.object_id()),
            IdField::Instance => ("instanceid", event.instance_id()),
            IdField::CourseModule => ("cmid", event.context().cmid()),
            IdField::Course => ("courseid", Some(event.course_id())),
        };
        value
            .map(|v| v.to_string())
            .ok_or(LegacyLogError::MissingData {
                kind: event.kind(),
                field,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyMapping {
    pub action: String,
    /// Relative URL with `{courseid}`, `{cmid}`, `{objectid}` or
    /// `{instanceid}` placeholders.
    pub url: String,
    pub object: IdField,
    pub secondary: IdField,
}

impl LegacyMapping {
    pub fn new(action: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            url: url.into(),
            object: IdField::Object,
            secondary: IdField::CourseModule,
        }
    }

    pub fn with_object(mut self, object: IdField) -> Self {
        self.object = object;
        self
    }

    pub fn with_secondary(mut self, secondary: IdField) -> Self {
        self.secondary = secondary;
        self
    }

    pub fn render_url(&self, event: &Event) -> Result<String, LegacyLogError> {
        let mut url = String::with_capacity(self.url.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&self.url) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let field = match name.as_str() {
                "courseid" => IdField::Course,
                "cmid" => IdField::CourseModule,
                "objectid" => IdField::Object,
                "instanceid" => IdField::Instance,
                other => {
                    return Err(LegacyLogError::UnknownPlaceholder {
                        kind: event.kind(),
                        name: other.to_string(),
                    });
                }
            };
            url.push_str(&self.url[last..whole.start()]);
            url.push_str(&field.resolve(event)?);
            last = whole.end();
        }

        url.push_str(&self.url[last..]);
        Ok(url)
    }
}

/// Table from event kind to its legacy representation.
#[derive(Debug, Clone)]
pub struct LegacyLogAdapter {
    module: String,
    mappings: BTreeMap<EventKind, LegacyMapping>,
}

impl LegacyLogAdapter {
    pub fn new() -> Self {
        let chapter_url = "view.php?id={cmid}&chapterid={objectid}";
        let module_url = "view.php?id={cmid}";

        Self::empty()
            .with_mapping(
                EventKind::ChapterCreated,
                LegacyMapping::new("add chapter", chapter_url),
            )
            .with_mapping(
                EventKind::ChapterUpdated,
                LegacyMapping::new("update chapter", chapter_url),
            )
            // Deletion is logged as an update of the portfolio itself.
            .with_mapping(
                EventKind::ChapterDeleted,
                LegacyMapping::new("update", module_url).with_object(IdField::Instance),
            )
            // The view log always carried an HTML-escaped separator.
            .with_mapping(
                EventKind::ChapterViewed,
                LegacyMapping::new("view chapter", "view.php?id={cmid}&amp;chapterid={objectid}"),
            )
            .with_mapping(
                EventKind::CourseModuleViewed,
                LegacyMapping::new("view", module_url),
            )
            .with_mapping(
                EventKind::CourseModuleInstanceListViewed,
                LegacyMapping::new("view all", "index.php?id={courseid}")
                    .with_object(IdField::None)
                    .with_secondary(IdField::None),
            )
    }

    pub fn empty() -> Self {
        Self {
            module: LEGACY_MODULE.to_string(),
            mappings: BTreeMap::new(),
        }
    }

    pub fn with_mapping(mut self, kind: EventKind, mapping: LegacyMapping) -> Self {
        self.mappings.insert(kind, mapping);
        self
    }

    pub fn without(mut self, kind: EventKind) -> Self {
        self.mappings.remove(&kind);
        self
    }

    pub fn mapping(&self, kind: EventKind) -> Option<&LegacyMapping> {
        self.mappings.get(&kind)
    }

    pub fn map(&self, event: &Event) -> Result<LegacyLogEntry, LegacyLogError> {
        let mapping = self
            .mappings
            .get(&event.kind())
            .ok_or(LegacyLogError::Unmapped(event.kind()))?;

        Ok(LegacyLogEntry {
            course_id: event.course_id(),
            module: self.module.clone(),
            action: mapping.action.clone(),
            url: mapping.render_url(event)?,
            object_id: mapping.object.resolve(event)?,
            cm_id: mapping.secondary.resolve(event)?,
        })
    }
}

impl Default for LegacyLogAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Legacy entry for `event` using the built-in table.
pub fn legacy_log_data(event: &Event) -> Result<LegacyLogEntry, LegacyLogError> {
    LegacyLogAdapter::new().map(event)
}

#[derive(Debug, Clone)]
pub enum LegacyLogError {
    Unmapped(EventKind),
    MissingData {
        kind: EventKind,
        field: &'static str,
    },
    UnknownPlaceholder {
        kind: EventKind,
        name: String,
    },
    Io(String),
    Serialize(String),
}

impl std::fmt::Display for LegacyLogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegacyLogError::Unmapped(kind) => write!(f, "Unmapped event kind: {}", kind),
            LegacyLogError::MissingData { kind, field } => {
                write!(f, "Event {} has no value for '{}'", kind, field)
            }
            LegacyLogError::UnknownPlaceholder { kind, name } => {
                write!(f, "Unknown placeholder '{{{}}}' in URL for {}", name, kind)
            }
            LegacyLogError::Io(msg) => write!(f, "Legacy log I/O error: {}", msg),
            LegacyLogError::Serialize(msg) => write!(f, "Legacy log serialization error: {}", msg),
        }
    }
}

impl std::error::Error for LegacyLogError {}

#[cfg(test)]
mod tests {
    use super::*;
    use event_core::context::Context;
    use event_core::event::EventParams;
    use event_core::fixtures::FixtureBuilder;

    #[test]
    fn test_chapter_created_entry() {
        let mut fixtures = FixtureBuilder::new();
        let course = fixtures.create_course();
        let module = fixtures.create_module(&course);
        let chapter = fixtures.create_chapter(&module);
        let event = Event::chapter_created(&module, &module.context(), &chapter).unwrap();

        let entry = legacy_log_data(&event).unwrap();
        let url = format!("view.php?id={}&chapterid={}", module.cmid, chapter.id);
        let object_id = chapter.id.to_string();
        let cm_id = module.cmid.to_string();
        assert_eq!(
            entry.as_tuple(),
            (course.id, "giportfolio", "add chapter", url.as_str(), object_id.as_str(), cm_id.as_str())
        );
    }

    #[test]
    fn test_chapter_deleted_uses_module_instance() {
        let mut fixtures = FixtureBuilder::new();
        let course = fixtures.create_course();
        let module = fixtures.create_module(&course);
        let chapter = fixtures.create_chapter(&module);
        let event = Event::chapter_deleted(&module, &module.context(), &chapter).unwrap();

        let entry = legacy_log_data(&event).unwrap();
        assert_eq!(entry.action, "update");
        assert_eq!(entry.url, format!("view.php?id={}", module.cmid));
        assert_eq!(entry.object_id, module.id.to_string());
        assert_eq!(entry.cm_id, module.cmid.to_string());
    }

    #[test]
    fn test_instance_list_has_empty_ids() {
        let event = Event::create(
            EventKind::CourseModuleInstanceListViewed,
            EventParams::new().with_context(Context::course(12)),
        )
        .unwrap();

        let entry = legacy_log_data(&event).unwrap();
        assert_eq!(entry.as_tuple(), (12, "giportfolio", "view all", "index.php?id=12", "", ""));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let event = Event::create(
            EventKind::CourseModuleViewed,
            EventParams::new()
                .with_context(Context::module(3, 6))
                .with_object_id(9),
        )
        .unwrap();

        let adapter = LegacyLogAdapter::new();
        assert_eq!(adapter.map(&event).unwrap(), adapter.map(&event).unwrap());
    }

    #[test]
    fn test_unmapped_kind_fails() {
        let event = Event::create(
            EventKind::CourseModuleViewed,
            EventParams::new()
                .with_context(Context::module(3, 6))
                .with_object_id(9),
        )
        .unwrap();

        let adapter = LegacyLogAdapter::new().without(EventKind::CourseModuleViewed);
        assert!(matches!(
            adapter.map(&event),
            Err(LegacyLogError::Unmapped(EventKind::CourseModuleViewed))
        ));
    }

    #[test]
    fn test_missing_instance_id_fails() {
        // Built through the generic factory, so no owning portfolio is recorded.
        let event = Event::create(
            EventKind::ChapterDeleted,
            EventParams::new()
                .with_context(Context::module(3, 6))
                .with_object_id(9),
        )
        .unwrap();

        assert!(matches!(
            legacy_log_data(&event),
            Err(LegacyLogError::MissingData {
                field: "instanceid",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let event = Event::create(
            EventKind::CourseModuleViewed,
            EventParams::new()
                .with_context(Context::module(3, 6))
                .with_object_id(9),
        )
        .unwrap();

        let adapter = LegacyLogAdapter::new().with_mapping(
            EventKind::CourseModuleViewed,
            LegacyMapping::new("view", "view.php?id={nope}"),
        );
        assert!(matches!(
            adapter.map(&event),
            Err(LegacyLogError::UnknownPlaceholder { .. })
        ));
    }
}
