use crate::context::{Context, ContextLevel};
use crate::model::{Chapter, ModuleInstance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

pub const COMPONENT: &str = "mod_giportfolio";

/// Metadata key holding the portfolio instance id on chapter events.
pub const INSTANCE_ID_KEY: &str = "giportfolioid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ChapterCreated,
    ChapterUpdated,
    ChapterDeleted,
    ChapterViewed,
    CourseModuleViewed,
    CourseModuleInstanceListViewed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crud {
    Create,
    Read,
    Update,
    Delete,
}

impl Crud {
    pub fn as_char(&self) -> char {
        match self {
            Crud::Create => 'c',
            Crud::Read => 'r',
            Crud::Update => 'u',
            Crud::Delete => 'd',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EduLevel {
    Participating,
    Teaching,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::ChapterCreated,
        EventKind::ChapterUpdated,
        EventKind::ChapterDeleted,
        EventKind::ChapterViewed,
        EventKind::CourseModuleViewed,
        EventKind::CourseModuleInstanceListViewed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ChapterCreated => "chapter_created",
            EventKind::ChapterUpdated => "chapter_updated",
            EventKind::ChapterDeleted => "chapter_deleted",
            EventKind::ChapterViewed => "chapter_viewed",
            EventKind::CourseModuleViewed => "course_module_viewed",
            EventKind::CourseModuleInstanceListViewed => "course_module_instance_list_viewed",
        }
    }

    /// Fully qualified name, e.g. `\mod_giportfolio\event\chapter_created`.
    pub fn event_name(&self) -> String {
        format!("\\{}\\event\\{}", COMPONENT, self.as_str())
    }

    pub fn crud(&self) -> Crud {
        match self {
            EventKind::ChapterCreated => Crud::Create,
            EventKind::ChapterUpdated => Crud::Update,
            EventKind::ChapterDeleted => Crud::Delete,
            EventKind::ChapterViewed
            | EventKind::CourseModuleViewed
            | EventKind::CourseModuleInstanceListViewed => Crud::Read,
        }
    }

    pub fn edu_level(&self) -> EduLevel {
        match self.crud() {
            Crud::Read => EduLevel::Participating,
            _ => EduLevel::Teaching,
        }
    }

    pub fn object_table(&self) -> Option<&'static str> {
        match self {
            EventKind::ChapterCreated
            | EventKind::ChapterUpdated
            | EventKind::ChapterDeleted
            | EventKind::ChapterViewed => Some("giportfolio_chapters"),
            EventKind::CourseModuleViewed => Some("giportfolio"),
            EventKind::CourseModuleInstanceListViewed => None,
        }
    }

    pub fn is_chapter_event(&self) -> bool {
        self.object_table() == Some("giportfolio_chapters")
    }

    pub fn context_level(&self) -> ContextLevel {
        match self {
            EventKind::CourseModuleInstanceListViewed => ContextLevel::Course,
            _ => ContextLevel::Module,
        }
    }

    pub fn requires_object_id(&self) -> bool {
        self.object_table().is_some()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    #[default]
    Unfired,
    Fired,
}

#[derive(Debug, Clone)]
pub enum EventError {
    MissingParameter {
        kind: EventKind,
        name: &'static str,
    },
    UnexpectedParameter {
        kind: EventKind,
        name: &'static str,
    },
    ContextMismatch {
        kind: EventKind,
        expected: ContextLevel,
        actual: ContextLevel,
    },
    NotAChapterEvent(EventKind),
    ChapterMismatch {
        chapter_id: i64,
        portfolio_id: i64,
        module_id: i64,
    },
    ModuleContextMismatch {
        cmid: i64,
        context: Context,
    },
    AlreadyTriggered {
        kind: EventKind,
        id: Uuid,
    },
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::MissingParameter { kind, name } => {
                write!(f, "Event {} requires the '{}' parameter", kind, name)
            }
            EventError::UnexpectedParameter { kind, name } => {
                write!(f, "Event {} does not accept the '{}' parameter", kind, name)
            }
            EventError::ContextMismatch {
                kind,
                expected,
                actual,
            } => write!(
                f,
                "Event {} needs a {} context, got a {} context",
                kind, expected, actual
            ),
            EventError::NotAChapterEvent(kind) => {
                write!(f, "Event {} cannot be created from a chapter", kind)
            }
            EventError::ChapterMismatch {
                chapter_id,
                portfolio_id,
                module_id,
            } => write!(
                f,
                "Chapter {} belongs to portfolio {}, not {}",
                chapter_id, portfolio_id, module_id
            ),
            EventError::ModuleContextMismatch { cmid, context } => {
                write!(f, "Context {} does not wrap course module {}", context, cmid)
            }
            EventError::AlreadyTriggered { kind, id } => {
                write!(f, "Event {} ({}) already triggered", kind, id)
            }
        }
    }
}

impl std::error::Error for EventError {}

/// Options accepted by [`Event::create`].
#[derive(Debug, Clone, Default)]
pub struct EventParams {
    pub context: Option<Context>,
    pub object_id: Option<i64>,
    pub user_id: Option<i64>,
    pub metadata: HashMap<String, String>,
}

impl EventParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_object_id(mut self, object_id: i64) -> Self {
        self.object_id = Some(object_id);
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// A domain event. Fields are fixed at construction; only the trigger
/// state moves, once, from unfired to fired. The state travels with
/// serialized copies.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    timestamp: DateTime<Utc>,
    kind: EventKind,
    object_id: Option<i64>,
    context: Context,
    course_id: i64,
    component: String,
    user_id: Option<i64>,
    metadata: HashMap<String, String>,
    #[serde(default)]
    state: TriggerState,
}

/// A copy of a fired event is the same, already delivered, event. A copy
/// of an unfired event is a second event and gets its own id.
impl Clone for Event {
    fn clone(&self) -> Self {
        let id = match self.state {
            TriggerState::Fired => self.id,
            TriggerState::Unfired => Uuid::new_v4(),
        };

        Self {
            id,
            timestamp: self.timestamp,
            kind: self.kind,
            object_id: self.object_id,
            context: self.context,
            course_id: self.course_id,
            component: self.component.clone(),
            user_id: self.user_id,
            metadata: self.metadata.clone(),
            state: self.state,
        }
    }
}

impl Event {
    pub fn create(kind: EventKind, params: EventParams) -> Result<Self, EventError> {
        let context = params.context.ok_or(EventError::MissingParameter {
            kind,
            name: "context",
        })?;

        if context.level() != kind.context_level() {
            return Err(EventError::ContextMismatch {
                kind,
                expected: kind.context_level(),
                actual: context.level(),
            });
        }

        match (kind.requires_object_id(), params.object_id) {
            (true, None) => {
                return Err(EventError::MissingParameter {
                    kind,
                    name: "objectid",
                });
            }
            (false, Some(_)) => {
                return Err(EventError::UnexpectedParameter {
                    kind,
                    name: "objectid",
                });
            }
            _ => {}
        }

        Ok(Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            object_id: params.object_id,
            context,
            course_id: context.course_id(),
            component: COMPONENT.to_string(),
            user_id: params.user_id,
            metadata: params.metadata,
            state: TriggerState::Unfired,
        })
    }

    /// Builds a chapter event. The chapter becomes the object; the owning
    /// portfolio instance id is kept under [`INSTANCE_ID_KEY`].
    pub fn create_from_chapter(
        kind: EventKind,
        module: &ModuleInstance,
        context: &Context,
        chapter: &Chapter,
    ) -> Result<Self, EventError> {
        if !kind.is_chapter_event() {
            return Err(EventError::NotAChapterEvent(kind));
        }

        if chapter.portfolio_id != module.id {
            return Err(EventError::ChapterMismatch {
                chapter_id: chapter.id,
                portfolio_id: chapter.portfolio_id,
                module_id: module.id,
            });
        }

        if let Context::Module { course_id, cmid } = *context {
            if cmid != module.cmid || course_id != module.course_id {
                return Err(EventError::ModuleContextMismatch {
                    cmid: module.cmid,
                    context: *context,
                });
            }
        }

        let params = EventParams::new()
            .with_context(*context)
            .with_object_id(chapter.id)
            .with_metadata(INSTANCE_ID_KEY, module.id);

        Self::create(kind, params)
    }

    pub fn chapter_created(
        module: &ModuleInstance,
        context: &Context,
        chapter: &Chapter,
    ) -> Result<Self, EventError> {
        Self::create_from_chapter(EventKind::ChapterCreated, module, context, chapter)
    }

    pub fn chapter_updated(
        module: &ModuleInstance,
        context: &Context,
        chapter: &Chapter,
    ) -> Result<Self, EventError> {
        Self::create_from_chapter(EventKind::ChapterUpdated, module, context, chapter)
    }

    pub fn chapter_deleted(
        module: &ModuleInstance,
        context: &Context,
        chapter: &Chapter,
    ) -> Result<Self, EventError> {
        Self::create_from_chapter(EventKind::ChapterDeleted, module, context, chapter)
    }

    pub fn chapter_viewed(
        module: &ModuleInstance,
        context: &Context,
        chapter: &Chapter,
    ) -> Result<Self, EventError> {
        Self::create_from_chapter(EventKind::ChapterViewed, module, context, chapter)
    }

    /// Sets the acting user before the event is triggered.
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn object_id(&self) -> Option<i64> {
        self.object_id
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn course_id(&self) -> i64 {
        self.course_id
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn metadata_id(&self, key: &str) -> Option<i64> {
        self.metadata.get(key).and_then(|v| v.parse().ok())
    }

    /// Portfolio instance id: the object itself for module views, the
    /// recorded owner for chapter events.
    pub fn instance_id(&self) -> Option<i64> {
        match self.kind {
            EventKind::CourseModuleViewed => self.object_id,
            _ => self.metadata_id(INSTANCE_ID_KEY),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.state == TriggerState::Fired
    }

    /// Moves the event to the fired state. Fails if it already fired.
    pub fn mark_triggered(&mut self) -> Result<(), EventError> {
        if self.state == TriggerState::Fired {
            return Err(EventError::AlreadyTriggered {
                kind: self.kind,
                id: self.id,
            });
        }
        self.state = TriggerState::Fired;
        Ok(())
    }

    /// Location of the object inside the plugin.
    pub fn url(&self) -> String {
        let cmid = self.context.instance_id();
        match (self.kind, self.object_id) {
            (EventKind::CourseModuleInstanceListViewed, _) => {
                format!("/mod/giportfolio/index.php?id={}", self.course_id)
            }
            (EventKind::ChapterDeleted | EventKind::CourseModuleViewed, _) | (_, None) => {
                format!("/mod/giportfolio/view.php?id={}", cmid)
            }
            (_, Some(chapter_id)) => {
                format!("/mod/giportfolio/view.php?id={}&chapterid={}", cmid, chapter_id)
            }
        }
    }

    pub fn description(&self) -> String {
        let user = self
            .user_id
            .map(|id| format!("The user with id '{}'", id))
            .unwrap_or_else(|| "An anonymous user".to_string());
        let object = self.object_id.unwrap_or_default();
        let cmid = self.context.instance_id();

        match self.kind {
            EventKind::ChapterCreated => format!(
                "{} created the chapter with id '{}' for the giportfolio with course module id '{}'.",
                user, object, cmid
            ),
            EventKind::ChapterUpdated => format!(
                "{} updated the chapter with id '{}' for the giportfolio with course module id '{}'.",
                user, object, cmid
            ),
            EventKind::ChapterDeleted => format!(
                "{} deleted the chapter with id '{}' for the giportfolio with course module id '{}'.",
                user, object, cmid
            ),
            EventKind::ChapterViewed => format!(
                "{} viewed the chapter with id '{}' for the giportfolio with course module id '{}'.",
                user, object, cmid
            ),
            EventKind::CourseModuleViewed => format!(
                "{} viewed the giportfolio with course module id '{}'.",
                user, cmid
            ),
            EventKind::CourseModuleInstanceListViewed => format!(
                "{} viewed the list of giportfolios in the course with id '{}'.",
                user, self.course_id
            ),
        }
    }
}
