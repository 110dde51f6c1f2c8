use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextLevel {
    Course,
    Module,
}

/// Scope an event belongs to. Stands in for the host's context lookup:
/// two handles built from the same course/module ids compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Context {
    Course { course_id: i64 },
    Module { course_id: i64, cmid: i64 },
}

impl Context {
    pub fn course(course_id: i64) -> Self {
        Context::Course { course_id }
    }

    pub fn module(course_id: i64, cmid: i64) -> Self {
        Context::Module { course_id, cmid }
    }

    pub fn level(&self) -> ContextLevel {
        match self {
            Context::Course { .. } => ContextLevel::Course,
            Context::Module { .. } => ContextLevel::Module,
        }
    }

    pub fn course_id(&self) -> i64 {
        match self {
            Context::Course { course_id } | Context::Module { course_id, .. } => *course_id,
        }
    }

    /// Course module id, only known for module contexts.
    pub fn cmid(&self) -> Option<i64> {
        match self {
            Context::Course { .. } => None,
            Context::Module { cmid, .. } => Some(*cmid),
        }
    }

    /// Id of the instance the context wraps (course id or cmid).
    pub fn instance_id(&self) -> i64 {
        match self {
            Context::Course { course_id } => *course_id,
            Context::Module { cmid, .. } => *cmid,
        }
    }
}

impl fmt::Display for ContextLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextLevel::Course => write!(f, "course"),
            ContextLevel::Module => write!(f, "module"),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Course { course_id } => write!(f, "course:{}", course_id),
            Context::Module { course_id, cmid } => write!(f, "module:{}/{}", course_id, cmid),
        }
    }
}
