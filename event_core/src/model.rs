use crate::context::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub fullname: String,
    pub shortname: String,
}

impl Course {
    pub fn context(&self) -> Context {
        Context::course(self.id)
    }
}

/// A giportfolio activity placed in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInstance {
    /// Portfolio instance id.
    pub id: i64,
    /// Course module id.
    pub cmid: i64,
    pub course_id: i64,
    pub name: String,
}

impl ModuleInstance {
    pub fn context(&self) -> Context {
        Context::module(self.course_id, self.cmid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: i64,
    pub portfolio_id: i64,
    pub title: String,
    pub page_num: u32,
}
