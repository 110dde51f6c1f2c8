//! Plain-data builders for courses, portfolio modules and chapters.
//!
//! Each id family starts in its own range so a course id can never be
//! mistaken for a cmid or a chapter id in assertions.

use crate::model::{Chapter, Course, ModuleInstance};

const COURSE_BASE: i64 = 100;
const INSTANCE_BASE: i64 = 300;
const CMID_BASE: i64 = 500;
const CHAPTER_BASE: i64 = 700;

#[derive(Debug, Clone)]
pub struct FixtureBuilder {
    next_course: i64,
    next_instance: i64,
    next_cmid: i64,
    next_chapter: i64,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            next_course: COURSE_BASE,
            next_instance: INSTANCE_BASE,
            next_cmid: CMID_BASE,
            next_chapter: CHAPTER_BASE,
        }
    }

    pub fn create_course(&mut self) -> Course {
        let id = bump(&mut self.next_course);
        Course {
            id,
            fullname: format!("Test course {}", id),
            shortname: format!("tc_{}", id),
        }
    }

    pub fn create_module(&mut self, course: &Course) -> ModuleInstance {
        let id = bump(&mut self.next_instance);
        ModuleInstance {
            id,
            cmid: bump(&mut self.next_cmid),
            course_id: course.id,
            name: format!("Portfolio {}", id),
        }
    }

    pub fn create_chapter(&mut self, module: &ModuleInstance) -> Chapter {
        let id = bump(&mut self.next_chapter);
        Chapter {
            id,
            portfolio_id: module.id,
            title: format!("Chapter {}", id),
            page_num: (id - CHAPTER_BASE) as u32,
        }
    }
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}
