//! Lesson context lookup.

use std::collections::HashMap;

use tutorlane_types::lesson::LessonContext;

/// Source of lesson metadata for the active lesson id.
pub trait LessonCatalog: Send + Sync {
    fn get_context(&self, lesson_id: &str) -> Option<LessonContext>;

    /// Ids of every known lesson, sorted.
    fn lesson_ids(&self) -> Vec<String>;
}

/// Catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLessonCatalog {
    lessons: HashMap<String, LessonContext>,
}

impl InMemoryLessonCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lesson(mut self, lesson_id: impl Into<String>, context: LessonContext) -> Self {
        self.insert(lesson_id, context);
        self
    }

    pub fn insert(&mut self, lesson_id: impl Into<String>, context: LessonContext) {
        self.lessons.insert(lesson_id.into(), context);
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

impl LessonCatalog for InMemoryLessonCatalog {
    fn get_context(&self, lesson_id: &str) -> Option<LessonContext> {
        self.lessons.get(lesson_id).cloned()
    }

    fn lesson_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lessons.keys().cloned().collect();
        ids.sort();
        ids
    }
}
