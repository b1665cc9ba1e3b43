use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    CourseId, CourseRecord, Department, ProfessorCourseMapping, ProfessorRecord, RatingRecord,
    SavedItem, SavedKind,
};

/// Read access to the professors, courses, ratings and professor_courses
/// collections. Lookups that miss return `Ok(None)` or an empty vector; `Err`
/// is reserved for transport and query failures.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn professor_by_key(&self, key: &str) -> Result<Option<ProfessorRecord>>;

    /// Exact match on `full_name`, the key ratings and mapping rows join on.
    async fn professor_by_name(&self, full_name: &str) -> Result<Option<ProfessorRecord>>;

    async fn course_by_key(&self, key: &CourseId) -> Result<Option<CourseRecord>>;

    async fn course_by_code(&self, code: &str) -> Result<Option<CourseRecord>>;

    async fn ratings_for_professor(&self, name: &str) -> Result<Vec<RatingRecord>>;

    async fn ratings_for_course(&self, code: &str) -> Result<Vec<RatingRecord>>;

    /// Raw comma-delimited course list for one professor.
    async fn course_mapping_for_professor(&self, name: &str) -> Result<Option<String>>;

    async fn course_mappings(&self) -> Result<Vec<ProfessorCourseMapping>>;

    async fn departments(&self) -> Result<Vec<Department>>;

    async fn professors_in_department(&self, department_name: &str)
        -> Result<Vec<ProfessorRecord>>;

    async fn courses_in_department(&self, code_fragment: &str) -> Result<Vec<CourseRecord>>;

    async fn search_professors(&self, query: &str) -> Result<Vec<ProfessorRecord>>;

    async fn search_courses(&self, query: &str) -> Result<Vec<CourseRecord>>;
}

/// Per-user bookmarks of professors and courses.
#[async_trait]
pub trait SavedItemStore: Send + Sync {
    async fn is_saved(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> Result<bool>;

    /// Returns false when the item was already saved.
    async fn save(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> Result<bool>;

    /// Returns false when nothing was saved.
    async fn unsave(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> Result<bool>;

    async fn list_saved(&self, user_id: Uuid, kind: SavedKind) -> Result<Vec<SavedItem>>;
}
