//! In-process store used by the test suite.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::models::{
    CourseId, CourseRecord, Department, ProfessorCourseMapping, ProfessorRecord, RatingRecord,
    SavedItem, SavedKind,
};
use crate::store::{EntityStore, SavedItemStore};

#[derive(Default)]
pub struct MemoryStore {
    professors: Vec<ProfessorRecord>,
    courses: Vec<CourseRecord>,
    ratings: Vec<RatingRecord>,
    mappings: Vec<ProfessorCourseMapping>,
    departments: Vec<Department>,
    saved: Mutex<Vec<SavedItem>>,
    failing: bool,
    failing_ops: Vec<&'static str>,
}

pub fn professor(id: &str, full_name: &str, department: &str) -> ProfessorRecord {
    let mut parts = full_name.splitn(2, ' ');
    ProfessorRecord {
        id: id.to_string(),
        full_name: full_name.to_string(),
        first_name: parts.next().map(str::to_string),
        last_name: parts.next().map(str::to_string),
        department_name: Some(department.to_string()),
        department_code: None,
        faculty_url: None,
        rmp_url: None,
        image_url: None,
        rating: None,
        difficulty: None,
    }
}

pub fn course(id: i64, code: &str, name: &str) -> CourseRecord {
    CourseRecord {
        id: CourseId::Int(id),
        course_code: code.to_string(),
        course_name: name.to_string(),
        course_desc: Some(format!("{name} course description")),
    }
}

pub fn rating(prof_name: &str, class_code: &str, rating: f64, diff: f64, num: i32) -> RatingRecord {
    RatingRecord {
        prof_name: prof_name.to_string(),
        class_code: class_code.to_string(),
        rating,
        diff,
        num_ratings: num,
    }
}

pub fn department(id: &str, category: &str, code: &str, name: &str) -> Department {
    Department {
        id: id.to_string(),
        category: category.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        full_name: None,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl MemoryStore {
    pub fn with_professor(mut self, professor: ProfessorRecord) -> Self {
        self.professors.push(professor);
        self
    }

    pub fn with_course(mut self, course: CourseRecord) -> Self {
        self.courses.push(course);
        self
    }

    pub fn with_rating(mut self, rating: RatingRecord) -> Self {
        self.ratings.push(rating);
        self
    }

    pub fn with_mapping(mut self, professor: &str, courses: &str) -> Self {
        self.mappings.push(ProfessorCourseMapping {
            professor: professor.to_string(),
            courses: courses.to_string(),
        });
        self
    }

    pub fn with_department(mut self, department: Department) -> Self {
        self.departments.push(department);
        self
    }

    /// Every call fails as if the connection dropped.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Only calls to `operation` fail; everything else answers normally.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing_ops.push(operation);
        self
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.failing || self.failing_ops.iter().any(|op| *op == operation) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn professor_by_key(&self, key: &str) -> Result<Option<ProfessorRecord>> {
        self.check("professor_by_key")?;
        Ok(self.professors.iter().find(|p| p.id == key).cloned())
    }

    async fn professor_by_name(&self, full_name: &str) -> Result<Option<ProfessorRecord>> {
        self.check("professor_by_name")?;
        Ok(self
            .professors
            .iter()
            .find(|p| p.full_name == full_name)
            .cloned())
    }

    async fn course_by_key(&self, key: &CourseId) -> Result<Option<CourseRecord>> {
        self.check("course_by_key")?;
        let wanted = key.to_string();
        Ok(self
            .courses
            .iter()
            .find(|c| c.id.to_string() == wanted)
            .cloned())
    }

    async fn course_by_code(&self, code: &str) -> Result<Option<CourseRecord>> {
        self.check("course_by_code")?;
        Ok(self.courses.iter().find(|c| c.course_code == code).cloned())
    }

    async fn ratings_for_professor(&self, name: &str) -> Result<Vec<RatingRecord>> {
        self.check("ratings_for_professor")?;
        Ok(self
            .ratings
            .iter()
            .filter(|r| r.prof_name == name)
            .cloned()
            .collect())
    }

    async fn ratings_for_course(&self, code: &str) -> Result<Vec<RatingRecord>> {
        self.check("ratings_for_course")?;
        Ok(self
            .ratings
            .iter()
            .filter(|r| r.class_code == code)
            .cloned()
            .collect())
    }

    async fn course_mapping_for_professor(&self, name: &str) -> Result<Option<String>> {
        self.check("course_mapping_for_professor")?;
        Ok(self
            .mappings
            .iter()
            .find(|m| m.professor == name)
            .map(|m| m.courses.clone()))
    }

    async fn course_mappings(&self) -> Result<Vec<ProfessorCourseMapping>> {
        self.check("course_mappings")?;
        Ok(self.mappings.clone())
    }

    async fn departments(&self) -> Result<Vec<Department>> {
        self.check("departments")?;
        Ok(self.departments.clone())
    }

    async fn professors_in_department(
        &self,
        department_name: &str,
    ) -> Result<Vec<ProfessorRecord>> {
        self.check("professors_in_department")?;
        Ok(self
            .professors
            .iter()
            .filter(|p| {
                p.department_name
                    .as_deref()
                    .is_some_and(|d| contains_ignore_case(d, department_name))
            })
            .cloned()
            .collect())
    }

    async fn courses_in_department(&self, code_fragment: &str) -> Result<Vec<CourseRecord>> {
        self.check("courses_in_department")?;
        Ok(self
            .courses
            .iter()
            .filter(|c| contains_ignore_case(&c.course_code, code_fragment))
            .cloned()
            .collect())
    }

    async fn search_professors(&self, query: &str) -> Result<Vec<ProfessorRecord>> {
        self.check("search_professors")?;
        Ok(self
            .professors
            .iter()
            .filter(|p| {
                [
                    Some(p.full_name.as_str()),
                    p.first_name.as_deref(),
                    p.last_name.as_deref(),
                    p.department_name.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| contains_ignore_case(field, query))
            })
            .cloned()
            .collect())
    }

    async fn search_courses(&self, query: &str) -> Result<Vec<CourseRecord>> {
        self.check("search_courses")?;
        Ok(self
            .courses
            .iter()
            .filter(|c| {
                contains_ignore_case(&c.course_code, query)
                    || contains_ignore_case(&c.course_name, query)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SavedItemStore for MemoryStore {
    async fn is_saved(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> Result<bool> {
        self.check("is_saved")?;
        let saved = self.saved.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(saved
            .iter()
            .any(|s| s.user_id == user_id && s.kind == kind && s.item_id == item_id))
    }

    async fn save(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> Result<bool> {
        self.check("save")?;
        let mut saved = self.saved.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if saved
            .iter()
            .any(|s| s.user_id == user_id && s.kind == kind && s.item_id == item_id)
        {
            return Ok(false);
        }
        saved.push(SavedItem {
            user_id,
            kind,
            item_id: item_id.to_string(),
            saved_at: Utc::now(),
        });
        Ok(true)
    }

    async fn unsave(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> Result<bool> {
        self.check("unsave")?;
        let mut saved = self.saved.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let before = saved.len();
        saved.retain(|s| !(s.user_id == user_id && s.kind == kind && s.item_id == item_id));
        Ok(saved.len() < before)
    }

    async fn list_saved(&self, user_id: Uuid, kind: SavedKind) -> Result<Vec<SavedItem>> {
        self.check("list_saved")?;
        let saved = self.saved.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(saved
            .iter()
            .filter(|s| s.user_id == user_id && s.kind == kind)
            .cloned()
            .collect())
    }
}
