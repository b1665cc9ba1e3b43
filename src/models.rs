use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessorRecord {
    pub id: String,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department_name: Option<String>,
    pub department_code: Option<String>,
    pub faculty_url: Option<String>,
    pub rmp_url: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    pub difficulty: Option<f64>,
}

impl ProfessorRecord {
    /// Minimal record for a professor known only by the name on a rating row.
    pub fn placeholder(name: &str) -> Self {
        Self {
            id: name.to_string(),
            full_name: name.to_string(),
            first_name: None,
            last_name: None,
            department_name: None,
            department_code: None,
            faculty_url: None,
            rmp_url: None,
            image_url: None,
            rating: None,
            difficulty: None,
        }
    }
}

/// Course identity as stored: numeric in the courses table, textual when a
/// placeholder borrows its course code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CourseId {
    Int(i64),
    Text(String),
}

impl CourseId {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(value) => CourseId::Int(value),
            Err(_) => CourseId::Text(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseId::Int(value) => write!(f, "{value}"),
            CourseId::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: CourseId,
    pub course_code: String,
    pub course_name: String,
    pub course_desc: Option<String>,
}

impl CourseRecord {
    /// Stand-in for a course code that has no row in the courses table.
    pub fn placeholder(code: &str) -> Self {
        Self {
            id: CourseId::Text(code.to_string()),
            course_code: code.to_string(),
            course_name: code.to_string(),
            course_desc: None,
        }
    }
}

/// One row of the ratings fact table, scoring a (professor, course) pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub prof_name: String,
    pub class_code: String,
    pub rating: f64,
    pub diff: f64,
    pub num_ratings: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessorCourseMapping {
    pub professor: String,
    pub courses: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseWithRating {
    #[serde(flatten)]
    pub course: CourseRecord,
    pub rating: Option<f64>,
    pub difficulty: Option<f64>,
    pub num_ratings: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfessorWithRating {
    #[serde(flatten)]
    pub professor: ProfessorRecord,
    #[serde(rename = "courseRating")]
    pub course_rating: Option<f64>,
    #[serde(rename = "courseDifficulty")]
    pub course_difficulty: Option<f64>,
    #[serde(rename = "courseNumRatings")]
    pub course_num_ratings: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfessorProfile {
    pub professor: Option<ProfessorRecord>,
    pub courses: Vec<CourseWithRating>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseProfile {
    pub course: Option<CourseRecord>,
    pub professors: Vec<ProfessorWithRating>,
}

/// Professor names on which the mapping table and the ratings table disagree
/// for a single course.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingDrift {
    pub course_code: String,
    pub mapped_only: Vec<String>,
    pub rated_only: Vec<String>,
}

impl MappingDrift {
    pub fn is_consistent(&self) -> bool {
        self.mapped_only.is_empty() && self.rated_only.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub category: String,
    pub code: String,
    pub name: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SavedKind {
    Professor,
    Course,
}

impl SavedKind {
    pub fn table(self) -> &'static str {
        match self {
            SavedKind::Professor => "saved_professors",
            SavedKind::Course => "saved_courses",
        }
    }

    pub fn item_column(self) -> &'static str {
        match self {
            SavedKind::Professor => "professor_id",
            SavedKind::Course => "course_id",
        }
    }
}

impl fmt::Display for SavedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SavedKind::Professor => f.write_str("professor"),
            SavedKind::Course => f.write_str("course"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedItem {
    pub user_id: Uuid,
    pub kind: SavedKind,
    pub item_id: String,
    pub saved_at: DateTime<Utc>,
}
