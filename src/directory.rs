use std::sync::Arc;

use serde::Serialize;

use crate::error::recover;
use crate::models::{CourseRecord, Department, ProfessorRecord};
use crate::store::EntityStore;

pub const CATEGORIES: [&str; 5] = [
    "Humanities, Arts and Social Sciences",
    "Engineering",
    "Architecture",
    "Science",
    "Management",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentGroup {
    pub category: &'static str,
    pub departments: Vec<Department>,
}

/// Buckets departments into the school categories in `CATEGORIES` order.
/// Departments with any other category are left out.
pub fn group_departments_by_category(departments: Vec<Department>) -> Vec<DepartmentGroup> {
    let mut groups: Vec<DepartmentGroup> = CATEGORIES
        .iter()
        .map(|&category| DepartmentGroup {
            category,
            departments: Vec::new(),
        })
        .collect();

    for department in departments {
        if let Some(group) = groups.iter_mut().find(|g| g.category == department.category) {
            group.departments.push(department);
        }
    }

    groups
}

/// Browse and search queries over the directory. Blank input short-circuits
/// to an empty result and failures are logged and read as "nothing found".
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn EntityStore>,
}

impl Directory {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn departments(&self) -> Vec<DepartmentGroup> {
        let departments = recover("departments", "*", self.store.departments().await);
        group_departments_by_category(departments)
    }

    pub async fn department_professors(&self, department_name: &str) -> Vec<ProfessorRecord> {
        let name = department_name.trim();
        if name.is_empty() {
            return Vec::new();
        }
        recover(
            "professors_in_department",
            name,
            self.store.professors_in_department(name).await,
        )
    }

    pub async fn department_courses(&self, code: &str) -> Vec<CourseRecord> {
        let code = code.trim();
        if code.is_empty() {
            return Vec::new();
        }
        recover(
            "courses_in_department",
            code,
            self.store.courses_in_department(code).await,
        )
    }

    pub async fn search_professors(&self, query: &str) -> Vec<ProfessorRecord> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        recover(
            "search_professors",
            query,
            self.store.search_professors(query).await,
        )
    }

    pub async fn search_courses(&self, query: &str) -> Vec<CourseRecord> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        recover("search_courses", query, self.store.search_courses(query).await)
    }
}
