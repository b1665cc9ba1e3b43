use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::models::{
    CourseId, CourseRecord, Department, ProfessorCourseMapping, ProfessorRecord, RatingRecord,
    SavedItem, SavedKind,
};
use crate::resolver::{expand_course_codes, normalize_course_code};
use crate::store::{EntityStore, SavedItemStore};

const PROFESSOR_COLUMNS: &str = "id, full_name, first_name, last_name, department_name, \
     department_code, faculty_url, rmp_url, image_url, rating, difficulty";

const COURSE_COLUMNS: &str = "id, course_code, course_name, course_desc";

const RATING_COLUMNS: &str = "prof_name, class_code, rating, diff, num_ratings";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn decode(err: sqlx::Error) -> StoreError {
    StoreError::Decode(err.to_string())
}

fn professor_from_row(row: &PgRow) -> Result<ProfessorRecord> {
    Ok(ProfessorRecord {
        id: row.try_get("id").map_err(decode)?,
        full_name: row.try_get("full_name").map_err(decode)?,
        first_name: row.try_get("first_name").map_err(decode)?,
        last_name: row.try_get("last_name").map_err(decode)?,
        department_name: row.try_get("department_name").map_err(decode)?,
        department_code: row.try_get("department_code").map_err(decode)?,
        faculty_url: row.try_get("faculty_url").map_err(decode)?,
        rmp_url: row.try_get("rmp_url").map_err(decode)?,
        image_url: row.try_get("image_url").map_err(decode)?,
        rating: row.try_get("rating").map_err(decode)?,
        difficulty: row.try_get("difficulty").map_err(decode)?,
    })
}

fn course_from_row(row: &PgRow) -> Result<CourseRecord> {
    Ok(CourseRecord {
        id: CourseId::Int(row.try_get("id").map_err(decode)?),
        course_code: row.try_get("course_code").map_err(decode)?,
        course_name: row.try_get("course_name").map_err(decode)?,
        course_desc: row.try_get("course_desc").map_err(decode)?,
    })
}

fn rating_from_row(row: &PgRow) -> Result<RatingRecord> {
    Ok(RatingRecord {
        prof_name: row.try_get("prof_name").map_err(decode)?,
        class_code: row.try_get("class_code").map_err(decode)?,
        rating: row.try_get("rating").map_err(decode)?,
        diff: row.try_get("diff").map_err(decode)?,
        num_ratings: row.try_get("num_ratings").map_err(decode)?,
    })
}

fn department_from_row(row: &PgRow) -> Result<Department> {
    Ok(Department {
        id: row.try_get("id").map_err(decode)?,
        category: row.try_get("category").map_err(decode)?,
        code: row.try_get("code").map_err(decode)?,
        name: row.try_get("name").map_err(decode)?,
        full_name: row.try_get("full_name").map_err(decode)?,
    })
}

/// Wraps `fragment` for a substring `ILIKE ... ESCAPE '\'` match, escaping
/// wildcards so user input matches literally.
fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for ch in fragment.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Postgres-backed store over the directory tables.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_professors(&self, sql: &str, bind: &str) -> Result<Vec<ProfessorRecord>> {
        let rows = sqlx::query(sql).bind(bind).fetch_all(&self.pool).await?;
        rows.iter().map(professor_from_row).collect()
    }

    async fn fetch_courses(&self, sql: &str, bind: &str) -> Result<Vec<CourseRecord>> {
        let rows = sqlx::query(sql).bind(bind).fetch_all(&self.pool).await?;
        rows.iter().map(course_from_row).collect()
    }

    async fn fetch_ratings(&self, sql: &str, bind: &str) -> Result<Vec<RatingRecord>> {
        let rows = sqlx::query(sql).bind(bind).fetch_all(&self.pool).await?;
        rows.iter().map(rating_from_row).collect()
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn professor_by_key(&self, key: &str) -> Result<Option<ProfessorRecord>> {
        let sql = format!("SELECT {PROFESSOR_COLUMNS} FROM professors WHERE id = $1");
        let row = sqlx::query(&sql).bind(key).fetch_optional(&self.pool).await?;
        row.as_ref().map(professor_from_row).transpose()
    }

    async fn professor_by_name(&self, full_name: &str) -> Result<Option<ProfessorRecord>> {
        let sql = format!(
            "SELECT {PROFESSOR_COLUMNS} FROM professors WHERE full_name = $1 ORDER BY id LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(full_name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(professor_from_row).transpose()
    }

    async fn course_by_key(&self, key: &CourseId) -> Result<Option<CourseRecord>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id::text = $1");
        let row = sqlx::query(&sql)
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(course_from_row).transpose()
    }

    async fn course_by_code(&self, code: &str) -> Result<Option<CourseRecord>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE course_code = $1");
        let row = sqlx::query(&sql).bind(code).fetch_optional(&self.pool).await?;
        row.as_ref().map(course_from_row).transpose()
    }

    async fn ratings_for_professor(&self, name: &str) -> Result<Vec<RatingRecord>> {
        let sql = format!("SELECT {RATING_COLUMNS} FROM ratings WHERE prof_name = $1 ORDER BY id");
        self.fetch_ratings(&sql, name).await
    }

    async fn ratings_for_course(&self, code: &str) -> Result<Vec<RatingRecord>> {
        let sql = format!("SELECT {RATING_COLUMNS} FROM ratings WHERE class_code = $1 ORDER BY id");
        self.fetch_ratings(&sql, code).await
    }

    async fn course_mapping_for_professor(&self, name: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"SELECT "Courses" FROM professor_courses WHERE "Professor" = $1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.try_get::<Option<String>, _>("Courses").map_err(decode))
            .transpose()
            .map(Option::flatten)
    }

    async fn course_mappings(&self) -> Result<Vec<ProfessorCourseMapping>> {
        let rows = sqlx::query(
            r#"SELECT "Professor", "Courses" FROM professor_courses ORDER BY "Professor""#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ProfessorCourseMapping> {
                Ok(ProfessorCourseMapping {
                    professor: row.try_get("Professor").map_err(decode)?,
                    courses: row
                        .try_get::<Option<String>, _>("Courses")
                        .map_err(decode)?
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn departments(&self) -> Result<Vec<Department>> {
        let rows = sqlx::query("SELECT id, category, code, name, full_name FROM dept_list ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(department_from_row).collect()
    }

    async fn professors_in_department(
        &self,
        department_name: &str,
    ) -> Result<Vec<ProfessorRecord>> {
        let sql = format!(
            "SELECT {PROFESSOR_COLUMNS} FROM professors \
             WHERE department_name ILIKE $1 ESCAPE '\\' ORDER BY full_name"
        );
        self.fetch_professors(&sql, &like_pattern(department_name))
            .await
    }

    async fn courses_in_department(&self, code_fragment: &str) -> Result<Vec<CourseRecord>> {
        let sql = format!(
            "SELECT {COURSE_COLUMNS} FROM courses \
             WHERE course_code ILIKE $1 ESCAPE '\\' ORDER BY course_code"
        );
        self.fetch_courses(&sql, &like_pattern(code_fragment)).await
    }

    async fn search_professors(&self, query: &str) -> Result<Vec<ProfessorRecord>> {
        let sql = format!(
            "SELECT {PROFESSOR_COLUMNS} FROM professors \
             WHERE full_name ILIKE $1 ESCAPE '\\' OR first_name ILIKE $1 ESCAPE '\\' \
             OR last_name ILIKE $1 ESCAPE '\\' OR department_name ILIKE $1 ESCAPE '\\' \
             ORDER BY full_name"
        );
        self.fetch_professors(&sql, &like_pattern(query)).await
    }

    async fn search_courses(&self, query: &str) -> Result<Vec<CourseRecord>> {
        let sql = format!(
            "SELECT {COURSE_COLUMNS} FROM courses \
             WHERE course_code ILIKE $1 ESCAPE '\\' OR course_name ILIKE $1 ESCAPE '\\' \
             ORDER BY course_code"
        );
        self.fetch_courses(&sql, &like_pattern(query)).await
    }
}

#[async_trait]
impl SavedItemStore for PgStore {
    async fn is_saved(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> Result<bool> {
        let sql = format!(
            "SELECT id FROM {} WHERE user_id = $1 AND {} = $2",
            kind.table(),
            kind.item_column()
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn save(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> Result<bool> {
        let sql = format!(
            "INSERT INTO {} (id, user_id, {}) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            kind.table(),
            kind.item_column()
        );
        let result = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unsave(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
            kind.table(),
            kind.item_column()
        );
        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_saved(&self, user_id: Uuid, kind: SavedKind) -> Result<Vec<SavedItem>> {
        let sql = format!(
            "SELECT user_id, {} AS item_id, saved_at FROM {} WHERE user_id = $1 ORDER BY saved_at DESC",
            kind.item_column(),
            kind.table()
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<SavedItem> {
                Ok(SavedItem {
                    user_id: row.try_get("user_id").map_err(decode)?,
                    kind,
                    item_id: row.try_get("item_id").map_err(decode)?,
                    saved_at: row.try_get("saved_at").map_err(decode)?,
                })
            })
            .collect()
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let departments = vec![
        ("dept-csci", "Science", "CSCI", "Computer Science"),
        ("dept-math", "Science", "MATH", "Mathematical Sciences"),
        ("dept-engr", "Engineering", "ENGR", "Core Engineering"),
        ("dept-comm", "Humanities, Arts and Social Sciences", "COMM", "Communication and Media"),
        ("dept-mgmt", "Management", "MGMT", "Management"),
    ];

    for (id, category, code, name) in departments {
        sqlx::query(
            r#"
            INSERT INTO dept_list (id, category, code, name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET category = EXCLUDED.category, code = EXCLUDED.code, name = EXCLUDED.name
            "#,
        )
        .bind(id)
        .bind(category)
        .bind(code)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let professors = vec![
        ("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2", "Barbara Cutler", "Barbara", "Cutler", "Computer Science", "CSCI", 4.3, 3.4),
        ("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc", "Wesley Turner", "Wesley", "Turner", "Computer Science", "CSCI", 3.6, 3.1),
        ("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2", "Mark Holmes", "Mark", "Holmes", "Mathematical Sciences", "MATH", 4.0, 3.8),
    ];

    for (id, full_name, first, last, dept_name, dept_code, rating, difficulty) in professors {
        sqlx::query(
            r#"
            INSERT INTO professors
            (id, full_name, first_name, last_name, department_name, department_code, rating, difficulty)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name, department_name = EXCLUDED.department_name,
                rating = EXCLUDED.rating, difficulty = EXCLUDED.difficulty
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(first)
        .bind(last)
        .bind(dept_name)
        .bind(dept_code)
        .bind(rating)
        .bind(difficulty)
        .execute(pool)
        .await?;
    }

    let courses = vec![
        ("CSCI-1200", "Data Structures", "Programming with fundamental data structures in C++."),
        ("CSCI-2300", "Introduction to Algorithms", "Design and analysis of algorithms."),
        ("CSCI-4530", "Advanced Computer Graphics", "Modeling, rendering and animation."),
        ("MATH-1010", "Calculus I", "Functions, limits, derivatives and integrals."),
    ];

    for (code, name, desc) in courses {
        sqlx::query(
            r#"
            INSERT INTO courses (course_code, course_name, course_desc)
            VALUES ($1, $2, $3)
            ON CONFLICT (course_code) DO UPDATE
            SET course_name = EXCLUDED.course_name, course_desc = EXCLUDED.course_desc
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(desc)
        .execute(pool)
        .await?;
    }

    let ratings = vec![
        ("Barbara Cutler", "CSCI-1200", 52, 4.1, 3.4),
        ("Barbara Cutler", "CSCI-4530", 11, 4.8, 3.9),
        ("Barbara Cutler", "CSCI-4972", 3, 4.0, 2.5),
        ("Wesley Turner", "CSCI-1200", 14, 3.2, 3.5),
        ("Mark Holmes", "MATH-1010", 40, 4.0, 3.8),
    ];

    for (prof_name, class_code, num_ratings, rating, diff) in ratings {
        upsert_rating(pool, prof_name, class_code, num_ratings, rating, diff).await?;
    }

    let mappings = vec![
        ("Barbara Cutler", "CSCI-1200, CSCI-4530"),
        ("Wesley Turner", "CSCI-1200,CSCI-2300"),
        ("Mark Holmes", "MATH-1010"),
    ];

    for (professor, courses) in mappings {
        upsert_mapping(pool, professor, courses).await?;
    }

    Ok(())
}

async fn upsert_rating(
    pool: &PgPool,
    prof_name: &str,
    class_code: &str,
    num_ratings: i32,
    rating: f64,
    diff: f64,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO ratings (prof_name, class_code, num_ratings, rating, diff)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (prof_name, class_code) DO UPDATE
        SET num_ratings = EXCLUDED.num_ratings, rating = EXCLUDED.rating, diff = EXCLUDED.diff
        "#,
    )
    .bind(prof_name)
    .bind(class_code)
    .bind(num_ratings)
    .bind(rating)
    .bind(diff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

async fn upsert_mapping(pool: &PgPool, professor: &str, courses: &str) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO professor_courses ("Professor", "Courses")
        VALUES ($1, $2)
        ON CONFLICT ("Professor") DO UPDATE SET "Courses" = EXCLUDED."Courses"
        "#,
    )
    .bind(professor)
    .bind(courses)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[derive(Debug, serde::Deserialize)]
struct RatingCsvRow {
    prof_name: String,
    class_code: String,
    num_ratings: i32,
    rating: f64,
    diff: f64,
}

#[derive(Debug, serde::Deserialize)]
struct MappingCsvRow {
    #[serde(rename = "Professor")]
    professor: String,
    #[serde(rename = "Courses", default)]
    courses: String,
}

/// Rejoins a mapping field with every code in canonical form.
fn normalize_mapping_field(raw: &str) -> String {
    expand_course_codes(Some(raw))
        .iter()
        .map(|code| normalize_course_code(code))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Canonicalizes names and codes, then folds rows that land on the same
/// (professor, course code) pair into one: review counts are summed and
/// rating and difficulty become review-weighted means. First-seen order is
/// kept and rows without a professor name are dropped.
fn merge_rating_rows(rows: Vec<RatingCsvRow>) -> Vec<RatingCsvRow> {
    let mut merged: Vec<RatingCsvRow> = Vec::with_capacity(rows.len());
    let mut positions: HashMap<(String, String), usize> = HashMap::new();

    for row in rows {
        let prof_name = row.prof_name.trim().to_string();
        if prof_name.is_empty() {
            continue;
        }
        let class_code = normalize_course_code(&row.class_code);
        let key = (prof_name.clone(), class_code.clone());

        match positions.get(&key).copied() {
            Some(index) => {
                let existing = &mut merged[index];
                let (left, right) = (existing.num_ratings, row.num_ratings);
                let total = left + right;
                let weights = if total > 0 {
                    (left as f64, right as f64)
                } else {
                    (1.0, 1.0)
                };
                let combine =
                    |a: f64, b: f64| (a * weights.0 + b * weights.1) / (weights.0 + weights.1);

                debug!(prof_name = %prof_name, class_code = %class_code, "merging colliding rating rows");
                existing.rating = combine(existing.rating, row.rating);
                existing.diff = combine(existing.diff, row.diff);
                existing.num_ratings = total;
            }
            None => {
                positions.insert(key, merged.len());
                merged.push(RatingCsvRow {
                    prof_name,
                    class_code,
                    ..row
                });
            }
        }
    }

    merged
}

pub async fn import_ratings_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<RatingCsvRow>().enumerate() {
        rows.push(result.with_context(|| format!("bad ratings row {}", line + 2))?);
    }

    let mut written = 0usize;
    for row in merge_rating_rows(rows) {
        let affected = upsert_rating(
            pool,
            &row.prof_name,
            &row.class_code,
            row.num_ratings,
            row.rating,
            row.diff,
        )
        .await?;

        if affected > 0 {
            written += 1;
        }
    }

    info!(rows = written, path = %csv_path.display(), "imported ratings");
    Ok(written)
}

pub async fn import_mapping_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut written = 0usize;

    for (line, result) in reader.deserialize::<MappingCsvRow>().enumerate() {
        let row = result.with_context(|| format!("bad mapping row {}", line + 2))?;
        let professor = row.professor.trim();
        if professor.is_empty() {
            continue;
        }

        let affected =
            upsert_mapping(pool, professor, &normalize_mapping_field(&row.courses)).await?;

        if affected > 0 {
            written += 1;
        }
    }

    info!(rows = written, path = %csv_path.display(), "imported professor course mappings");
    Ok(written)
}
