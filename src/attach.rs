//! Rating attachment: joins rating rows onto course and professor records by
//! name, synthesizing placeholder records when one side of the join is absent.
//!
//! Field-name normalization (`diff` to `difficulty`, course-scoped professor
//! fields) happens here and nowhere else.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::debug;

use crate::error::recover;
use crate::models::{
    CourseRecord, CourseWithRating, ProfessorRecord, ProfessorWithRating, RatingRecord,
};
use crate::store::EntityStore;

/// Join predicate for rating rows. Exact string equality on names and codes.
fn same_key(left: &str, right: &str) -> bool {
    left == right
}

fn course_entry(course: CourseRecord, rating: Option<&RatingRecord>) -> CourseWithRating {
    CourseWithRating {
        course,
        rating: rating.map(|r| r.rating),
        difficulty: rating.map(|r| r.diff),
        num_ratings: rating.map(|r| r.num_ratings),
    }
}

fn professor_entry(professor: ProfessorRecord, rating: &RatingRecord) -> ProfessorWithRating {
    ProfessorWithRating {
        professor,
        course_rating: Some(rating.rating),
        course_difficulty: Some(rating.diff),
        course_num_ratings: Some(rating.num_ratings),
    }
}

async fn lookup_course(store: &dyn EntityStore, code: &str) -> Option<CourseRecord> {
    recover("course_by_code", code, store.course_by_code(code).await)
}

async fn lookup_professor(store: &dyn EntityStore, name: &str) -> Option<ProfessorRecord> {
    recover("professor_by_name", name, store.professor_by_name(name).await)
}

/// Builds the course list of a professor profile.
///
/// `codes` is the expanded mapping field and drives the order of the result.
/// Mapping codes with neither a course row nor a rating are skipped. Ratings
/// whose course code the mapping does not mention are appended afterwards in
/// store order. The first entry for a course code wins.
pub async fn attach_course_ratings(
    store: &dyn EntityStore,
    codes: &[String],
    ratings: &[RatingRecord],
) -> Vec<CourseWithRating> {
    let courses = join_all(codes.iter().map(|code| lookup_course(store, code))).await;

    let mut entries = Vec::with_capacity(codes.len());
    let mut covered: HashSet<&str> = HashSet::new();

    for (code, course) in codes.iter().zip(courses) {
        if covered.contains(code.as_str()) {
            continue;
        }

        let rating = ratings.iter().find(|r| same_key(&r.class_code, code));
        let entry = match (course, rating) {
            (Some(course), rating) => course_entry(course, rating),
            (None, Some(rating)) => {
                debug!(course_code = %code, "course row missing, using placeholder");
                course_entry(CourseRecord::placeholder(code), Some(rating))
            }
            (None, None) => {
                debug!(course_code = %code, "mapped course has no row and no rating, skipping");
                continue;
            }
        };

        covered.insert(code.as_str());
        entries.push(entry);
    }

    let mut leftovers: Vec<&RatingRecord> = Vec::new();
    for rating in ratings {
        if covered.insert(rating.class_code.as_str()) {
            leftovers.push(rating);
        }
    }

    let leftover_courses =
        join_all(leftovers.iter().map(|r| lookup_course(store, &r.class_code))).await;

    for (rating, course) in leftovers.into_iter().zip(leftover_courses) {
        let course = course.unwrap_or_else(|| {
            debug!(course_code = %rating.class_code, "rated course row missing, using placeholder");
            CourseRecord::placeholder(&rating.class_code)
        });
        entries.push(course_entry(course, Some(rating)));
    }

    entries
}

/// Builds the professor list of a course profile, one entry per rating row.
/// Duplicate rating rows yield duplicate entries.
pub async fn attach_professor_ratings(
    store: &dyn EntityStore,
    ratings: &[RatingRecord],
) -> Vec<ProfessorWithRating> {
    let professors = join_all(ratings.iter().map(|r| lookup_professor(store, &r.prof_name))).await;

    ratings
        .iter()
        .zip(professors)
        .map(|(rating, professor)| {
            let professor = professor
                .filter(|p| same_key(&p.full_name, &rating.prof_name))
                .unwrap_or_else(|| {
                    debug!(prof_name = %rating.prof_name, "professor row missing, using placeholder");
                    ProfessorRecord::placeholder(&rating.prof_name)
                });
            professor_entry(professor, rating)
        })
        .collect()
}
