use std::sync::Arc;

use tracing::{debug, info};

use crate::attach::{attach_course_ratings, attach_professor_ratings};
use crate::error::recover;
use crate::models::{CourseId, CourseProfile, MappingDrift, ProfessorProfile};
use crate::resolver::{expand_course_codes, find_professor_names_for_course};
use crate::store::EntityStore;

/// Assembles professor and course profiles from independent store queries.
///
/// Store failures never abort a profile: each failed query contributes no
/// data and the rest of the profile is still built. A missing base record
/// yields an empty profile.
#[derive(Clone)]
pub struct ProfileAggregator {
    store: Arc<dyn EntityStore>,
}

impl ProfileAggregator {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn full_professor_profile(&self, professor_id: &str) -> ProfessorProfile {
        let store = self.store.as_ref();
        let professor = recover(
            "professor_by_key",
            professor_id,
            store.professor_by_key(professor_id).await,
        );
        let Some(professor) = professor else {
            info!(professor_id, "professor not found");
            return ProfessorProfile::default();
        };

        let name = professor.full_name.as_str();
        let (mapping, ratings) = tokio::join!(
            store.course_mapping_for_professor(name),
            store.ratings_for_professor(name)
        );
        let mapping = recover("course_mapping_for_professor", name, mapping);
        let ratings = recover("ratings_for_professor", name, ratings);

        let codes = expand_course_codes(mapping.as_deref());
        debug!(
            professor = name,
            mapped = codes.len(),
            rated = ratings.len(),
            "resolving professor courses"
        );

        let courses = attach_course_ratings(store, &codes, &ratings).await;

        ProfessorProfile {
            professor: Some(professor),
            courses,
        }
    }

    pub async fn full_course_profile(&self, course_id: &CourseId) -> CourseProfile {
        let store = self.store.as_ref();
        let key = course_id.to_string();
        let course = recover("course_by_key", &key, store.course_by_key(course_id).await);
        let Some(course) = course else {
            info!(course_id = %key, "course not found");
            return CourseProfile::default();
        };

        let code = course.course_code.as_str();
        let ratings = recover("ratings_for_course", code, store.ratings_for_course(code).await);
        debug!(course = code, rated = ratings.len(), "resolving course professors");

        let professors = attach_professor_ratings(store, &ratings).await;

        CourseProfile {
            course: Some(course),
            professors,
        }
    }

    /// Compares who the mapping table says teaches `course_code` with who
    /// has ratings for it.
    pub async fn mapping_drift(&self, course_code: &str) -> MappingDrift {
        let store = self.store.as_ref();
        let (mappings, ratings) = tokio::join!(
            store.course_mappings(),
            store.ratings_for_course(course_code)
        );
        let mappings = recover("course_mappings", course_code, mappings);
        let ratings = recover("ratings_for_course", course_code, ratings);

        let mapped = dedup(find_professor_names_for_course(&mappings, course_code));
        let rated = dedup(ratings.into_iter().map(|r| r.prof_name).collect());

        MappingDrift {
            course_code: course_code.to_string(),
            mapped_only: mapped
                .iter()
                .filter(|name| !rated.contains(name))
                .cloned()
                .collect(),
            rated_only: rated
                .iter()
                .filter(|name| !mapped.contains(name))
                .cloned()
                .collect(),
        }
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{course, professor, rating, MemoryStore};

    fn aggregator(store: MemoryStore) -> ProfileAggregator {
        ProfileAggregator::new(Arc::new(store))
    }

    fn cutler_store() -> MemoryStore {
        MemoryStore::default()
            .with_professor(professor("p-1", "Barbara Cutler", "Computer Science"))
            .with_mapping("Barbara Cutler", "CSCI-1200")
            .with_rating(rating("Barbara Cutler", "CSCI-1200", 4.5, 3.0, 20))
    }

    #[tokio::test]
    async fn professor_profile_merges_course_and_rating() {
        let store = cutler_store().with_course(course(12, "CSCI-1200", "Data Structures"));

        let profile = aggregator(store).full_professor_profile("p-1").await;

        assert_eq!(
            profile.professor.as_ref().map(|p| p.full_name.as_str()),
            Some("Barbara Cutler")
        );
        assert_eq!(profile.courses.len(), 1);
        let entry = &profile.courses[0];
        assert_eq!(entry.course.course_name, "Data Structures");
        assert_eq!(entry.rating, Some(4.5));
        assert_eq!(entry.difficulty, Some(3.0));
        assert_eq!(entry.num_ratings, Some(20));
    }

    #[tokio::test]
    async fn professor_profile_without_course_row_uses_code() {
        let profile = aggregator(cutler_store()).full_professor_profile("p-1").await;

        assert_eq!(profile.courses.len(), 1);
        let entry = &profile.courses[0];
        assert_eq!(entry.course.course_code, "CSCI-1200");
        assert_eq!(entry.course.course_name, "CSCI-1200");
        assert_eq!(entry.course.course_desc, None);
        assert_eq!(entry.rating, Some(4.5));
        assert_eq!(entry.difficulty, Some(3.0));
        assert_eq!(entry.num_ratings, Some(20));
    }

    #[tokio::test]
    async fn professor_profile_surfaces_rating_only_courses() {
        let store = MemoryStore::default()
            .with_professor(professor("p-2", "Sibel Adali", "Computer Science"))
            .with_mapping("Sibel Adali", " , ")
            .with_rating(rating("Sibel Adali", "CSCI-4380", 3.9, 3.7, 8));

        let profile = aggregator(store).full_professor_profile("p-2").await;

        assert_eq!(profile.courses.len(), 1);
        assert_eq!(profile.courses[0].course.course_code, "CSCI-4380");

        let unmapped = MemoryStore::default()
            .with_professor(professor("p-2", "Sibel Adali", "Computer Science"))
            .with_rating(rating("Sibel Adali", "CSCI-4380", 3.9, 3.7, 8));
        let profile = aggregator(unmapped).full_professor_profile("p-2").await;
        assert_eq!(profile.courses.len(), 1);
    }

    #[tokio::test]
    async fn unknown_professor_yields_empty_profile() {
        let profile = aggregator(cutler_store()).full_professor_profile("p-404").await;
        assert!(profile.professor.is_none());
        assert!(profile.courses.is_empty());
    }

    #[tokio::test]
    async fn failing_store_yields_empty_profiles() {
        let agg = aggregator(cutler_store().failing());

        let professor = agg.full_professor_profile("p-1").await;
        assert_eq!(professor, ProfessorProfile::default());

        let course = agg.full_course_profile(&CourseId::Int(1)).await;
        assert_eq!(course, CourseProfile::default());
    }

    #[tokio::test]
    async fn professor_ratings_failure_keeps_mapped_courses() {
        let store = cutler_store()
            .with_course(course(12, "CSCI-1200", "Data Structures"))
            .failing_on("ratings_for_professor");

        let profile = aggregator(store).full_professor_profile("p-1").await;

        assert_eq!(profile.professor.as_ref().map(|p| p.id.as_str()), Some("p-1"));
        assert_eq!(profile.courses.len(), 1);
        assert_eq!(profile.courses[0].course.course_name, "Data Structures");
        assert_eq!(profile.courses[0].rating, None);
        assert_eq!(profile.courses[0].num_ratings, None);
    }

    #[tokio::test]
    async fn mapping_failure_keeps_rated_courses() {
        let store = cutler_store()
            .with_course(course(12, "CSCI-1200", "Data Structures"))
            .failing_on("course_mapping_for_professor");

        let profile = aggregator(store).full_professor_profile("p-1").await;

        assert!(profile.professor.is_some());
        assert_eq!(profile.courses.len(), 1);
        assert_eq!(profile.courses[0].course.course_name, "Data Structures");
        assert_eq!(profile.courses[0].rating, Some(4.5));
    }

    #[tokio::test]
    async fn course_ratings_failure_keeps_course() {
        let store = cutler_store()
            .with_course(course(12, "CSCI-1200", "Data Structures"))
            .failing_on("ratings_for_course");

        let profile = aggregator(store).full_course_profile(&CourseId::Int(12)).await;

        assert_eq!(
            profile.course.as_ref().map(|c| c.course_name.as_str()),
            Some("Data Structures")
        );
        assert!(profile.professors.is_empty());
    }

    #[tokio::test]
    async fn professor_lookup_failure_falls_back_to_rating_names() {
        let store = cutler_store()
            .with_course(course(12, "CSCI-1200", "Data Structures"))
            .failing_on("professor_by_name");

        let profile = aggregator(store).full_course_profile(&CourseId::Int(12)).await;

        assert_eq!(profile.professors.len(), 1);
        assert_eq!(profile.professors[0].professor.id, "Barbara Cutler");
        assert_eq!(profile.professors[0].course_rating, Some(4.5));
    }

    #[tokio::test]
    async fn course_without_ratings_has_no_professors() {
        let store = MemoryStore::default().with_course(course(5, "MATH-1010", "Calculus I"));

        let profile = aggregator(store).full_course_profile(&CourseId::Int(5)).await;

        assert_eq!(
            profile.course.as_ref().map(|c| c.course_code.as_str()),
            Some("MATH-1010")
        );
        assert!(profile.professors.is_empty());
    }

    #[tokio::test]
    async fn course_profile_lists_rated_professors() {
        let store = cutler_store()
            .with_course(course(12, "CSCI-1200", "Data Structures"))
            .with_rating(rating("Wesley Turner", "CSCI-1200", 3.2, 3.5, 14));

        let profile = aggregator(store)
            .full_course_profile(&CourseId::parse("12"))
            .await;

        let names: Vec<&str> = profile
            .professors
            .iter()
            .map(|p| p.professor.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["Barbara Cutler", "Wesley Turner"]);
        assert_eq!(profile.professors[0].professor.id, "p-1");
        assert_eq!(profile.professors[1].professor.id, "Wesley Turner");
        assert_eq!(profile.professors[1].course_num_ratings, Some(14));
    }

    #[tokio::test]
    async fn unknown_course_yields_empty_profile() {
        let profile = aggregator(cutler_store())
            .full_course_profile(&CourseId::Text("nope".to_string()))
            .await;
        assert!(profile.course.is_none());
        assert!(profile.professors.is_empty());
    }

    #[tokio::test]
    async fn repeated_calls_are_identical() {
        let store = cutler_store()
            .with_course(course(12, "CSCI-1200", "Data Structures"))
            .with_rating(rating("Barbara Cutler", "CSCI-4530", 4.8, 3.9, 11))
            .with_rating(rating("Wesley Turner", "CSCI-1200", 3.2, 3.5, 14));
        let agg = aggregator(store);

        let first = agg.full_professor_profile("p-1").await;
        let second = agg.full_professor_profile("p-1").await;
        assert_eq!(first, second);

        let first = agg.full_course_profile(&CourseId::Int(12)).await;
        let second = agg.full_course_profile(&CourseId::Int(12)).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn drift_reports_both_sides() {
        let store = MemoryStore::default()
            .with_mapping("Barbara Cutler", "CSCI-1200, CSCI-4530")
            .with_mapping("Shianne Hulbert", "CSCI-1200")
            .with_rating(rating("Barbara Cutler", "CSCI-1200", 4.5, 3.0, 20))
            .with_rating(rating("Wesley Turner", "CSCI-1200", 3.2, 3.5, 14))
            .with_rating(rating("Wesley Turner", "CSCI-1200", 3.2, 3.5, 14));

        let drift = aggregator(store).mapping_drift("CSCI-1200").await;

        assert_eq!(drift.mapped_only, vec!["Shianne Hulbert"]);
        assert_eq!(drift.rated_only, vec!["Wesley Turner"]);
        assert!(!drift.is_consistent());
    }
}
