use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{CourseProfile, CourseWithRating, MappingDrift, ProfessorProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingBand {
    High,
    Medium,
    Low,
    Unrated,
}

impl RatingBand {
    pub fn of(value: Option<f64>) -> Self {
        match value {
            Some(v) if v >= 4.0 => RatingBand::High,
            Some(v) if v >= 3.0 => RatingBand::Medium,
            Some(v) if v > 0.0 => RatingBand::Low,
            _ => RatingBand::Unrated,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RatingBand::High => "high",
            RatingBand::Medium => "medium",
            RatingBand::Low => "low",
            RatingBand::Unrated => "unrated",
        }
    }
}

pub fn format_rating(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v:.1}"),
        _ => "N/A".to_string(),
    }
}

pub fn format_rating_with_max(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v:.1}/5"),
        _ => "N/A".to_string(),
    }
}

/// Mean course rating weighted by review count. Entries without a rating or
/// without reviews do not contribute.
pub fn weighted_rating(courses: &[CourseWithRating]) -> Option<f64> {
    let (total, weight) = courses
        .iter()
        .filter_map(|c| match (c.rating, c.num_ratings) {
            (Some(rating), Some(count)) if count > 0 && !rating.is_nan() => {
                Some((rating, count as f64))
            }
            _ => None,
        })
        .fold((0.0, 0.0), |(total, weight), (rating, count)| {
            (total + rating * count, weight + count)
        });

    if weight == 0.0 {
        None
    } else {
        Some(total / weight)
    }
}

pub fn build_professor_report(profile: &ProfessorProfile, generated_on: NaiveDate) -> String {
    let mut output = String::new();

    let Some(professor) = profile.professor.as_ref() else {
        let _ = writeln!(output, "# Professor Profile");
        let _ = writeln!(output, "Professor not found.");
        return output;
    };

    let _ = writeln!(output, "# {}", professor.full_name);
    let _ = writeln!(
        output,
        "{} (generated {})",
        professor.department_name.as_deref().unwrap_or("Unknown department"),
        generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "- Overall rating: {} ({})",
        format_rating_with_max(professor.rating),
        RatingBand::of(professor.rating).label()
    );
    let _ = writeln!(
        output,
        "- Overall difficulty: {}",
        format_rating_with_max(professor.difficulty)
    );
    let _ = writeln!(
        output,
        "- Review-weighted course rating: {}",
        format_rating_with_max(weighted_rating(&profile.courses))
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Courses");

    if profile.courses.is_empty() {
        let _ = writeln!(output, "No courses on record.");
    } else {
        for entry in profile.courses.iter() {
            let _ = writeln!(
                output,
                "- {} {}: rating {}, difficulty {}, {} reviews",
                entry.course.course_code,
                entry.course.course_name,
                format_rating(entry.rating),
                format_rating(entry.difficulty),
                entry.num_ratings.unwrap_or(0)
            );
        }
    }

    output
}

pub fn build_course_report(
    profile: &CourseProfile,
    drift: Option<&MappingDrift>,
    generated_on: NaiveDate,
) -> String {
    let mut output = String::new();

    let Some(course) = profile.course.as_ref() else {
        let _ = writeln!(output, "# Course Profile");
        let _ = writeln!(output, "Course not found.");
        return output;
    };

    let _ = writeln!(output, "# {} {}", course.course_code, course.course_name);
    let _ = writeln!(output, "Generated {}", generated_on);
    if let Some(desc) = course.course_desc.as_deref() {
        let _ = writeln!(output);
        let _ = writeln!(output, "{desc}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Professors");

    if profile.professors.is_empty() {
        let _ = writeln!(output, "No rated professors for this course.");
    } else {
        for entry in profile.professors.iter() {
            let _ = writeln!(
                output,
                "- {}: rating {}, difficulty {}, {} reviews",
                entry.professor.full_name,
                format_rating(entry.course_rating),
                format_rating(entry.course_difficulty),
                entry.course_num_ratings.unwrap_or(0)
            );
        }
    }

    if let Some(drift) = drift {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Mapping Consistency");
        if drift.is_consistent() {
            let _ = writeln!(output, "Mapping and ratings agree.");
        } else {
            for name in drift.mapped_only.iter() {
                let _ = writeln!(output, "- {name}: listed in mapping, no ratings");
            }
            for name in drift.rated_only.iter() {
                let _ = writeln!(output, "- {name}: rated, missing from mapping");
            }
        }
    }

    output
}
