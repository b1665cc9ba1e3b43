use crate::models::ProfessorCourseMapping;

/// Splits a professor_courses field into course codes. Tokens are trimmed,
/// empty tokens are dropped, order and duplicates are kept.
pub fn expand_course_codes(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Every professor whose mapping row lists `code` as a whole token.
pub fn find_professor_names_for_course(
    mappings: &[ProfessorCourseMapping],
    code: &str,
) -> Vec<String> {
    mappings
        .iter()
        .filter(|mapping| {
            expand_course_codes(Some(&mapping.courses))
                .iter()
                .any(|token| token == code)
        })
        .map(|mapping| mapping.professor.clone())
        .collect()
}

/// Canonical `SUBJ-NNNN` form for course codes coming from imports, where
/// codes show up as `comm4962` or `COMM 4962`.
pub fn normalize_course_code(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();

    if compact.contains('-') || compact.chars().count() <= 4 {
        return compact;
    }

    let prefix: String = compact.chars().take(4).collect();
    if !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return compact;
    }

    let rest: String = compact.chars().skip(4).collect();
    format!("{prefix}-{rest}")
}
