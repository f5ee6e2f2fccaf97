/// Occupation code used when a title is not in the table.
pub const UNKNOWN_WORK_ID: i32 = 20;

const WORK_IDS: &[(&str, i32)] = &[
    ("accountant", 0),
    ("doctor", 1),
    ("engineer", 2),
    ("lawyer", 3),
    ("manager", 4),
    ("nurse", 5),
    ("salesrepresentative", 6),
    ("salesperson", 7),
    ("scientist", 8),
    ("softwareengineer", 9),
    ("teacher", 10),
];

/// Lowercases and strips everything that is not a letter or digit.
pub fn normalize_work_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn work_id_for_title(title: &str) -> i32 {
    let normalized = normalize_work_title(title);
    WORK_IDS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, id)| *id)
        .unwrap_or(UNKNOWN_WORK_ID)
}
