//! Free-text grouping fields arrive with inconsistent case and spacing
//! ("Theft", " theft ", "THEFT"). Everything that groups, counts or lists
//! distinct values goes through [`group_key`] and [`display_name`].

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CourtError;
use crate::models::ApplicationRecord;

/// The free-text fields that are grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    PoliceStation,
    Division,
    Category,
    MarkedTo,
}

impl GroupField {
    pub fn name(self) -> &'static str {
        match self {
            GroupField::PoliceStation => "police_station",
            GroupField::Division => "division",
            GroupField::Category => "category",
            GroupField::MarkedTo => "marked_to",
        }
    }

    pub fn value(self, record: &ApplicationRecord) -> &str {
        match self {
            GroupField::PoliceStation => &record.police_station,
            GroupField::Division => &record.division,
            GroupField::Category => &record.category,
            GroupField::MarkedTo => &record.marked_to,
        }
    }
}

impl FromStr for GroupField {
    type Err = CourtError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "police_station" | "station" | "ps" => Ok(GroupField::PoliceStation),
            "division" => Ok(GroupField::Division),
            "category" => Ok(GroupField::Category),
            "marked_to" | "sho" => Ok(GroupField::MarkedTo),
            other => Err(CourtError::InvalidInput(format!("Unknown group field: {other}"))),
        }
    }
}

/// Comparison key: trimmed, inner whitespace collapsed, lowercased.
/// Empty when the value is blank.
pub fn group_key(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonical display form: Title Case of the normalized words.
pub fn display_name(value: &str) -> String {
    value
        .split_whitespace()
        .map(title_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Both sides normalized, so `" Civil  Lines"` equals `"civil lines"`.
pub fn same_group(a: &str, b: &str) -> bool {
    group_key(a) == group_key(b)
}

/// Groups in first-appearance order. Each entry carries the display name
/// taken from the first occurrence and whatever the caller accumulates.
pub(crate) struct Grouper<T> {
    index: HashMap<String, usize>,
    groups: Vec<(String, T)>,
}

impl<T: Default> Grouper<T> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// Returns `None` for blank values, which are never grouped.
    pub(crate) fn entry(&mut self, raw: &str) -> Option<&mut T> {
        let key = group_key(raw);
        if key.is_empty() {
            return None;
        }
        let position = match self.index.get(&key) {
            Some(position) => *position,
            None => {
                self.groups.push((display_name(raw), T::default()));
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        Some(&mut self.groups[position].1)
    }

    pub(crate) fn into_groups(self) -> Vec<(String, T)> {
        self.groups
    }
}

/// Distinct display values for a field, deduplicated by key, sorted.
pub fn distinct_values(records: &[ApplicationRecord], field: GroupField) -> Vec<String> {
    let mut grouper: Grouper<()> = Grouper::new();
    for record in records {
        grouper.entry(field.value(record));
    }
    let mut values: Vec<String> = grouper.into_groups().into_iter().map(|(name, _)| name).collect();
    values.sort_by_key(|value| value.to_lowercase());
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_category(category: &str) -> ApplicationRecord {
        ApplicationRecord {
            category: category.to_string(),
            ..ApplicationRecord::default()
        }
    }

    #[test]
    fn key_ignores_case_and_spacing() {
        assert_eq!(group_key("  Land   Dispute "), "land dispute");
        assert_eq!(group_key("THEFT"), group_key(" theft "));
        assert_eq!(group_key("   "), "");
    }

    #[test]
    fn display_is_title_case() {
        assert_eq!(display_name("theft "), "Theft");
        assert_eq!(display_name("  DOMESTIC   violence"), "Domestic Violence");
    }

    #[test]
    fn distinct_values_dedupes_and_sorts() {
        let records = vec![
            with_category("Theft"),
            with_category("fraud"),
            with_category(" theft "),
            with_category(""),
            with_category("Assault"),
        ];
        assert_eq!(
            distinct_values(&records, GroupField::Category),
            vec!["Assault", "Fraud", "Theft"]
        );
    }

    #[test]
    fn group_field_parses_aliases() {
        assert_eq!("sho".parse::<GroupField>().unwrap(), GroupField::MarkedTo);
        assert_eq!(
            "police-station".parse::<GroupField>().unwrap(),
            GroupField::PoliceStation
        );
        assert!("status".parse::<GroupField>().is_err());
    }
}
