//! The table pipeline shared by every application list: filter, then sort,
//! then cut one page. All functions are pure and keep their input untouched.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CourtError;
use crate::models::{ApplicationRecord, Feedback, FieldValue, Status};
use crate::normalize::same_group;

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Table predicates. Unset or blank values match everything; set values are
/// combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub police_station: Option<String>,
    pub division: Option<String>,
    pub category: Option<String>,
    pub status: Option<Status>,
    pub feedback: Option<Feedback>,
    pub marked_to: Option<String>,
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl FilterSet {
    pub fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self {
            from,
            to,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        active(&self.police_station).is_none()
            && active(&self.division).is_none()
            && active(&self.category).is_none()
            && self.status.is_none()
            && self.feedback.is_none()
            && active(&self.marked_to).is_none()
            && active(&self.search).is_none()
            && self.from.is_none()
            && self.to.is_none()
    }

    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        if let Some(station) = active(&self.police_station) {
            if !same_group(&record.police_station, station) {
                return false;
            }
        }
        if let Some(division) = active(&self.division) {
            if !same_group(&record.division, division) {
                return false;
            }
        }
        if let Some(category) = active(&self.category) {
            if !same_group(&record.category, category) {
                return false;
            }
        }
        if self.status.is_some_and(|status| record.status != status) {
            return false;
        }
        if self.feedback.is_some_and(|feedback| record.feedback != feedback) {
            return false;
        }
        if let Some(officer) = active(&self.marked_to) {
            if !contains_ignore_case(&record.marked_to, officer) {
                return false;
            }
        }
        if let Some(term) = active(&self.search) {
            let hit = [
                &record.name,
                &record.dairy_no,
                &record.contact,
                &record.category,
            ]
            .iter()
            .any(|field| contains_ignore_case(field, term));
            if !hit {
                return false;
            }
        }
        if self.from.is_some() || self.to.is_some() {
            let Some(date) = record.parsed_date() else {
                return false;
            };
            if self.from.is_some_and(|from| date < from) {
                return false;
            }
            if self.to.is_some_and(|to| date > to) {
                return false;
            }
        }
        true
    }
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Matching records in input order.
pub fn apply_filters<'a>(
    records: &'a [ApplicationRecord],
    filters: &FilterSet,
) -> Vec<&'a ApplicationRecord> {
    records.iter().filter(|record| filters.matches(record)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = CourtError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(CourtError::InvalidInput(format!(
                "Sort direction must be asc or desc, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: "created_at".to_string(),
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    /// Clicking the active column flips direction; a new column starts ascending.
    pub fn clicked(&self, key: &str) -> Self {
        if self.key == key {
            Self::new(key, self.direction.toggled())
        } else {
            Self::new(key, SortDirection::Asc)
        }
    }
}

/// Numeric when both sides are numbers, lowercase text otherwise, missing as "".
pub fn compare_fields(a: FieldValue<'_>, b: FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Number(x), FieldValue::Number(y)) => x.total_cmp(&y),
        _ => sort_text(a).cmp(&sort_text(b)),
    }
}

fn sort_text(value: FieldValue<'_>) -> String {
    match value {
        FieldValue::Text(text) => text.to_lowercase(),
        FieldValue::Number(n) if n.fract() == 0.0 => format!("{}", n as i64),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Missing => String::new(),
    }
}

/// Stable in both directions: ties keep their input order.
pub fn sort_records<R>(records: &[R], sort: &SortSpec) -> Vec<R>
where
    R: Borrow<ApplicationRecord> + Clone,
{
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        let left = Borrow::<ApplicationRecord>::borrow(a).field(&sort.key);
        let right = Borrow::<ApplicationRecord>::borrow(b).field(&sort.key);
        match sort.direction {
            SortDirection::Asc => compare_fields(left, right),
            SortDirection::Desc => compare_fields(right, left),
        }
    });
    sorted
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_count: usize,
}

impl<T> Page<'_, T> {
    /// 1-based position of the first visible item, 0 when nothing is visible.
    pub fn first_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page - 1) * self.page_size + 1
        }
    }

    pub fn last_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.first_index() + self.items.len() - 1
        }
    }
}

/// Cuts page `page` (1-based). No records means zero pages. Callers keep
/// `page` within `1..=total_pages`; anything else yields an empty page.
pub fn paginate<T>(records: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let total_count = records.len();
    let total_pages = if page_size == 0 {
        0
    } else {
        total_count.div_ceil(page_size)
    };

    let items = if page == 0 || page_size == 0 {
        &records[..0]
    } else {
        let start = (page - 1).saturating_mul(page_size);
        if start >= total_count {
            &records[..0]
        } else {
            let end = start.saturating_add(page_size).min(total_count);
            &records[start..end]
        }
    };

    Page {
        items,
        page,
        page_size,
        total_pages,
        total_count,
    }
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Everything a table view needs to re-derive its rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    pub filters: FilterSet,
    pub sort: SortSpec,
    pub page: usize,
    pub page_size: usize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            filters: FilterSet::default(),
            sort: SortSpec::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl QueryState {
    /// Any filter change goes back to page 1.
    pub fn with_filters(self, filters: FilterSet) -> Self {
        Self {
            filters,
            page: 1,
            ..self
        }
    }

    pub fn with_search(self, term: impl Into<String>) -> Self {
        let filters = FilterSet {
            search: Some(term.into()),
            ..self.filters.clone()
        };
        self.with_filters(filters)
    }

    pub fn with_sort(self, sort: SortSpec) -> Self {
        Self {
            sort,
            page: 1,
            ..self
        }
    }

    pub fn with_page(self, page: usize) -> Self {
        Self { page, ..self }
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        Self {
            page_size,
            page: 1,
            ..self
        }
    }
}

/// Filtered and sorted rows for one query state.
#[derive(Debug, Clone)]
pub struct TableView<'a> {
    pub rows: Vec<&'a ApplicationRecord>,
    pub page: usize,
    pub page_size: usize,
}

impl<'a> TableView<'a> {
    pub fn total_pages(&self) -> usize {
        self.current_page().total_pages
    }

    pub fn current_page(&self) -> Page<'_, &'a ApplicationRecord> {
        paginate(&self.rows, self.page, self.page_size)
    }
}

/// Runs the full pipeline. The requested page is clamped into range here,
/// since this is the caller side of `paginate`.
pub fn run_query<'a>(records: &'a [ApplicationRecord], state: &QueryState) -> TableView<'a> {
    let filtered = apply_filters(records, &state.filters);
    let rows = sort_records(&filtered, &state.sort);
    let total_pages = if state.page_size == 0 {
        0
    } else {
        rows.len().div_ceil(state.page_size)
    };
    TableView {
        rows,
        page: clamp_page(state.page, total_pages),
        page_size: state.page_size,
    }
}

/// Number of active predicates, as shown on the filter badge.
pub fn active_filter_count(filters: &FilterSet) -> usize {
    [
        active(&filters.police_station).is_some(),
        active(&filters.division).is_some(),
        active(&filters.category).is_some(),
        filters.status.is_some(),
        filters.feedback.is_some(),
        active(&filters.marked_to).is_some(),
        active(&filters.search).is_some(),
        filters.from.is_some(),
        filters.to.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_record(sr_no: i64, name: &str, station: &str, status: Status) -> ApplicationRecord {
        ApplicationRecord {
            id: Some(sr_no),
            sr_no: Some(sr_no),
            name: name.to_string(),
            police_station: station.to_string(),
            status,
            ..ApplicationRecord::default()
        }
    }

    fn dated(sr_no: i64, date: Option<&str>) -> ApplicationRecord {
        ApplicationRecord {
            sr_no: Some(sr_no),
            date: date.map(str::to_string),
            ..ApplicationRecord::default()
        }
    }

    fn sr_numbers<R: Borrow<ApplicationRecord>>(records: &[R]) -> Vec<Option<i64>> {
        records
            .iter()
            .map(|r| Borrow::<ApplicationRecord>::borrow(r).sr_no)
            .collect()
    }

    #[test]
    fn empty_filter_set_keeps_everything_in_order() {
        let records = vec![
            sample_record(3, "Bilal", "Civil Lines", Status::Pending),
            sample_record(1, "Amna", "Model Town", Status::Closed),
        ];
        let filters = FilterSet {
            search: Some("   ".to_string()),
            ..FilterSet::default()
        };
        assert!(filters.is_empty());
        let out = apply_filters(&records, &filters);
        assert_eq!(sr_numbers(&out), vec![Some(3), Some(1)]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let records = vec![
            sample_record(1, "Amna", "Civil Lines", Status::Pending),
            sample_record(2, "Bilal", " civil lines ", Status::Closed),
            sample_record(3, "Chand", "Model Town", Status::Closed),
        ];
        let filters = FilterSet {
            police_station: Some("CIVIL LINES".to_string()),
            status: Some(Status::Closed),
            ..FilterSet::default()
        };
        let out = apply_filters(&records, &filters);
        assert_eq!(sr_numbers(&out), vec![Some(2)]);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let mut by_contact = sample_record(2, "Bilal", "", Status::Pending);
        by_contact.contact = "0300-555".to_string();
        let mut by_category = sample_record(3, "Chand", "", Status::Pending);
        by_category.category = "Land Dispute".to_string();
        let records = vec![
            sample_record(1, "Amna KHAN", "", Status::Pending),
            by_contact,
            by_category,
        ];

        let find = |term: &str| {
            let filters = FilterSet {
                search: Some(term.to_string()),
                ..FilterSet::default()
            };
            sr_numbers(&apply_filters(&records, &filters))
        };
        assert_eq!(find("khan"), vec![Some(1)]);
        assert_eq!(find("555"), vec![Some(2)]);
        assert_eq!(find("DISPUTE"), vec![Some(3)]);
    }

    #[test]
    fn marked_to_matches_substring() {
        let mut record = sample_record(1, "Amna", "", Status::Pending);
        record.marked_to = "SHO Civil Lines".to_string();
        let records = vec![record];
        let filters = FilterSet {
            marked_to: Some("civil".to_string()),
            ..FilterSet::default()
        };
        assert_eq!(apply_filters(&records, &filters).len(), 1);
    }

    #[test]
    fn date_range_is_inclusive_and_rejects_missing_dates() {
        let records = vec![
            dated(1, Some("2024-01-01")),
            dated(2, Some("2024-01-15")),
            dated(3, Some("2024-01-31")),
            dated(4, None),
            dated(5, Some("garbage")),
        ];
        let filters = FilterSet::date_range(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 1, 15),
        );
        assert_eq!(
            sr_numbers(&apply_filters(&records, &filters)),
            vec![Some(1), Some(2)]
        );

        let only_to = FilterSet::date_range(None, NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(apply_filters(&records, &only_to).len(), 3);
    }

    #[test]
    fn sorts_numbers_numerically_and_text_case_insensitively() {
        let records = vec![
            sample_record(10, "bilal", "", Status::Pending),
            sample_record(9, "Amna", "", Status::Pending),
            sample_record(100, "chand", "", Status::Pending),
        ];
        let by_sr = sort_records(&records, &SortSpec::new("sr_no", SortDirection::Asc));
        assert_eq!(sr_numbers(&by_sr), vec![Some(9), Some(10), Some(100)]);

        let by_name = sort_records(&records, &SortSpec::new("name", SortDirection::Desc));
        assert_eq!(sr_numbers(&by_name), vec![Some(100), Some(10), Some(9)]);
    }

    #[test]
    fn missing_values_sort_first_ascending() {
        let records = vec![dated(1, Some("2024-02-01")), dated(2, None), dated(3, Some("2024-01-01"))];
        let sorted = sort_records(&records, &SortSpec::new("date", SortDirection::Asc));
        assert_eq!(sr_numbers(&sorted), vec![Some(2), Some(3), Some(1)]);
    }

    #[test]
    fn ties_keep_input_order_in_both_directions() {
        let records = vec![
            sample_record(1, "Same", "", Status::Pending),
            sample_record(2, "same", "", Status::Pending),
            sample_record(3, "Other", "", Status::Pending),
        ];
        let asc = sort_records(&records, &SortSpec::new("name", SortDirection::Asc));
        assert_eq!(sr_numbers(&asc), vec![Some(3), Some(1), Some(2)]);
        let desc = sort_records(&records, &SortSpec::new("name", SortDirection::Desc));
        assert_eq!(sr_numbers(&desc), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn unknown_sort_key_keeps_input_order() {
        let records = vec![dated(2, None), dated(1, None)];
        let sorted = sort_records(&records, &SortSpec::new("nope", SortDirection::Desc));
        assert_eq!(sr_numbers(&sorted), vec![Some(2), Some(1)]);
    }

    #[test]
    fn paginate_edges() {
        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, 1, 10);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());

        let items: Vec<u32> = (1..=25).collect();
        let last = paginate(&items, 3, 10);
        assert_eq!(last.items, &[21, 22, 23, 24, 25]);
        assert_eq!(last.total_pages, 3);
        assert_eq!((last.first_index(), last.last_index()), (21, 25));

        assert!(paginate(&items, 4, 10).items.is_empty());
        assert!(paginate(&items, 0, 10).items.is_empty());
        assert_eq!(paginate(&items, 1, 0).total_pages, 0);
    }

    #[test]
    fn clamp_page_stays_in_range() {
        assert_eq!(clamp_page(0, 5), 1);
        assert_eq!(clamp_page(9, 5), 5);
        assert_eq!(clamp_page(3, 0), 1);
    }

    #[test]
    fn filter_and_sort_changes_reset_page() {
        let state = QueryState::default().with_page(4);
        assert_eq!(state.page, 4);
        assert_eq!(state.clone().with_search("khan").page, 1);
        assert_eq!(
            state
                .clone()
                .with_sort(SortSpec::new("name", SortDirection::Asc))
                .page,
            1
        );
        assert_eq!(state.with_page_size(10).page, 1);
    }

    #[test]
    fn clicking_a_column_toggles_direction() {
        let sort = SortSpec::new("name", SortDirection::Asc);
        assert_eq!(sort.clicked("name").direction, SortDirection::Desc);
        assert_eq!(sort.clicked("date"), SortSpec::new("date", SortDirection::Asc));
    }

    #[test]
    fn run_query_clamps_requested_page() {
        let records: Vec<ApplicationRecord> = (1..=12)
            .map(|n| sample_record(n, "x", "", Status::Pending))
            .collect();
        let state = QueryState {
            sort: SortSpec::new("sr_no", SortDirection::Asc),
            page: 7,
            page_size: 5,
            ..QueryState::default()
        };
        let view = run_query(&records, &state);
        assert_eq!(view.total_pages(), 3);
        let page = view.current_page();
        assert_eq!(page.page, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].sr_no, Some(11));
    }

    #[test]
    fn counts_active_filters() {
        let filters = FilterSet {
            status: Some(Status::Heard),
            search: Some("ali".to_string()),
            division: Some(" ".to_string()),
            ..FilterSet::default()
        };
        assert_eq!(active_filter_count(&filters), 2);
    }

    fn arb_record() -> impl Strategy<Value = ApplicationRecord> {
        (
            any::<i64>(),
            "[a-zA-Z ]{0,8}",
            prop::sample::select(Status::ALL.to_vec()),
        )
            .prop_map(|(sr_no, name, status)| ApplicationRecord {
                sr_no: Some(sr_no),
                name,
                status,
                ..ApplicationRecord::default()
            })
    }

    proptest! {
        #[test]
        fn no_predicates_is_identity(records in prop::collection::vec(arb_record(), 0..40)) {
            let out = apply_filters(&records, &FilterSet::default());
            prop_assert_eq!(out.len(), records.len());
            for (kept, input) in out.iter().zip(records.iter()) {
                prop_assert_eq!(*kept, input);
            }
        }

        #[test]
        fn desc_is_reversed_asc_without_ties(
            keys in prop::collection::hash_set(-1_000_000i64..1_000_000, 0..40)
        ) {
            let records: Vec<ApplicationRecord> = keys
                .into_iter()
                .map(|sr_no| ApplicationRecord { sr_no: Some(sr_no), ..ApplicationRecord::default() })
                .collect();
            let mut asc = sort_records(&records, &SortSpec::new("sr_no", SortDirection::Asc));
            let desc = sort_records(&records, &SortSpec::new("sr_no", SortDirection::Desc));
            asc.reverse();
            prop_assert_eq!(asc, desc);
        }

        #[test]
        fn pages_reconstruct_input(
            records in prop::collection::vec(arb_record(), 0..60),
            page_size in 1usize..15
        ) {
            let first = paginate(&records, 1, page_size);
            let mut rebuilt = Vec::new();
            for page in 1..=first.total_pages {
                rebuilt.extend_from_slice(paginate(&records, page, page_size).items);
            }
            prop_assert_eq!(rebuilt, records);
        }
    }
}
