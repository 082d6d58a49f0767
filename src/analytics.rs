//! Aggregates behind the analytics page. Every function takes the (optionally
//! date-scoped) record set and returns a fixed-shape value the charts bind to
//! directly. Empty input always yields the zero/empty shape.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{ApplicationRecord, Feedback, Status};
use crate::normalize::{GroupField, Grouper};
use crate::pipeline::{apply_filters, FilterSet};

/// `numerator / denominator * 100` to one decimal; 0 when the denominator is 0.
pub fn percentage(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round1(numerator as f64 / denominator as f64 * 100.0)
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct StatusDistribution {
    pub pending: usize,
    pub heard: usize,
    pub referred: usize,
    pub closed: usize,
}

impl StatusDistribution {
    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Pending => self.pending,
            Status::Heard => self.heard,
            Status::Referred => self.referred,
            Status::Closed => self.closed,
        }
    }

    fn bump(&mut self, status: Status) {
        match status {
            Status::Pending => self.pending += 1,
            Status::Heard => self.heard += 1,
            Status::Referred => self.referred += 1,
            Status::Closed => self.closed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.heard + self.referred + self.closed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct FeedbackDistribution {
    pub positive: usize,
    pub negative: usize,
    pub pending: usize,
}

impl FeedbackDistribution {
    pub fn count(&self, feedback: Feedback) -> usize {
        match feedback {
            Feedback::Positive => self.positive,
            Feedback::Negative => self.negative,
            Feedback::Pending => self.pending,
        }
    }

    /// Feedback that has actually been given.
    pub fn answered(&self) -> usize {
        self.positive + self.negative
    }
}

pub fn status_distribution(records: &[ApplicationRecord]) -> StatusDistribution {
    let mut dist = StatusDistribution::default();
    for record in records {
        dist.bump(record.status);
    }
    dist
}

pub fn feedback_distribution(records: &[ApplicationRecord]) -> FeedbackDistribution {
    let mut dist = FeedbackDistribution::default();
    for record in records {
        match record.feedback {
            Feedback::Positive => dist.positive += 1,
            Feedback::Negative => dist.negative += 1,
            Feedback::Pending => dist.pending += 1,
        }
    }
    dist
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub applications: usize,
    pub sort_key: String,
}

/// The most recent `months_back` months that have data, oldest first.
pub fn monthly_trend(records: &[ApplicationRecord], months_back: usize) -> Vec<MonthlyPoint> {
    let mut months: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for date in records.iter().filter_map(ApplicationRecord::parsed_date) {
        *months.entry((date.year(), date.month())).or_insert(0) += 1;
    }

    let skip = months.len().saturating_sub(months_back);
    months
        .into_iter()
        .skip(skip)
        .filter_map(|((year, month), applications)| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(MonthlyPoint {
                month: first.format("%b %Y").to_string(),
                applications,
                sort_key: format!("{year:04}-{month:02}"),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub count: usize,
    pub sort_key: String,
}

/// Per-day counts inside `[window_end - days_back, window_end]`, oldest first.
pub fn daily_trend(
    records: &[ApplicationRecord],
    days_back: u32,
    window_end: NaiveDate,
) -> Vec<DailyPoint> {
    let window_start = window_end
        .checked_sub_signed(Duration::days(i64::from(days_back)))
        .unwrap_or(NaiveDate::MIN);
    let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in records.iter().filter_map(ApplicationRecord::parsed_date) {
        if date >= window_start && date <= window_end {
            *days.entry(date).or_insert(0) += 1;
        }
    }

    days.into_iter()
        .map(|(date, count)| DailyPoint {
            date: date.format("%b %-d").to_string(),
            count,
            sort_key: date.format("%Y-%m-%d").to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

/// Counts per normalized value, largest first, first appearance breaking ties.
pub fn top_n_by_field(records: &[ApplicationRecord], field: GroupField, n: usize) -> Vec<NamedCount> {
    let mut grouper: Grouper<usize> = Grouper::new();
    for record in records {
        if let Some(count) = grouper.entry(field.value(record)) {
            *count += 1;
        }
    }

    let mut counts: Vec<NamedCount> = grouper
        .into_groups()
        .into_iter()
        .map(|(name, count)| NamedCount { name, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(n);
    counts
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DivisionPerformance {
    pub name: String,
    pub total: usize,
    pub pending: usize,
    pub resolved: usize,
    pub resolution_rate: f64,
}

/// Resolved means CLOSED; HEARD and REFERRED count toward neither side.
pub fn division_performance(records: &[ApplicationRecord]) -> Vec<DivisionPerformance> {
    let mut grouper: Grouper<(usize, usize, usize)> = Grouper::new();
    for record in records {
        if let Some((total, pending, resolved)) = grouper.entry(&record.division) {
            *total += 1;
            match record.status {
                Status::Pending => *pending += 1,
                Status::Closed => *resolved += 1,
                Status::Heard | Status::Referred => {}
            }
        }
    }

    let mut divisions: Vec<DivisionPerformance> = grouper
        .into_groups()
        .into_iter()
        .map(|(name, (total, pending, resolved))| DivisionPerformance {
            name,
            total,
            pending,
            resolved,
            resolution_rate: percentage(resolved, total),
        })
        .collect();
    divisions.sort_by(|a, b| b.total.cmp(&a.total));
    divisions
}

/// Mean of `days` over records with this status that carry a value; 0 when none do.
pub fn avg_resolution_days(records: &[ApplicationRecord], status: Status) -> f64 {
    let (sum, count) = records
        .iter()
        .filter(|record| record.status == status)
        .filter_map(|record| record.days)
        .fold((0i128, 0usize), |(sum, count), days| {
            (sum + i128::from(days), count + 1)
        });

    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionTime {
    pub status: Status,
    pub days: f64,
}

pub fn resolution_time(records: &[ApplicationRecord]) -> Vec<ResolutionTime> {
    Status::ALL
        .into_iter()
        .map(|status| ResolutionTime {
            status,
            days: round1(avg_resolution_days(records, status)),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupStatusBreakdown {
    pub name: String,
    #[serde(rename = "PENDING")]
    pub pending: usize,
    #[serde(rename = "HEARD")]
    pub heard: usize,
    #[serde(rename = "REFERRED")]
    pub referred: usize,
    #[serde(rename = "CLOSED")]
    pub closed: usize,
    pub total: usize,
}

/// Stacked status counts per group, busiest groups first, cut to `n`.
pub fn status_by_group(
    records: &[ApplicationRecord],
    field: GroupField,
    n: usize,
) -> Vec<GroupStatusBreakdown> {
    let mut grouper: Grouper<StatusDistribution> = Grouper::new();
    for record in records {
        if let Some(dist) = grouper.entry(field.value(record)) {
            dist.bump(record.status);
        }
    }

    let mut groups: Vec<GroupStatusBreakdown> = grouper
        .into_groups()
        .into_iter()
        .map(|(name, dist)| GroupStatusBreakdown {
            name,
            pending: dist.pending,
            heard: dist.heard,
            referred: dist.referred,
            closed: dist.closed,
            total: dist.total(),
        })
        .collect();
    groups.sort_by(|a, b| b.total.cmp(&a.total));
    groups.truncate(n);
    groups
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryFeedback {
    pub name: String,
    #[serde(rename = "POSITIVE")]
    pub positive: usize,
    #[serde(rename = "NEGATIVE")]
    pub negative: usize,
    pub satisfaction: f64,
}

/// Positive vs negative per category. PENDING feedback is left out entirely,
/// so categories without any answered feedback do not appear.
pub fn category_feedback_correlation(records: &[ApplicationRecord]) -> Vec<CategoryFeedback> {
    let mut grouper: Grouper<(usize, usize)> = Grouper::new();
    for record in records {
        if record.feedback == Feedback::Pending {
            continue;
        }
        if let Some((positive, negative)) = grouper.entry(&record.category) {
            match record.feedback {
                Feedback::Positive => *positive += 1,
                Feedback::Negative => *negative += 1,
                Feedback::Pending => {}
            }
        }
    }

    let mut categories: Vec<CategoryFeedback> = grouper
        .into_groups()
        .into_iter()
        .map(|(name, (positive, negative))| CategoryFeedback {
            name,
            positive,
            negative,
            satisfaction: percentage(positive, positive + negative),
        })
        .collect();
    categories.sort_by(|a, b| (b.positive + b.negative).cmp(&(a.positive + a.negative)));
    categories
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayCount {
    pub day: String,
    pub count: usize,
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Always seven entries, Monday first.
pub fn day_of_week_histogram(records: &[ApplicationRecord]) -> Vec<WeekdayCount> {
    let mut counts = [0usize; 7];
    for date in records.iter().filter_map(ApplicationRecord::parsed_date) {
        counts[date.weekday().num_days_from_monday() as usize] += 1;
    }

    WEEK.iter()
        .zip(counts)
        .map(|(day, count)| WeekdayCount {
            day: day.to_string(),
            count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBucket {
    pub label: String,
    pub count: usize,
}

pub const AGE_BANDS: [&str; 5] = ["0-7", "8-15", "16-30", "31-60", "60+"];

fn age_band(days: i64) -> Option<usize> {
    match days {
        0..=7 => Some(0),
        8..=15 => Some(1),
        16..=30 => Some(2),
        31..=60 => Some(3),
        61..=i64::MAX => Some(4),
        _ => None,
    }
}

/// How long PENDING records have waited as of `reference`. Records without a
/// usable date, or dated after `reference`, are not bucketed.
pub fn pending_age_buckets(records: &[ApplicationRecord], reference: NaiveDate) -> Vec<AgeBucket> {
    let mut counts = [0usize; 5];
    for record in records.iter().filter(|r| r.status == Status::Pending) {
        let Some(date) = record.parsed_date() else {
            continue;
        };
        if let Some(band) = age_band((reference - date).num_days()) {
            counts[band] += 1;
        }
    }

    AGE_BANDS
        .iter()
        .zip(counts)
        .map(|(label, count)| AgeBucket {
            label: (*label).to_string(),
            count,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ContactCompleteness {
    pub with_contact: usize,
    pub total: usize,
    pub percentage: f64,
}

pub fn contact_completeness(records: &[ApplicationRecord]) -> ContactCompleteness {
    let with_contact = records
        .iter()
        .filter(|record| !record.contact.trim().is_empty())
        .count();
    ContactCompleteness {
        with_contact,
        total: records.len(),
        percentage: percentage(with_contact, records.len()),
    }
}

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total: usize,
    pub pending: usize,
    pub heard: usize,
    pub referred: usize,
    pub closed: usize,
    pub positive_feedback: usize,
    pub negative_feedback: usize,
    pub resolution_rate: f64,
    pub positive_feedback_rate: f64,
    pub pending_share: f64,
    pub avg_resolution_days: f64,
}

pub fn kpi_summary(records: &[ApplicationRecord]) -> KpiSummary {
    let status = status_distribution(records);
    let feedback = feedback_distribution(records);
    let total = records.len();

    KpiSummary {
        total,
        pending: status.pending,
        heard: status.heard,
        referred: status.referred,
        closed: status.closed,
        positive_feedback: feedback.positive,
        negative_feedback: feedback.negative,
        resolution_rate: percentage(status.closed, total),
        positive_feedback_rate: percentage(feedback.positive, feedback.answered()),
        pending_share: percentage(status.pending, total),
        avg_resolution_days: round1(avg_resolution_days(records, Status::Closed)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetric {
    pub metric: String,
    pub value: f64,
}

/// The five axes of the performance radar.
pub fn performance_metrics(records: &[ApplicationRecord]) -> Vec<PerformanceMetric> {
    let status = status_distribution(records);
    let feedback = feedback_distribution(records);
    let total = records.len();

    [
        ("Resolution Rate", percentage(status.closed, total)),
        ("Positive Feedback", percentage(feedback.positive, total)),
        (
            "Timely Response",
            percentage(status.heard + status.closed, total),
        ),
        ("Case Load", round1(total as f64 / 100.0)),
        (
            "Satisfaction",
            percentage(feedback.positive, feedback.answered()),
        ),
    ]
    .into_iter()
    .map(|(metric, value)| PerformanceMetric {
        metric: metric.to_string(),
        value,
    })
    .collect()
}

/// Limits applied when building a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsOptions {
    pub months_back: usize,
    pub days_back: u32,
    pub daily_points: usize,
    pub top_stations: usize,
    pub top_categories: usize,
    pub top_officers: usize,
    pub top_divisions: usize,
    pub stacked_groups: usize,
    pub correlation_groups: usize,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        Self {
            months_back: 6,
            days_back: 30,
            daily_points: 14,
            top_stations: 10,
            top_categories: 10,
            top_officers: 8,
            top_divisions: 8,
            stacked_groups: 8,
            correlation_groups: 8,
        }
    }
}

/// Records whose `date` falls inside the inclusive range. With neither bound
/// set every record is kept, including undated ones.
pub fn within_range(
    records: &[ApplicationRecord],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<ApplicationRecord> {
    apply_filters(records, &FilterSet::date_range(from, to))
        .into_iter()
        .cloned()
        .collect()
}

/// Every aggregate for one record set, ready to serialize for the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    pub reference_date: NaiveDate,
    pub kpis: KpiSummary,
    pub status_distribution: StatusDistribution,
    pub feedback_distribution: FeedbackDistribution,
    pub monthly_trend: Vec<MonthlyPoint>,
    pub daily_trend: Vec<DailyPoint>,
    pub top_stations: Vec<NamedCount>,
    pub top_categories: Vec<NamedCount>,
    pub top_officers: Vec<NamedCount>,
    pub division_performance: Vec<DivisionPerformance>,
    pub resolution_time: Vec<ResolutionTime>,
    pub status_by_station: Vec<GroupStatusBreakdown>,
    pub category_feedback: Vec<CategoryFeedback>,
    pub weekday_histogram: Vec<WeekdayCount>,
    pub pending_ages: Vec<AgeBucket>,
    pub contact_completeness: ContactCompleteness,
    pub performance: Vec<PerformanceMetric>,
}

impl AnalyticsSnapshot {
    /// `reference_date` closes the daily window and anchors pending ages.
    pub fn compute(
        records: &[ApplicationRecord],
        options: &AnalyticsOptions,
        reference_date: NaiveDate,
    ) -> Self {
        let mut daily_trend = daily_trend(records, options.days_back, reference_date);
        let skip = daily_trend.len().saturating_sub(options.daily_points);
        daily_trend.drain(..skip);

        let mut division_performance = division_performance(records);
        division_performance.truncate(options.top_divisions);

        let mut category_feedback = category_feedback_correlation(records);
        category_feedback.truncate(options.correlation_groups);

        let snapshot = Self {
            reference_date,
            kpis: kpi_summary(records),
            status_distribution: status_distribution(records),
            feedback_distribution: feedback_distribution(records),
            monthly_trend: monthly_trend(records, options.months_back),
            daily_trend,
            top_stations: top_n_by_field(records, GroupField::PoliceStation, options.top_stations),
            top_categories: top_n_by_field(records, GroupField::Category, options.top_categories),
            top_officers: top_n_by_field(records, GroupField::MarkedTo, options.top_officers),
            division_performance,
            resolution_time: resolution_time(records),
            status_by_station: status_by_group(
                records,
                GroupField::PoliceStation,
                options.stacked_groups,
            ),
            category_feedback,
            weekday_histogram: day_of_week_histogram(records),
            pending_ages: pending_age_buckets(records, reference_date),
            contact_completeness: contact_completeness(records),
            performance: performance_metrics(records),
        };

        debug!(
            records = records.len(),
            months = snapshot.monthly_trend.len(),
            "computed analytics snapshot"
        );
        snapshot
    }
}
