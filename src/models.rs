use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CourtError, Result};

/// Case lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Pending,
    Heard,
    Referred,
    Closed,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::Heard,
        Status::Referred,
        Status::Closed,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Heard => "HEARD",
            Status::Referred => "REFERRED",
            Status::Closed => "CLOSED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Heard => "Heard",
            Status::Referred => "Referred to Legal Assistance",
            Status::Closed => "Closed",
        }
    }

    /// Accepts codes and display labels in any case. Returns `None` for
    /// anything else so callers can pick their own fallback.
    pub fn parse_lenient(value: &str) -> Option<Status> {
        let value = value.trim();
        Status::ALL.into_iter().find(|status| {
            value.eq_ignore_ascii_case(status.code()) || value.eq_ignore_ascii_case(status.label())
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Status {
    type Err = CourtError;

    fn from_str(value: &str) -> Result<Self> {
        Status::parse_lenient(value)
            .ok_or_else(|| CourtError::InvalidInput(format!("Invalid status: {value}")))
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<Scalar>::deserialize(deserializer)?;
        Ok(raw
            .and_then(Scalar::into_text)
            .and_then(|text| Status::parse_lenient(&text))
            .unwrap_or_default())
    }
}

/// Citizen satisfaction outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Feedback {
    Positive,
    Negative,
    #[default]
    Pending,
}

impl Feedback {
    pub const ALL: [Feedback; 3] = [Feedback::Positive, Feedback::Negative, Feedback::Pending];

    pub fn code(self) -> &'static str {
        match self {
            Feedback::Positive => "POSITIVE",
            Feedback::Negative => "NEGATIVE",
            Feedback::Pending => "PENDING",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Feedback::Positive => "Positive",
            Feedback::Negative => "Negative",
            Feedback::Pending => "Pending",
        }
    }

    pub fn parse_lenient(value: &str) -> Option<Feedback> {
        let value = value.trim();
        Feedback::ALL
            .into_iter()
            .find(|feedback| value.eq_ignore_ascii_case(feedback.code()))
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Feedback {
    type Err = CourtError;

    fn from_str(value: &str) -> Result<Self> {
        Feedback::parse_lenient(value)
            .ok_or_else(|| CourtError::InvalidInput(format!("Invalid feedback: {value}")))
    }
}

impl<'de> Deserialize<'de> for Feedback {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<Scalar>::deserialize(deserializer)?;
        Ok(raw
            .and_then(Scalar::into_text)
            .and_then(|text| Feedback::parse_lenient(&text))
            .unwrap_or_default())
    }
}

/// One citizen application as served by the applications endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub sr_no: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dairy_no: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contact: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub police_station: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub division: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub marked_to: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub marked_by: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub feedback: Feedback,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub days: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timeline: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub remarks: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dairy_ps: String,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub created_by_name: Option<String>,
}

/// A record field as seen by the table sorter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Missing,
}

impl ApplicationRecord {
    /// The application's own date, when it parses.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_record_date)
    }

    /// Looks a field up by its wire name. Unknown names are `Missing`.
    pub fn field(&self, key: &str) -> FieldValue<'_> {
        match key {
            "id" => number(self.id),
            "sr_no" => number(self.sr_no),
            "days" => number(self.days),
            "dairy_no" => FieldValue::Text(&self.dairy_no),
            "name" => FieldValue::Text(&self.name),
            "contact" => FieldValue::Text(&self.contact),
            "police_station" => FieldValue::Text(&self.police_station),
            "division" => FieldValue::Text(&self.division),
            "category" => FieldValue::Text(&self.category),
            "marked_to" => FieldValue::Text(&self.marked_to),
            "marked_by" => FieldValue::Text(&self.marked_by),
            "status" => FieldValue::Text(self.status.code()),
            "feedback" => FieldValue::Text(self.feedback.code()),
            "date" => text(self.date.as_deref()),
            "timeline" => FieldValue::Text(&self.timeline),
            "remarks" => FieldValue::Text(&self.remarks),
            "dairy_ps" => FieldValue::Text(&self.dairy_ps),
            "created_at" => text(self.created_at.as_deref()),
            "updated_at" => text(self.updated_at.as_deref()),
            "created_by_name" => text(self.created_by_name.as_deref()),
            _ => FieldValue::Missing,
        }
    }

    pub fn update_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Remarks are only replaced when new remarks are supplied.
    pub fn update_feedback(&mut self, feedback: Feedback, remarks: &str) {
        self.feedback = feedback;
        if !remarks.trim().is_empty() {
            self.remarks = remarks.to_string();
        }
    }
}

fn number(value: Option<i64>) -> FieldValue<'static> {
    value.map_or(FieldValue::Missing, |v| FieldValue::Number(v as f64))
}

fn text(value: Option<&str>) -> FieldValue<'_> {
    value.map_or(FieldValue::Missing, FieldValue::Text)
}

/// Independent partial updates; neither replaces the whole record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordUpdate {
    Status(Status),
    Feedback { feedback: Feedback, remarks: String },
}

pub fn apply_update<'a>(
    records: &'a mut [ApplicationRecord],
    id: i64,
    update: &RecordUpdate,
) -> Result<&'a ApplicationRecord> {
    let record = records
        .iter_mut()
        .find(|record| record.id == Some(id))
        .ok_or_else(|| CourtError::InvalidInput(format!("No application with id {id}")))?;

    match update {
        RecordUpdate::Status(status) => record.update_status(*status),
        RecordUpdate::Feedback { feedback, remarks } => record.update_feedback(*feedback, remarks),
    }

    Ok(record)
}

/// Parses `YYYY-MM-DD`, RFC 3339 timestamps and naive `YYYY-MM-DD HH:MM:SS`
/// timestamps (space or `T`, optional fractional seconds).
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Staff login account. The password is accepted on input but never written back out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaffAccount {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub police_station: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub division: String,
}

impl StaffAccount {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// JSON scalars as they show up in exported sheets: contact numbers arrive as
/// numbers, day counts as strings.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    pub(crate) fn into_text(self) -> Option<String> {
        match self {
            Scalar::Int(v) => Some(v.to_string()),
            Scalar::Float(v) => Some(v.to_string()),
            Scalar::Bool(v) => Some(v.to_string()),
            Scalar::Text(v) => Some(v),
        }
    }

    fn into_int(self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(v),
            Scalar::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
            Scalar::Text(v) => parse_int_text(&v),
            _ => None,
        }
    }
}

/// Integer text, tolerating the `12.0` form spreadsheets produce.
pub(crate) fn parse_int_text(value: &str) -> Option<i64> {
    let value = value.trim();
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

pub(crate) fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .and_then(Scalar::into_text)
        .unwrap_or_default())
}

pub(crate) fn lenient_opt_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .and_then(Scalar::into_text)
        .filter(|text| !text.trim().is_empty()))
}

pub(crate) fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<i64>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.and_then(Scalar::into_int))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_codes_and_labels() {
        assert_eq!(Status::parse_lenient("closed"), Some(Status::Closed));
        assert_eq!(Status::parse_lenient(" Heard "), Some(Status::Heard));
        assert_eq!(
            Status::parse_lenient("Referred to Legal Assistance"),
            Some(Status::Referred)
        );
        assert_eq!(Status::parse_lenient("archived"), None);
        assert!("archived".parse::<Status>().is_err());
    }

    #[test]
    fn missing_and_unknown_enums_default_to_pending() {
        let record: ApplicationRecord =
            serde_json::from_str(r#"{"status": null, "feedback": "maybe"}"#).unwrap();
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.feedback, Feedback::Pending);
    }

    #[test]
    fn deserializes_loose_scalars() {
        let record: ApplicationRecord = serde_json::from_str(
            r#"{"id": 7, "sr_no": "12", "contact": 3001234567, "days": "5", "date": "", "name": null}"#,
        )
        .unwrap();
        assert_eq!(record.id, Some(7));
        assert_eq!(record.sr_no, Some(12));
        assert_eq!(record.contact, "3001234567");
        assert_eq!(record.days, Some(5));
        assert_eq!(record.date, None);
        assert_eq!(record.name, "");
    }

    #[test]
    fn serializes_enum_codes() {
        let record = ApplicationRecord {
            status: Status::Referred,
            feedback: Feedback::Negative,
            ..ApplicationRecord::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "REFERRED");
        assert_eq!(value["feedback"], "NEGATIVE");
    }

    #[test]
    fn parses_supported_date_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(parse_record_date("2024-01-05"), expected);
        assert_eq!(parse_record_date("2024-01-05T10:30:00+05:00"), expected);
        assert_eq!(parse_record_date("2024-01-05 08:00:00"), expected);
        assert_eq!(parse_record_date("05/01/2024"), None);
        assert_eq!(parse_record_date("  "), None);
    }

    #[test]
    fn parses_fractional_second_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(parse_record_date("2024-01-05T10:30:00.123456"), expected);
        assert_eq!(parse_record_date("2024-01-05 10:30:00.5"), expected);
        assert_eq!(parse_record_date("2024-01-05T10:30:00"), expected);
        assert_eq!(parse_record_date("2024-01-05T10:30:00.123456Z"), expected);
    }

    #[test]
    fn field_lookup_covers_numeric_and_unknown_keys() {
        let record = ApplicationRecord {
            sr_no: Some(4),
            name: "Asif".to_string(),
            ..ApplicationRecord::default()
        };
        assert_eq!(record.field("sr_no"), FieldValue::Number(4.0));
        assert_eq!(record.field("name"), FieldValue::Text("Asif"));
        assert_eq!(record.field("days"), FieldValue::Missing);
        assert_eq!(record.field("no_such_field"), FieldValue::Missing);
    }

    #[test]
    fn feedback_update_keeps_remarks_when_none_given() {
        let mut record = ApplicationRecord {
            remarks: "called twice".to_string(),
            ..ApplicationRecord::default()
        };
        record.update_feedback(Feedback::Positive, "  ");
        assert_eq!(record.feedback, Feedback::Positive);
        assert_eq!(record.remarks, "called twice");

        record.update_feedback(Feedback::Negative, "not satisfied");
        assert_eq!(record.remarks, "not satisfied");
    }

    #[test]
    fn apply_update_targets_record_by_id() {
        let mut records = vec![
            ApplicationRecord {
                id: Some(1),
                ..ApplicationRecord::default()
            },
            ApplicationRecord {
                id: Some(2),
                ..ApplicationRecord::default()
            },
        ];

        let updated = apply_update(&mut records, 2, &RecordUpdate::Status(Status::Heard)).unwrap();
        assert_eq!(updated.status, Status::Heard);
        assert_eq!(records[0].status, Status::Pending);

        assert!(apply_update(&mut records, 9, &RecordUpdate::Status(Status::Closed)).is_err());
    }

    #[test]
    fn staff_password_is_write_only() {
        let staff: StaffAccount =
            serde_json::from_str(r#"{"username": "sho_civil", "password": "secret"}"#).unwrap();
        assert_eq!(staff.password.as_deref(), Some("secret"));
        let value = serde_json::to_value(&staff).unwrap();
        assert!(value.get("password").is_none());
    }
}
