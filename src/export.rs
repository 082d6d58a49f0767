use std::borrow::Borrow;
use std::io;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::ApplicationRecord;

/// One row of the table export, in on-screen column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    #[serde(rename = "Sr.No")]
    pub sr_no: String,
    #[serde(rename = "Dairy No")]
    pub dairy_no: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Contact")]
    pub contact: String,
    #[serde(rename = "Police Station")]
    pub police_station: String,
    #[serde(rename = "Division")]
    pub division: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Marked To")]
    pub marked_to: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Feedback")]
    pub feedback: String,
    #[serde(rename = "Date")]
    pub date: String,
}

impl From<&ApplicationRecord> for TableRow {
    fn from(record: &ApplicationRecord) -> Self {
        TableRow {
            sr_no: record.sr_no.map(|v| v.to_string()).unwrap_or_default(),
            dairy_no: record.dairy_no.clone(),
            name: record.name.clone(),
            contact: record.contact.clone(),
            police_station: record.police_station.clone(),
            division: record.division.clone(),
            category: record.category.clone(),
            marked_to: record.marked_to.clone(),
            status: record.status.code().to_string(),
            feedback: record.feedback.code().to_string(),
            date: record.date.clone().unwrap_or_default(),
        }
    }
}

/// Row shape handed to spreadsheet writers. Gaps read `N/A` rather than blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetRow {
    #[serde(rename = "SR NO")]
    pub sr_no: String,
    #[serde(rename = "DAIRY NO")]
    pub dairy_no: String,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "CONTACT")]
    pub contact: String,
    #[serde(rename = "POLICE STATION")]
    pub police_station: String,
    #[serde(rename = "DIVISION")]
    pub division: String,
    #[serde(rename = "CATEGORY")]
    pub category: String,
    #[serde(rename = "MARKED TO")]
    pub marked_to: String,
    #[serde(rename = "MARKED BY")]
    pub marked_by: String,
    #[serde(rename = "STATUS")]
    pub status: String,
    #[serde(rename = "FEEDBACK")]
    pub feedback: String,
    #[serde(rename = "DATE")]
    pub date: String,
    #[serde(rename = "TIMELINE")]
    pub timeline: String,
    #[serde(rename = "DAYS")]
    pub days: String,
    #[serde(rename = "DAIRY PS")]
    pub dairy_ps: String,
    #[serde(rename = "REMARKS")]
    pub remarks: String,
}

const NOT_AVAILABLE: &str = "N/A";

fn or_na(value: &str) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

impl From<&ApplicationRecord> for SheetRow {
    fn from(record: &ApplicationRecord) -> Self {
        SheetRow {
            sr_no: record.sr_no.map(|v| v.to_string()).unwrap_or_default(),
            dairy_no: record.dairy_no.clone(),
            name: record.name.clone(),
            contact: record.contact.clone(),
            police_station: record.police_station.clone(),
            division: or_na(&record.division),
            category: record.category.clone(),
            marked_to: or_na(&record.marked_to),
            marked_by: or_na(&record.marked_by),
            status: record.status.code().to_string(),
            feedback: record.feedback.code().to_string(),
            date: or_na(record.date.as_deref().unwrap_or_default()),
            timeline: or_na(&record.timeline),
            days: record
                .days
                .map_or_else(|| NOT_AVAILABLE.to_string(), |d| d.to_string()),
            dairy_ps: or_na(&record.dairy_ps),
            remarks: record.remarks.clone(),
        }
    }
}

pub fn table_rows<R: Borrow<ApplicationRecord>>(records: &[R]) -> Vec<TableRow> {
    records
        .iter()
        .map(|r| TableRow::from(Borrow::<ApplicationRecord>::borrow(r)))
        .collect()
}

pub fn spreadsheet_rows<R: Borrow<ApplicationRecord>>(records: &[R]) -> Vec<SheetRow> {
    records
        .iter()
        .map(|r| SheetRow::from(Borrow::<ApplicationRecord>::borrow(r)))
        .collect()
}

fn write_rows<W: io::Write, T: Serialize>(writer: W, rows: &[T]) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

/// Writes the table export; the header row is always present, even for no rows.
pub fn write_table_csv<W: io::Write, R: Borrow<ApplicationRecord>>(
    writer: W,
    records: &[R],
) -> Result<usize> {
    let rows = table_rows(records);
    if rows.is_empty() {
        return write_header_only(writer, &TABLE_HEADERS);
    }
    let written = write_rows(writer, &rows)?;
    debug!(rows = written, "wrote table csv");
    Ok(written)
}

pub fn write_sheet_csv<W: io::Write, R: Borrow<ApplicationRecord>>(
    writer: W,
    records: &[R],
) -> Result<usize> {
    let rows = spreadsheet_rows(records);
    if rows.is_empty() {
        return write_header_only(writer, &SHEET_HEADERS);
    }
    let written = write_rows(writer, &rows)?;
    debug!(rows = written, "wrote spreadsheet csv");
    Ok(written)
}

fn write_header_only<W: io::Write>(writer: W, headers: &[&str]) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(headers)?;
    writer.flush()?;
    Ok(0)
}

pub const TABLE_HEADERS: [&str; 11] = [
    "Sr.No",
    "Dairy No",
    "Name",
    "Contact",
    "Police Station",
    "Division",
    "Category",
    "Marked To",
    "Status",
    "Feedback",
    "Date",
];

pub const SHEET_HEADERS: [&str; 16] = [
    "SR NO",
    "DAIRY NO",
    "NAME",
    "CONTACT",
    "POLICE STATION",
    "DIVISION",
    "CATEGORY",
    "MARKED TO",
    "MARKED BY",
    "STATUS",
    "FEEDBACK",
    "DATE",
    "TIMELINE",
    "DAYS",
    "DAIRY PS",
    "REMARKS",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feedback, Status};

    fn sample_record() -> ApplicationRecord {
        ApplicationRecord {
            id: Some(1),
            sr_no: Some(12),
            dairy_no: "D-12".to_string(),
            name: "Asha, Khan".to_string(),
            contact: "03001234567".to_string(),
            police_station: "Saddar".to_string(),
            category: "Theft".to_string(),
            status: Status::Closed,
            feedback: Feedback::Positive,
            date: Some("2024-01-20".to_string()),
            days: Some(10),
            ..ApplicationRecord::default()
        }
    }

    fn as_text(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn table_csv_has_fixed_column_order() {
        let mut buffer = Vec::new();
        let written = write_table_csv(&mut buffer, &[sample_record()]).unwrap();
        assert_eq!(written, 1);
        let text = as_text(buffer);
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), TABLE_HEADERS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "12,D-12,\"Asha, Khan\",03001234567,Saddar,,Theft,,CLOSED,POSITIVE,2024-01-20"
        );
    }

    #[test]
    fn empty_export_still_writes_headers() {
        let mut buffer = Vec::new();
        let records: Vec<&ApplicationRecord> = Vec::new();
        assert_eq!(write_sheet_csv(&mut buffer, &records).unwrap(), 0);
        assert_eq!(as_text(buffer).trim_end(), SHEET_HEADERS.join(","));
    }

    #[test]
    fn sheet_rows_fill_gaps_with_na() {
        let row = SheetRow::from(&sample_record());
        assert_eq!(row.division, "N/A");
        assert_eq!(row.marked_by, "N/A");
        assert_eq!(row.days, "10");
        assert_eq!(row.remarks, "");

        let bare = SheetRow::from(&ApplicationRecord::default());
        assert_eq!(bare.date, "N/A");
        assert_eq!(bare.days, "N/A");
        assert_eq!(bare.sr_no, "");
    }

    #[test]
    fn sheet_header_matches_serialized_names() {
        let mut buffer = Vec::new();
        write_sheet_csv(&mut buffer, &[sample_record()]).unwrap();
        let text = as_text(buffer);
        assert_eq!(text.lines().next().unwrap(), SHEET_HEADERS.join(","));
    }
}
