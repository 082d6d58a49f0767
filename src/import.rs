//! Upload-sheet ingestion. Sheets are read by column position, header row
//! skipped, and merged into the current record set by `sr_no`.

use std::io;

use csv::StringRecord;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{parse_int_text, parse_record_date, ApplicationRecord, Feedback, Status};

/// Column positions in the upload sheet.
mod column {
    pub const SR_NO: usize = 0;
    pub const DAIRY_NO: usize = 1;
    pub const NAME: usize = 2;
    pub const CONTACT: usize = 3;
    pub const MARKED_TO: usize = 4;
    pub const DATE: usize = 5;
    pub const MARKED_BY: usize = 6;
    pub const TIMELINE: usize = 7;
    pub const POLICE_STATION: usize = 8;
    pub const DIVISION: usize = 9;
    pub const CATEGORY: usize = 10;
    pub const STATUS: usize = 11;
    pub const DAYS: usize = 12;
    pub const FEEDBACK: usize = 13;
    pub const DAIRY_PS: usize = 14;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

impl ImportSummary {
    pub fn processed(&self) -> usize {
        self.created + self.updated
    }
}

/// Sheet columns for one row, before merging.
#[derive(Debug, Clone, PartialEq)]
struct SheetEntry {
    sr_no: i64,
    dairy_no: String,
    name: String,
    contact: String,
    marked_to: String,
    date: Option<String>,
    marked_by: String,
    timeline: String,
    police_station: String,
    division: String,
    category: String,
    status: Status,
    days: Option<i64>,
    feedback: Feedback,
    dairy_ps: String,
}

impl SheetEntry {
    fn apply_to(self, record: &mut ApplicationRecord) {
        record.sr_no = Some(self.sr_no);
        record.dairy_no = self.dairy_no;
        record.name = self.name;
        record.contact = self.contact;
        record.marked_to = self.marked_to;
        record.date = self.date;
        record.marked_by = self.marked_by;
        record.timeline = self.timeline;
        record.police_station = self.police_station;
        record.division = self.division;
        record.category = self.category;
        record.status = self.status;
        record.days = self.days;
        record.feedback = self.feedback;
        record.dairy_ps = self.dairy_ps;
    }
}

fn cell(row: &StringRecord, index: usize) -> &str {
    row.get(index).map(str::trim).unwrap_or_default()
}

/// `Ok(None)` means the row has no serial number and is skipped.
fn parse_row(
    row: &StringRecord,
    row_number: usize,
) -> std::result::Result<Option<SheetEntry>, String> {
    let raw_sr = cell(row, column::SR_NO);
    if raw_sr.is_empty() {
        return Ok(None);
    }
    let sr_no = parse_int_text(raw_sr)
        .ok_or_else(|| format!("Row {row_number}: invalid Sr.No '{raw_sr}'"))?;

    let raw_date = cell(row, column::DATE);
    let date = if raw_date.is_empty() {
        None
    } else {
        let parsed = parse_record_date(raw_date)
            .ok_or_else(|| format!("Row {row_number}: invalid date '{raw_date}'"))?;
        Some(parsed.format("%Y-%m-%d").to_string())
    };

    let days = parse_int_text(cell(row, column::DAYS)).filter(|days| *days >= 0);

    Ok(Some(SheetEntry {
        sr_no,
        dairy_no: cell(row, column::DAIRY_NO).to_string(),
        name: cell(row, column::NAME).to_string(),
        contact: cell(row, column::CONTACT).to_string(),
        marked_to: cell(row, column::MARKED_TO).to_string(),
        date,
        marked_by: cell(row, column::MARKED_BY).to_string(),
        timeline: cell(row, column::TIMELINE).to_string(),
        police_station: cell(row, column::POLICE_STATION).to_string(),
        division: cell(row, column::DIVISION).to_string(),
        category: cell(row, column::CATEGORY).to_string(),
        status: Status::parse_lenient(cell(row, column::STATUS)).unwrap_or_default(),
        days,
        feedback: Feedback::parse_lenient(cell(row, column::FEEDBACK)).unwrap_or_default(),
        dairy_ps: cell(row, column::DAIRY_PS).to_string(),
    }))
}

/// Merges an upload sheet into `records`. Existing serial numbers are
/// overwritten in place (id and audit fields kept); new ones are appended
/// without an id. Bad rows are reported in the summary and skipped.
pub fn import_sheet<R: io::Read>(
    reader: R,
    records: &mut Vec<ApplicationRecord>,
) -> Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let mut summary = ImportSummary::default();

    for (index, result) in reader.records().enumerate() {
        // Header is spreadsheet row 1.
        let row_number = index + 2;
        let row = result?;

        let entry = match parse_row(&row, row_number) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(message) => {
                warn!(row = row_number, "{message}");
                summary.errors.push(message);
                continue;
            }
        };

        match records.iter_mut().find(|r| r.sr_no == Some(entry.sr_no)) {
            Some(existing) => {
                entry.apply_to(existing);
                summary.updated += 1;
            }
            None => {
                let mut record = ApplicationRecord::default();
                entry.apply_to(&mut record);
                records.push(record);
                summary.created += 1;
            }
        }
        debug!(row = row_number, "imported sheet row");
    }

    info!(
        created = summary.created,
        updated = summary.updated,
        errors = summary.errors.len(),
        "sheet import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Sr.No,Dairy No,Name,Contact,Marked To,Date,Marked By,Timeline,P.S,Division,Category,Status,Days,Feedback,Dairy PS\n";

    fn sample_existing() -> ApplicationRecord {
        ApplicationRecord {
            id: Some(41),
            sr_no: Some(7),
            name: "Old Name".to_string(),
            remarks: "kept".to_string(),
            created_at: Some("2024-01-01T09:00:00Z".to_string()),
            ..ApplicationRecord::default()
        }
    }

    fn run(body: &str, records: &mut Vec<ApplicationRecord>) -> ImportSummary {
        let sheet = format!("{HEADER}{body}");
        import_sheet(sheet.as_bytes(), records).unwrap()
    }

    #[test]
    fn updates_by_serial_and_creates_new() {
        let mut records = vec![sample_existing()];
        let summary = run(
            "7,D-7,New Name,0300,SHO Saddar,2024-02-03,Clerk,3 days,Saddar,City,Theft,closed,4,positive,PS-1\n\
             8.0,D-8,Other,0301,,,,,Kotwali,,Fraud,,,,\n",
            &mut records,
        );

        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 1);
        assert!(summary.errors.is_empty());

        let updated = &records[0];
        assert_eq!(updated.id, Some(41));
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.status, Status::Closed);
        assert_eq!(updated.feedback, Feedback::Positive);
        assert_eq!(updated.days, Some(4));
        assert_eq!(updated.remarks, "kept");
        assert!(updated.created_at.is_some());

        let created = &records[1];
        assert_eq!(created.id, None);
        assert_eq!(created.sr_no, Some(8));
        assert_eq!(created.status, Status::Pending);
        assert_eq!(created.date, None);
    }

    #[test]
    fn bad_rows_are_reported_and_skipped() {
        let mut records = Vec::new();
        let summary = run(
            ",D-0,No Serial,,,,,,,,,,,,\n\
             abc,D-1,Bad Serial,,,,,,,,,,,,\n\
             2,D-2,Bad Date,,,31/31/2024,,,,,,,,,\n\
             3,D-3,Good,,,2024-03-01 10:15:00,,,,,,,-2,,\n",
            &mut records,
        );

        assert_eq!(summary.created, 1);
        assert_eq!(
            summary.errors,
            vec![
                "Row 3: invalid Sr.No 'abc'".to_string(),
                "Row 4: invalid date '31/31/2024'".to_string(),
            ]
        );
        assert_eq!(records[0].date.as_deref(), Some("2024-03-01"));
        assert_eq!(records[0].days, None);
    }

    #[test]
    fn short_rows_read_missing_cells_as_blank() {
        let mut records = Vec::new();
        let summary = run("5,D-5,Short\n", &mut records);
        assert_eq!(summary.processed(), 1);
        assert_eq!(records[0].category, "");
    }
}
