//! Reading and writing JSON record dumps. A dump is either a bare array or a
//! paged listing `{"count", "next", "previous", "results": [...]}` as the
//! applications endpoint returns it.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CourtError, Result};
use crate::models::{ApplicationRecord, StaffAccount};
use crate::video::VideoFeedback;

/// Parses a listing body into items. Anything that is not an array, or a
/// listing object wrapping one, is rejected.
pub fn parse_listing<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    let value: Value = serde_json::from_str(body)?;
    let items = match value {
        Value::Array(_) => value,
        Value::Object(mut object) => match object.remove("results") {
            Some(results @ Value::Array(_)) => {
                if let Some(next) = object.get("next").and_then(Value::as_str) {
                    debug!(next, "listing has further pages that were not included");
                }
                results
            }
            _ => {
                return Err(CourtError::InvalidInput(
                    "expected a JSON array or an object with a \"results\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(CourtError::InvalidInput(
                "expected a JSON array of records".to_string(),
            ))
        }
    };
    Ok(serde_json::from_value(items)?)
}

pub fn load_records(path: &Path) -> Result<Vec<ApplicationRecord>> {
    let body = fs::read_to_string(path)?;
    let records: Vec<ApplicationRecord> = parse_listing(&body)?;
    info!(records = records.len(), path = %path.display(), "loaded applications");
    Ok(records)
}

pub fn load_staff(path: &Path) -> Result<Vec<StaffAccount>> {
    let body = fs::read_to_string(path)?;
    let staff: Vec<StaffAccount> = parse_listing(&body)?;
    info!(accounts = staff.len(), path = %path.display(), "loaded staff accounts");
    Ok(staff)
}

pub fn load_videos(path: &Path) -> Result<Vec<VideoFeedback>> {
    let body = fs::read_to_string(path)?;
    let videos: Vec<VideoFeedback> = parse_listing(&body)?;
    info!(videos = videos.len(), path = %path.display(), "loaded video feedback");
    Ok(videos)
}

/// Writes items as a pretty-printed JSON array.
pub fn write_listing<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let body = serde_json::to_string_pretty(items)?;
    fs::write(path, body)?;
    debug!(items = items.len(), path = %path.display(), "wrote listing");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    #[test]
    fn accepts_bare_arrays_and_paged_listings() {
        let bare: Vec<ApplicationRecord> =
            parse_listing(r#"[{"id": 1, "status": "CLOSED"}]"#).unwrap();
        assert_eq!(bare[0].status, Status::Closed);

        let paged: Vec<ApplicationRecord> = parse_listing(
            r#"{"count": 2, "next": null, "previous": null, "results": [{"id": 1}, {"id": 2}]}"#,
        )
        .unwrap();
        assert_eq!(paged.len(), 2);
    }

    #[test]
    fn rejects_non_arrays() {
        let err = parse_listing::<ApplicationRecord>(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, CourtError::InvalidInput(_)));
        let err = parse_listing::<ApplicationRecord>("42").unwrap_err();
        assert!(matches!(err, CourtError::InvalidInput(_)));
        let err = parse_listing::<ApplicationRecord>("not json").unwrap_err();
        assert!(matches!(err, CourtError::Json(_)));
    }

    #[test]
    fn staff_passwords_are_not_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staff.json");
        let staff: Vec<StaffAccount> =
            parse_listing(r#"[{"username": "sho", "password": "secret"}]"#).unwrap();
        assert_eq!(staff[0].password.as_deref(), Some("secret"));

        write_listing(&path, &staff).unwrap();
        let reloaded = load_staff(&path).unwrap();
        assert_eq!(reloaded[0].username, "sho");
        assert_eq!(reloaded[0].password, None);
    }

    #[test]
    fn reviewed_videos_reload_from_disk() {
        use crate::video::{review_video, VideoVerdict};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videos.json");
        let mut videos: Vec<VideoFeedback> = parse_listing(
            r#"{"count": 1, "next": null, "results": [{"id": 3, "title": "Feedback"}]}"#,
        )
        .unwrap();
        review_video(&mut videos, 3, VideoVerdict::Like, "clear", "admin", "2024-03-01").unwrap();

        write_listing(&path, &videos).unwrap();
        let reloaded = load_videos(&path).unwrap();
        assert_eq!(reloaded[0].admin_feedback, VideoVerdict::Like);
        assert_eq!(reloaded[0].admin_remarks, "clear");
    }
}
