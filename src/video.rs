//! Citizen video submissions and the admin verdict on each one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::{CourtError, Result};
use crate::models::{lenient_int, lenient_opt_text, lenient_text, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoVerdict {
    #[default]
    Pending,
    Like,
    Dislike,
}

impl VideoVerdict {
    pub const ALL: [VideoVerdict; 3] = [
        VideoVerdict::Pending,
        VideoVerdict::Like,
        VideoVerdict::Dislike,
    ];

    pub fn code(self) -> &'static str {
        match self {
            VideoVerdict::Pending => "PENDING",
            VideoVerdict::Like => "LIKE",
            VideoVerdict::Dislike => "DISLIKE",
        }
    }

    pub fn parse_lenient(value: &str) -> Option<VideoVerdict> {
        let value = value.trim();
        VideoVerdict::ALL
            .into_iter()
            .find(|verdict| value.eq_ignore_ascii_case(verdict.code()))
    }
}

impl fmt::Display for VideoVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for VideoVerdict {
    type Err = CourtError;

    fn from_str(value: &str) -> Result<Self> {
        VideoVerdict::parse_lenient(value)
            .ok_or_else(|| CourtError::InvalidInput(format!("Invalid video feedback: {value}")))
    }
}

impl<'de> Deserialize<'de> for VideoVerdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Option::<Scalar>::deserialize(deserializer)?
            .and_then(Scalar::into_text)
            .and_then(|text| VideoVerdict::parse_lenient(&text))
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoFeedback {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub user_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub video_file: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub admin_feedback: VideoVerdict,
    #[serde(default, deserialize_with = "lenient_text")]
    pub admin_remarks: String,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub reviewed_by_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub reviewed_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub submitted_date: Option<String>,
}

/// Records an admin verdict. Only LIKE or DISLIKE may be submitted; the
/// remarks always replace the previous ones, blank included.
pub fn review_video<'a>(
    videos: &'a mut [VideoFeedback],
    id: i64,
    verdict: VideoVerdict,
    remarks: &str,
    reviewer: &str,
    reviewed_at: &str,
) -> Result<&'a VideoFeedback> {
    if verdict == VideoVerdict::Pending {
        return Err(CourtError::InvalidInput(
            "Invalid feedback. Must be LIKE or DISLIKE".to_string(),
        ));
    }
    let video = videos
        .iter_mut()
        .find(|video| video.id == Some(id))
        .ok_or_else(|| CourtError::InvalidInput(format!("No video with id {id}")))?;

    video.admin_feedback = verdict;
    video.admin_remarks = remarks.to_string();
    video.reviewed_by_name = Some(reviewer.to_string()).filter(|name| !name.trim().is_empty());
    video.reviewed_at = Some(reviewed_at.to_string());
    info!(id, verdict = verdict.code(), "video reviewed");
    Ok(video)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VideoFeedbackStats {
    pub total: usize,
    pub pending: usize,
    pub liked: usize,
    pub disliked: usize,
}

pub fn video_feedback_stats(videos: &[VideoFeedback]) -> VideoFeedbackStats {
    videos
        .iter()
        .fold(VideoFeedbackStats::default(), |mut stats, video| {
            stats.total += 1;
            match video.admin_feedback {
                VideoVerdict::Pending => stats.pending += 1,
                VideoVerdict::Like => stats.liked += 1,
                VideoVerdict::Dislike => stats.disliked += 1,
            }
            stats
        })
}

/// Verdict filter plus a case-insensitive search over submitter and title.
pub fn filter_videos<'a>(
    videos: &'a [VideoFeedback],
    verdict: Option<VideoVerdict>,
    term: &str,
) -> Vec<&'a VideoFeedback> {
    let term = term.trim().to_lowercase();
    videos
        .iter()
        .filter(|video| verdict.map_or(true, |verdict| video.admin_feedback == verdict))
        .filter(|video| {
            term.is_empty()
                || video.user_name.to_lowercase().contains(&term)
                || video.title.to_lowercase().contains(&term)
        })
        .collect()
}
