use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use crate::ratio::{AiRatio, Split};

/// One `commit-watcher-cache/<repo>/<hash>.json` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherCommit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_changes: Option<Vec<FileChange>>,

    // Injected totals
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_lines_added: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub human_lines_added: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_lines_added: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injected_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A per-file entry of `fileChanges`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// Addition markers recorded by the extension. Only the count matters here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additions: Option<Vec<Value>>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_lines_added: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub human_lines_added: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_percentage: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileChange {
    pub fn additions_count(&self) -> u64 {
        self.additions.as_ref().map_or(0, |a| a.len() as u64)
    }
}

impl WatcherCommit {
    pub fn file_changes(&self) -> &[FileChange] {
        self.file_changes.as_deref().unwrap_or_default()
    }

    /// Total addition markers across all files.
    pub fn total_additions(&self) -> u64 {
        self.file_changes().iter().map(FileChange::additions_count).sum()
    }

    /// `commitDate`, falling back to `authorDate` when the former is absent.
    pub fn effective_date(&self) -> Option<&str> {
        self.commit_date
            .as_deref()
            .or(self.author_date.as_deref())
    }

    /// True when the record's calendar date is on or after `since`.
    /// Records without a parseable date never match.
    pub fn committed_since(&self, since: NaiveDate) -> bool {
        self.effective_date()
            .filter(|d| !d.is_empty())
            .and_then(parse_commit_date)
            .is_some_and(|date| date >= since)
    }

    /// Rewrites per-file and record-level AI/human counts.
    ///
    /// Counts derive from the length of each `additions` list, which is never
    /// modified, so re-running with the same ratio yields the same values.
    pub fn inject(&mut self, ratio: AiRatio, now: DateTime<Utc>) -> Split {
        let mut totals = Split::default();

        for change in self.file_changes.iter_mut().flatten() {
            let split = ratio.split(change.additions_count());
            change.ai_lines_added = Some(split.ai);
            change.human_lines_added = Some(split.human);
            change.ai_percentage = Some(ratio.percentage());
            totals = totals + split;
        }

        self.ai_lines_added = Some(totals.ai);
        self.human_lines_added = Some(totals.human);
        self.total_lines_added = Some(totals.total());
        self.ai_percentage = Some(ratio.percentage());
        self.injected_at = Some(now.to_rfc3339_opts(SecondsFormat::Micros, true));

        totals
    }
}

/// Parses the date formats the extension writes into a calendar date.
///
/// Offset-aware timestamps keep their own offset's date.
pub fn parse_commit_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
