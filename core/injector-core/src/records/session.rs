use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use crate::config::CHARS_PER_LINE;
use crate::ratio::AiRatio;

/// One `claudecode-cache/<session-id>.json` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaudeSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SessionMetrics>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    #[serde(default, deserialize_with = "lenient::count")]
    pub lines_generated: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub chars_generated: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_added_by_file: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Before/after line counts of a session injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInjection {
    pub previous_lines: u64,
    pub lines: u64,
    pub chars: u64,
}

impl ClaudeSession {
    pub fn lines_generated(&self) -> u64 {
        self.metrics.as_ref().map_or(0, |m| m.lines_generated)
    }

    pub fn chars_generated(&self) -> u64 {
        self.metrics.as_ref().map_or(0, |m| m.chars_generated)
    }

    pub fn files_touched(&self) -> usize {
        self.metrics
            .as_ref()
            .and_then(|m| m.lines_added_by_file.as_ref())
            .map_or(0, |files| files.len())
    }

    /// Overwrites the generated line and character counts.
    ///
    /// `linesGenerated` becomes `floor(total_lines * r)` and `charsGenerated`
    /// that value times [`CHARS_PER_LINE`], saturating at `u64::MAX`.
    /// Previous values are discarded.
    pub fn inject(&mut self, total_lines: u64, ratio: AiRatio) -> SessionInjection {
        let previous_lines = self.lines_generated();
        let lines = ratio.ai_count(total_lines);
        let chars = lines.saturating_mul(CHARS_PER_LINE);

        let metrics = self.metrics.get_or_insert_with(SessionMetrics::default);
        metrics.lines_generated = lines;
        metrics.chars_generated = chars;

        SessionInjection {
            previous_lines,
            lines,
            chars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inject_scenario() {
        let mut session: ClaudeSession = serde_json::from_value(json!({
            "sessionId": "abc",
            "metrics": {"linesGenerated": 10, "charsGenerated": 450}
        }))
        .unwrap();

        let change = session.inject(1000, AiRatio::new(0.95).unwrap());

        assert_eq!(change.previous_lines, 10);
        assert_eq!(session.lines_generated(), 950);
        assert_eq!(session.chars_generated(), 42750);
    }

    #[test]
    fn test_null_and_float_counts_are_accepted() {
        let mut session: ClaudeSession = serde_json::from_value(json!({
            "sessionId": "s",
            "metrics": {"linesGenerated": null, "charsGenerated": 450}
        }))
        .unwrap();
        assert_eq!(session.lines_generated(), 0);
        assert_eq!(session.chars_generated(), 450);

        let change = session.inject(100, AiRatio::new(0.5).unwrap());
        assert_eq!(change.previous_lines, 0);
        assert_eq!(session.lines_generated(), 50);

        let session: ClaudeSession =
            serde_json::from_value(json!({"metrics": {"linesGenerated": 12.0}})).unwrap();
        assert_eq!(session.lines_generated(), 12);
    }

    #[test]
    fn test_inject_huge_line_count_saturates_chars() {
        let mut session = ClaudeSession::default();
        let change = session.inject(u64::MAX / 2, AiRatio::new(1.0).unwrap());

        assert!(change.lines > u64::MAX / CHARS_PER_LINE);
        assert_eq!(change.chars, u64::MAX);
        assert_eq!(session.chars_generated(), u64::MAX);
    }

    #[test]
    fn test_missing_metrics_default_to_zero() {
        let session: ClaudeSession = serde_json::from_value(json!({"sessionId": "x"})).unwrap();
        assert_eq!(session.lines_generated(), 0);
        assert_eq!(session.chars_generated(), 0);
        assert_eq!(session.files_touched(), 0);
    }

    #[test]
    fn test_inject_creates_metrics_and_keeps_unknown_fields() {
        let mut session: ClaudeSession =
            serde_json::from_value(json!({"model": "opus", "turns": 3})).unwrap();
        session.inject(200, AiRatio::new(0.5).unwrap());

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "opus",
                "turns": 3,
                "metrics": {"linesGenerated": 100, "charsGenerated": 4500}
            })
        );
    }

    #[test]
    fn test_files_touched_counts_entries() {
        let session: ClaudeSession = serde_json::from_value(json!({
            "metrics": {
                "linesAddedByFile": {"/a.rs": 3, "/b.rs": 5},
                "tokens": 77
            }
        }))
        .unwrap();
        assert_eq!(session.files_touched(), 2);

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["metrics"]["tokens"], 77);
    }
}
