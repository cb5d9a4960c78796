use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use crate::ratio::{AiRatio, Split};

/// One CodeBlend `repo/<repo>/commits/<hash>.json` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendCommit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_changed: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub ai: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub human: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_commit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<BlendFile>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendFile {
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_changed: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub ai: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub human: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_percentage: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BlendCommit {
    pub fn total_changed(&self) -> u64 {
        self.total_changed.unwrap_or(0)
    }

    /// AI share as stored in the record, 0 for an empty commit.
    pub fn stored_ai_percentage(&self) -> f64 {
        match self.total_changed() {
            0 => 0.0,
            total => self.ai.unwrap_or(0) as f64 / total as f64 * 100.0,
        }
    }

    /// Rewrites the commit and its files as `ratio` AI.
    ///
    /// Returns `None` without touching anything when `totalChanged` is 0.
    pub fn patch(&mut self, ratio: AiRatio) -> Option<Split> {
        let total = self.total_changed();
        if total == 0 {
            return None;
        }

        let split = ratio.split(total);
        self.ai = Some(split.ai);
        self.human = Some(split.human);
        self.ai_commit = Some(true);

        for file in self.files.iter_mut().flatten() {
            let file_split = ratio.split(file.total_changed.unwrap_or(0));
            file.ai = Some(file_split.ai);
            file.human = Some(file_split.human);
            file.ai_percentage = Some(ratio.percentage());
        }

        Some(split)
    }
}
