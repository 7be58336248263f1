//! Recording queue and pipeline states.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a recording in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    /// Waiting to be processed
    Pending,

    /// Picked up by the extraction pipeline
    Processing,

    /// Transcribed and extracted
    Completed,

    /// Processing failed (retryable)
    Failed,
}

impl RecordingStatus {
    /// Whether the queue accepts a move from `self` to `to`
    pub fn can_transition_to(self, to: RecordingStatus) -> bool {
        use RecordingStatus::*;
        matches!(
            (self, to),
            (Pending, Processing) | (Processing, Completed) | (Processing, Failed) | (Failed, Pending)
        )
    }

    /// Completed and Failed carry a `processed_at` stamp
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" | "done" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown recording status: {}", other)),
        }
    }
}

/// Fine-grained stage of one item inside the extraction pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Pending,
    Transcribing,
    Extracting,
    Completed,
    Failed,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Transcribing => "transcribing",
            Self::Extracting => "extracting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RecordingStatus::*;

    #[test]
    fn test_valid_transitions() {
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Completed".parse::<RecordingStatus>().unwrap(), Completed);
        assert_eq!("done".parse::<RecordingStatus>().unwrap(), Completed);
        assert!("archived".parse::<RecordingStatus>().is_err());
    }
}
