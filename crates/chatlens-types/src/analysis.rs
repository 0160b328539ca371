use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::room::Watermark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Comprehensive,
    Sentiment,
    Keywords,
    Topics,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 4] = [
        AnalysisType::Comprehensive,
        AnalysisType::Sentiment,
        AnalysisType::Keywords,
        AnalysisType::Topics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Comprehensive => "comprehensive",
            AnalysisType::Sentiment => "sentiment",
            AnalysisType::Keywords => "keywords",
            AnalysisType::Topics => "topics",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAnalysisTypeError(pub String);

impl fmt::Display for ParseAnalysisTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown analysis type: {}", self.0)
    }
}

impl std::error::Error for ParseAnalysisTypeError {}

impl FromStr for AnalysisType {
    type Err = ParseAnalysisTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseAnalysisTypeError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Succeeded | AnalysisStatus::Failed)
    }
}

/// Why an analysis request ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    Auth,
    Network,
    Timeout,
    ProviderRejected,
    InvalidInput,
    Cancelled,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Auth => "auth",
            FailureReason::Network => "network",
            FailureReason::Timeout => "timeout",
            FailureReason::ProviderRejected => "provider-rejected",
            FailureReason::InvalidInput => "invalid-input",
            FailureReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis attempt. History is append-only: a new submit always
/// creates a new record.
///
/// Transition methods return `false` without touching the record when the
/// transition is not allowed from the current status, so a late provider
/// response cannot overwrite a cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub id: String,
    pub room_id: String,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub status: AnalysisStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Room state the analysis was run against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<Watermark>,
}

impl AnalysisRequest {
    pub fn new(room_id: impl Into<String>, analysis_type: AnalysisType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.into(),
            analysis_type,
            status: AnalysisStatus::Pending,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result_text: None,
            error_reason: None,
            error_detail: None,
            watermark: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending → Running
    pub fn start(&mut self, watermark: Watermark) -> bool {
        if self.status != AnalysisStatus::Pending {
            return false;
        }
        self.status = AnalysisStatus::Running;
        self.started_at = Some(Utc::now());
        self.watermark = Some(watermark);
        true
    }

    /// Running → Succeeded
    pub fn succeed(&mut self, result_text: impl Into<String>) -> bool {
        if self.status != AnalysisStatus::Running {
            return false;
        }
        self.status = AnalysisStatus::Succeeded;
        self.result_text = Some(result_text.into());
        self.completed_at = Some(Utc::now());
        true
    }

    /// Pending | Running → Failed
    pub fn fail(&mut self, reason: FailureReason, detail: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = AnalysisStatus::Failed;
        self.error_reason = Some(reason);
        self.error_detail = Some(detail.into());
        self.completed_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_type_from_str() {
        assert_eq!("sentiment".parse::<AnalysisType>().unwrap(), AnalysisType::Sentiment);
        assert_eq!(" Topics ".parse::<AnalysisType>().unwrap(), AnalysisType::Topics);
        assert!("summary".parse::<AnalysisType>().is_err());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut request = AnalysisRequest::new("room-1", AnalysisType::Keywords);
        assert_eq!(request.status, AnalysisStatus::Pending);

        assert!(request.start(Watermark::default()));
        assert_eq!(request.status, AnalysisStatus::Running);
        assert!(request.started_at.is_some());

        assert!(request.succeed("done"));
        assert_eq!(request.status, AnalysisStatus::Succeeded);
        assert_eq!(request.result_text.as_deref(), Some("done"));
        assert!(request.completed_at.is_some());
    }

    #[test]
    fn test_late_success_does_not_overwrite_cancellation() {
        let mut request = AnalysisRequest::new("room-1", AnalysisType::Topics);
        request.start(Watermark::default());

        assert!(request.fail(FailureReason::Cancelled, "cancelled by caller"));
        assert!(!request.succeed("too late"));
        assert_eq!(request.status, AnalysisStatus::Failed);
        assert_eq!(request.error_reason, Some(FailureReason::Cancelled));
        assert!(request.result_text.is_none());
    }

    #[test]
    fn test_succeed_requires_running() {
        let mut request = AnalysisRequest::new("room-1", AnalysisType::Sentiment);
        assert!(!request.succeed("skipped start"));
        assert_eq!(request.status, AnalysisStatus::Pending);
    }

    #[test]
    fn test_failure_reason_serializes_kebab_case() {
        let json = serde_json::to_string(&FailureReason::ProviderRejected).unwrap();
        assert_eq!(json, "\"provider-rejected\"");
        assert_eq!(FailureReason::InvalidInput.to_string(), "invalid-input");
    }
}
