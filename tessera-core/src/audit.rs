//! Outbound message audit log
//!
//! Every attempt to deliver a message produces exactly one [`DispatchRecord`],
//! whether the transport delivered it, failed, or delivery was switched off.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What kind of message was dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    VerificationCode,
    Notice,
}

impl DispatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchKind::VerificationCode => "verification_code",
            DispatchKind::Notice => "notice",
        }
    }
}

impl std::fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DispatchKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verification_code" => Ok(DispatchKind::VerificationCode),
            "notice" => Ok(DispatchKind::Notice),
            other => Err(ValidationError::InvalidField(format!(
                "Unknown dispatch kind: {other}"
            ))),
        }
    }
}

/// Outcome of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// The transport accepted the message.
    Sent,
    /// The transport was asked and refused or errored.
    Failed,
    /// Delivery is switched off; nothing left the process.
    Disabled,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Sent => "sent",
            DispatchStatus::Failed => "failed",
            DispatchStatus::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DispatchStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DispatchStatus::Sent),
            "failed" => Ok(DispatchStatus::Failed),
            "disabled" => Ok(DispatchStatus::Disabled),
            other => Err(ValidationError::InvalidField(format!(
                "Unknown dispatch status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub id: i64,
    pub recipient: String,
    pub kind: DispatchKind,
    pub subject: String,
    pub status: DispatchStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDispatchRecord {
    pub recipient: String,
    pub kind: DispatchKind,
    pub subject: String,
    pub status: DispatchStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_its_own_text() {
        for status in [
            DispatchStatus::Sent,
            DispatchStatus::Failed,
            DispatchStatus::Disabled,
        ] {
            assert_eq!(status.as_str().parse::<DispatchStatus>().unwrap(), status);
        }
        assert!("bounced".parse::<DispatchStatus>().is_err());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&DispatchKind::VerificationCode).unwrap();
        assert_eq!(json, "\"verification_code\"");
        assert_eq!("notice".parse::<DispatchKind>().unwrap(), DispatchKind::Notice);
    }
}
