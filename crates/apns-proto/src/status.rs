//! Well-known gateway status codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status bytes the gateway reports in error-response frames.
///
/// The wire carries a raw byte; this enum names the documented values.
/// Unlisted bytes are still surfaced verbatim by the connection layer;
/// this type is for display and matching, not a validity filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    /// No errors encountered.
    NoErrors,
    /// Processing error.
    ProcessingError,
    /// Missing device token.
    MissingDeviceToken,
    /// Missing topic.
    MissingTopic,
    /// Missing payload.
    MissingPayload,
    /// Invalid token size.
    InvalidTokenSize,
    /// Invalid topic size.
    InvalidTopicSize,
    /// Invalid payload size.
    InvalidPayloadSize,
    /// Invalid token.
    InvalidToken,
    /// The gateway is shutting down.
    Shutdown,
    /// None / unknown.
    Unknown,
}

impl ErrorStatus {
    /// Name a documented status byte, if it is one.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::NoErrors),
            1 => Some(Self::ProcessingError),
            2 => Some(Self::MissingDeviceToken),
            3 => Some(Self::MissingTopic),
            4 => Some(Self::MissingPayload),
            5 => Some(Self::InvalidTokenSize),
            6 => Some(Self::InvalidTopicSize),
            7 => Some(Self::InvalidPayloadSize),
            8 => Some(Self::InvalidToken),
            10 => Some(Self::Shutdown),
            255 => Some(Self::Unknown),
            _ => None,
        }
    }

    /// The wire byte for this status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::NoErrors => 0,
            Self::ProcessingError => 1,
            Self::MissingDeviceToken => 2,
            Self::MissingTopic => 3,
            Self::MissingPayload => 4,
            Self::InvalidTokenSize => 5,
            Self::InvalidTopicSize => 6,
            Self::InvalidPayloadSize => 7,
            Self::InvalidToken => 8,
            Self::Shutdown => 10,
            Self::Unknown => 255,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NoErrors => "no errors encountered",
            Self::ProcessingError => "processing error",
            Self::MissingDeviceToken => "missing device token",
            Self::MissingTopic => "missing topic",
            Self::MissingPayload => "missing payload",
            Self::InvalidTokenSize => "invalid token size",
            Self::InvalidTopicSize => "invalid topic size",
            Self::InvalidPayloadSize => "invalid payload size",
            Self::InvalidToken => "invalid token",
            Self::Shutdown => "shutdown",
            Self::Unknown => "none (unknown)",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping_roundtrips() {
        for code in [0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 255] {
            let status = ErrorStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn undocumented_codes_have_no_name() {
        assert_eq!(ErrorStatus::from_code(9), None);
        assert_eq!(ErrorStatus::from_code(42), None);
    }

    #[test]
    fn displays_description() {
        assert_eq!(ErrorStatus::InvalidToken.to_string(), "invalid token");
    }
}
