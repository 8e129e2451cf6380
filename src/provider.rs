// Booking providers, attempt results and the UI state exposed to views

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Providers that can actually be mounted into the booking container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedProvider {
    CalCom,
    Calendly,
}

impl EmbedProvider {
    /// Order in which providers are attempted. Calendly only runs after Cal.com failed.
    pub const FALLBACK_CHAIN: [EmbedProvider; 2] = [EmbedProvider::CalCom, EmbedProvider::Calendly];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedProvider::CalCom => "calcom",
            EmbedProvider::Calendly => "calendly",
        }
    }
}

impl fmt::Display for EmbedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Which booking path is active or was last attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarProvider {
    CalCom,
    Calendly,
    Fallback,
}

impl CalendarProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarProvider::CalCom => "calcom",
            CalendarProvider::Calendly => "calendly",
            CalendarProvider::Fallback => "fallback",
        }
    }
}

impl From<EmbedProvider> for CalendarProvider {
    fn from(provider: EmbedProvider) -> Self {
        match provider {
            EmbedProvider::CalCom => CalendarProvider::CalCom,
            EmbedProvider::Calendly => CalendarProvider::Calendly,
        }
    }
}

impl fmt::Display for CalendarProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("Container {0} not found")]
    ContainerNotFound(String),

    #[error("{provider} embed did not render: {reason}")]
    ProviderLoadFailed {
        provider: EmbedProvider,
        reason: String,
    },

    #[error("{provider} embed timed out after {after_ms}ms")]
    ProviderLoadTimedOut {
        provider: EmbedProvider,
        after_ms: u64,
    },
}

/// Outcome of mounting one provider into a caller-owned container.
///
/// `container` borrows the id the caller passed in; the result never owns the mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAttemptResult<'a> {
    pub success: bool,
    pub provider: EmbedProvider,
    pub container: &'a str,
    pub failure: Option<AttemptError>,
}

impl<'a> LoadAttemptResult<'a> {
    pub fn loaded(provider: EmbedProvider, container: &'a str) -> Self {
        Self {
            success: true,
            provider,
            container,
            failure: None,
        }
    }

    pub fn failed(provider: EmbedProvider, container: &'a str, failure: AttemptError) -> Self {
        Self {
            success: false,
            provider,
            container,
            failure: Some(failure),
        }
    }

    // A bare `success = false` from an adapter that gave no reason is still a load failure
    pub fn into_outcome(self) -> Result<EmbedProvider, AttemptError> {
        if self.success {
            return Ok(self.provider);
        }

        Err(self.failure.unwrap_or(AttemptError::ProviderLoadFailed {
            provider: self.provider,
            reason: "embed reported failure".to_string(),
        }))
    }
}

// Externally observable booking state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "provider", rename_all = "lowercase")]
pub enum BookingUiState {
    #[default]
    Idle,
    Attempting(EmbedProvider),
    Showing(EmbedProvider),
    Fallback,
}

impl BookingUiState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingUiState::Showing(_) | BookingUiState::Fallback)
    }

    pub fn provider(&self) -> Option<CalendarProvider> {
        match self {
            BookingUiState::Idle => None,
            BookingUiState::Attempting(p) | BookingUiState::Showing(p) => Some((*p).into()),
            BookingUiState::Fallback => Some(CalendarProvider::Fallback),
        }
    }

    pub fn shows_calendar(&self) -> bool {
        matches!(self, BookingUiState::Showing(_))
    }

    pub fn shows_fallback(&self) -> bool {
        matches!(self, BookingUiState::Fallback)
    }
}
