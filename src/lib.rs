// Booking section of the marketing site: calendar embeds with a provider fallback chain

pub mod config;
pub mod dom;
pub mod fallback;
pub mod i18n;
pub mod integration;
pub mod orchestrator;
pub mod provider;

// Re-export key types for convenience
pub use config::{BookingConfig, ConfigError, ContactConfig, ProviderConfig, TimingConfig};
pub use dom::{Dom, DomError, FrameEvent, MemoryDocument, Node};
pub use fallback::{ContactAction, ContactFallback};
pub use i18n::{Catalog, Language, Translate};
pub use integration::{AttemptProvider, CalendarIntegrationService};
pub use orchestrator::{
    AttemptRecord, BookingOrchestrator, ContactFormRenderer, FallbackRenderer, OrchestratorStats,
    Platform,
};
pub use provider::{
    AttemptError, BookingUiState, CalendarProvider, EmbedProvider, LoadAttemptResult,
};
