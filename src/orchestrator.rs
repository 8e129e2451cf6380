// Booking orchestrator: walks the provider fallback chain once per view and owns the booking UI state

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{sleep, timeout, Instant},
};
use tracing::{debug, info, warn};

use crate::config::{BookingConfig, TimingConfig};
use crate::dom::{Dom, Node};
use crate::fallback::ContactFallback;
use crate::i18n::Translate;
use crate::integration::{AttemptProvider, CalendarIntegrationService};
use crate::provider::{AttemptError, BookingUiState, EmbedProvider};

// Embeds are only mounted in a browser; server-side renders keep the section idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    #[default]
    Browser,
    Server,
}

pub trait FallbackRenderer: Send + Sync + 'static {
    // Returns whether anything was rendered
    fn render_fallback(&self, container_id: &str) -> bool;
}

// Writes the contact options into the booking container
pub struct ContactFormRenderer<D: Dom> {
    dom: Arc<D>,
    contact: ContactFallback,
    translator: Arc<dyn Translate>,
}

impl<D: Dom> ContactFormRenderer<D> {
    pub fn new(dom: Arc<D>, contact: ContactFallback, translator: Arc<dyn Translate>) -> Self {
        Self {
            dom,
            contact,
            translator,
        }
    }
}

impl<D: Dom> FallbackRenderer for ContactFormRenderer<D> {
    fn render_fallback(&self, container_id: &str) -> bool {
        // the view may already be gone
        if !self.dom.contains(container_id) {
            debug!(container = container_id, "container gone, skipping fallback render");
            return false;
        }

        let markup = self.contact.render(self.translator.as_ref());
        match self.dom.replace_content(container_id, Node::Markup(markup)) {
            Ok(()) => true,
            Err(err) => {
                debug!(container = container_id, error = %err, "fallback render skipped");
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub provider: EmbedProvider,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub error: Option<AttemptError>,
}

#[derive(Debug, Default)]
struct StatsCounters {
    attempts_started: AtomicUsize,
    attempts_failed: AtomicUsize,
    fallback_renders: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorStats {
    pub attempts_started: usize,
    pub attempts_failed: usize,
    pub fallback_renders: usize,
}

pub struct BookingOrchestrator {
    container_id: String,
    timing: TimingConfig,
    platform: Platform,
    attempts: Arc<dyn AttemptProvider>,
    fallback: Arc<dyn FallbackRenderer>,
    state: watch::Sender<BookingUiState>,
    started: AtomicBool,
    history: Mutex<Vec<AttemptRecord>>,
    stats: StatsCounters,
}

impl BookingOrchestrator {
    pub fn new(
        config: &BookingConfig,
        attempts: Arc<dyn AttemptProvider>,
        fallback: Arc<dyn FallbackRenderer>,
        platform: Platform,
    ) -> Self {
        let (state, _) = watch::channel(BookingUiState::Idle);
        Self {
            container_id: config.container_id.clone(),
            timing: config.timing.clone(),
            platform,
            attempts,
            fallback,
            state,
            started: AtomicBool::new(false),
            history: Mutex::new(Vec::new()),
            stats: StatsCounters::default(),
        }
    }

    // Wires the integration service and the contact form renderer onto one document
    pub fn for_document<D: Dom>(
        config: &BookingConfig,
        dom: Arc<D>,
        translator: Arc<dyn Translate>,
        platform: Platform,
    ) -> Self {
        let service = CalendarIntegrationService::new(
            dom.clone(),
            config.providers.clone(),
            config.timing.clone(),
        );
        let renderer = ContactFormRenderer::new(
            dom,
            ContactFallback::new(config.contact.clone(), &config.providers),
            translator,
        );
        Self::new(config, Arc::new(service), Arc::new(renderer), platform)
    }

    pub fn state(&self) -> BookingUiState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BookingUiState> {
        self.state.subscribe()
    }

    pub fn history(&self) -> Vec<AttemptRecord> {
        self.history.lock().clone()
    }

    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            attempts_started: self.stats.attempts_started.load(Ordering::SeqCst),
            attempts_failed: self.stats.attempts_failed.load(Ordering::SeqCst),
            fallback_renders: self.stats.fallback_renders.load(Ordering::SeqCst),
        }
    }

    // Host hook for "view is ready": runs the chain in the background
    pub fn on_view_ready(self: Arc<Self>) -> JoinHandle<BookingUiState> {
        tokio::spawn(async move { self.run().await })
    }

    /// Resolves once the state is `Showing` or `Fallback`. Never resolves on `Platform::Server`.
    pub async fn settled(&self) -> BookingUiState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(BookingUiState::is_terminal).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        settled
    }

    /// Runs the fallback chain. Only the first call attempts anything; later calls return the
    /// current state. Never fails: the worst outcome is `Fallback`.
    pub async fn run(&self) -> BookingUiState {
        if self.platform == Platform::Server {
            debug!(container = %self.container_id, "not a browser, booking embeds skipped");
            return self.state();
        }

        if self.started.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        sleep(self.timing.startup_delay()).await;

        for provider in EmbedProvider::FALLBACK_CHAIN {
            self.state.send_replace(BookingUiState::Attempting(provider));

            match self.attempt(provider).await {
                Ok(shown) => {
                    let state = BookingUiState::Showing(shown);
                    self.state.send_replace(state);
                    info!(provider = %shown, container = %self.container_id, "booking calendar shown");
                    return state;
                }
                Err(err) => {
                    self.stats.attempts_failed.fetch_add(1, Ordering::SeqCst);
                    warn!(%provider, error = %err, "booking provider failed, moving on");
                }
            }
        }

        self.enter_fallback()
    }

    async fn attempt(&self, provider: EmbedProvider) -> Result<EmbedProvider, AttemptError> {
        self.stats.attempts_started.fetch_add(1, Ordering::SeqCst);
        let started_at = Utc::now();
        let clock = Instant::now();

        let pending = self.attempts.attempt_provider(provider, &self.container_id);
        let outcome = match timeout(self.timing.attempt_deadline(), pending).await {
            // a success reported for some other provider does not count for this one
            Ok(Ok(result)) if result.provider != provider => {
                Err(AttemptError::ProviderLoadFailed {
                    provider,
                    reason: format!("adapter answered for {}", result.provider),
                })
            }
            Ok(Ok(result)) => result.into_outcome(),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(AttemptError::ProviderLoadTimedOut {
                provider,
                after_ms: self.timing.attempt_deadline_ms,
            }),
        };

        self.history.lock().push(AttemptRecord {
            provider,
            started_at,
            elapsed: clock.elapsed(),
            error: outcome.as_ref().err().cloned(),
        });

        outcome
    }

    fn enter_fallback(&self) -> BookingUiState {
        if self.fallback.render_fallback(&self.container_id) {
            self.stats.fallback_renders.fetch_add(1, Ordering::SeqCst);
        }
        self.state.send_replace(BookingUiState::Fallback);
        info!(container = %self.container_id, "no booking provider available, showing contact options");
        BookingUiState::Fallback
    }
}
