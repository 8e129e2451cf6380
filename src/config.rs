// Booking configuration: container, timing budgets, provider endpoints and contact templates

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    pub container_id: String,
    pub timing: TimingConfig,
    pub providers: ProviderConfig,
    pub contact: ContactConfig,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            container_id: "cal-iframe-container".to_string(),
            timing: TimingConfig::default(),
            providers: ProviderConfig::default(),
            contact: ContactConfig::default(),
        }
    }
}

impl BookingConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BookingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.container_id.trim().is_empty() {
            return Err(ConfigError::Invalid("container_id is empty".to_string()));
        }

        let timeouts = [
            ("iframe_timeout_ms", self.timing.iframe_timeout_ms),
            (
                "script_render_timeout_ms",
                self.timing.script_render_timeout_ms,
            ),
            ("attempt_deadline_ms", self.timing.attempt_deadline_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }

        if self.providers.cal_link.trim().is_empty() {
            return Err(ConfigError::Invalid("cal_link is empty".to_string()));
        }
        if self.providers.calendly_url.trim().is_empty() {
            return Err(ConfigError::Invalid("calendly_url is empty".to_string()));
        }

        Ok(())
    }
}

// Timer budgets, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    // Gives the host view time to mount the container before the first attempt
    pub startup_delay_ms: u64,
    pub iframe_timeout_ms: u64,
    pub script_render_timeout_ms: u64,
    // Upper bound the orchestrator puts on any single attempt
    pub attempt_deadline_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: 1000,
            iframe_timeout_ms: 6000,
            script_render_timeout_ms: 5000,
            attempt_deadline_ms: 10000,
        }
    }
}

impl TimingConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn iframe_timeout(&self) -> Duration {
        Duration::from_millis(self.iframe_timeout_ms)
    }

    pub fn script_render_timeout(&self) -> Duration {
        Duration::from_millis(self.script_render_timeout_ms)
    }

    pub fn attempt_deadline(&self) -> Duration {
        Duration::from_millis(self.attempt_deadline_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    // Cal.com booking-link slug, `<user>/<event>`
    pub cal_link: String,
    pub cal_origin: String,
    pub cal_embed_script: String,
    pub cal_namespace: String,
    pub calendly_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            cal_link: "argentino-luca/30min".to_string(),
            cal_origin: "https://app.cal.com".to_string(),
            cal_embed_script: "https://app.cal.com/embed/embed.js".to_string(),
            cal_namespace: "30min".to_string(),
            calendly_url: "https://calendly.com/ait-labs/30min".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Hosted Cal.com booking page for the configured link.
    pub fn calcom_public_url(&self) -> String {
        format!("https://cal.com/{}", self.cal_link.trim_matches('/'))
    }

    pub fn cal_mount_id(&self) -> String {
        format!("my-cal-inline-{}", self.cal_namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    pub email: String,
    pub email_subject: String,
    pub email_body: String,
    pub whatsapp_number: String,
    pub whatsapp_message: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            email: "office@ait-labs.com".to_string(),
            email_subject: "Free AI Consultation Request".to_string(),
            email_body: "Hi AIT LABS team,\n\nI would like to schedule a free 30-minute consultation to discuss how AI can help my business.\n\nPlease let me know your available times.\n\nBest regards".to_string(),
            whatsapp_number: "41123456789".to_string(),
            whatsapp_message: "Hi AIT LABS, I would like to schedule a free consultation about AI solutions for my business.".to_string(),
        }
    }
}
