use std::env;
use std::time::Duration;

use crate::error::TrainerError;

/// Delays between the scripted steps of a drill.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrillTimings {
    /// Narrative pause before the blunder on the very first run
    pub mistake_first: Duration,
    /// Same pause on every later run
    pub mistake_repeat: Duration,
    pub opponent_reply: Duration,
    /// How long a wrong move's target square flashes before the correction
    pub error_flash: Duration,
    /// How long the correction stays on the board before it is reverted
    pub correction_hold: Duration,
    pub next_variation: Duration,
    pub clean_run_restart: Duration,
}

impl Default for DrillTimings {
    fn default() -> Self {
        Self {
            mistake_first: Duration::from_millis(1200),
            mistake_repeat: Duration::from_millis(500),
            opponent_reply: Duration::from_millis(600),
            error_flash: Duration::from_millis(600),
            correction_hold: Duration::from_millis(1500),
            next_variation: Duration::from_millis(1500),
            clean_run_restart: Duration::from_millis(2000),
        }
    }
}

impl DrillTimings {
    /// Every delay zero. Steps still go through the scheduler.
    pub fn instant() -> Self {
        Self {
            mistake_first: Duration::ZERO,
            mistake_repeat: Duration::ZERO,
            opponent_reply: Duration::ZERO,
            error_flash: Duration::ZERO,
            correction_hold: Duration::ZERO,
            next_variation: Duration::ZERO,
            clean_run_restart: Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrainerConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub http_timeout: Duration,
    /// Fixed seed for the deep-mode shuffle
    pub seed: Option<u64>,
    pub timings: DrillTimings,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            api_token: None,
            http_timeout: Duration::from_secs(30),
            seed: None,
            timings: DrillTimings::default(),
        }
    }
}

impl TrainerConfig {
    pub fn from_env() -> Result<Self, TrainerError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, TrainerError> {
        let defaults = DrillTimings::default();
        let millis = |key: &str, default: Duration| {
            var(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        let api_url = var("TRAINER_API_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(TrainerError::Config(format!(
                "TRAINER_API_URL must be an http(s) URL, got {api_url:?}"
            )));
        }

        Ok(Self {
            api_url,
            api_token: var("TRAINER_API_TOKEN").filter(|t| !t.trim().is_empty()),
            http_timeout: var("TRAINER_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(30)),
            seed: var("TRAINER_SEED").and_then(|v| v.trim().parse().ok()),
            timings: DrillTimings {
                mistake_first: millis("TRAINER_MISTAKE_DELAY_MS", defaults.mistake_first),
                mistake_repeat: millis("TRAINER_MISTAKE_REPEAT_DELAY_MS", defaults.mistake_repeat),
                opponent_reply: millis("TRAINER_OPPONENT_DELAY_MS", defaults.opponent_reply),
                error_flash: millis("TRAINER_ERROR_FLASH_MS", defaults.error_flash),
                correction_hold: millis("TRAINER_CORRECTION_HOLD_MS", defaults.correction_hold),
                next_variation: millis("TRAINER_NEXT_VARIATION_DELAY_MS", defaults.next_variation),
                clean_run_restart: millis("TRAINER_CLEAN_RUN_DELAY_MS", defaults.clean_run_restart),
            },
        })
    }
}
