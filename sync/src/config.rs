//! Environment-driven configuration.
//!
//! `FRONTDESK_BACKEND_URL`, `FRONTDESK_SALON_ID`, and `FRONTDESK_FEED_URL`
//! are required; everything else has a production default. Values are read
//! once at startup; nothing re-reads the environment afterwards.

use frontdesk_channel::ReconnectPolicy;
use frontdesk_client::BackendClient;
use frontdesk_core::{BranchId, SalonId, SlotError, SlotGrid};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::engine::EngineOptions;

/// A configuration value that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    /// A variable is set but does not parse.
    #[error("environment variable {name} has unusable value {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The raw value found.
        value: String,
    },
    /// The grid bounds do not form a usable day.
    #[error("booking grid configuration: {0}")]
    Grid(#[from] SlotError),
}

/// Where the salon backend lives and how to identify against it.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// REST base URL.
    pub base_url: String,
    /// Salon every request is scoped to.
    pub salon: SalonId,
    /// Branch scope, when the salon has more than one.
    pub branch: Option<BranchId>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl BackendConfig {
    /// HTTP client configured from this section.
    #[must_use]
    pub fn client(&self) -> BackendClient {
        let client = BackendClient::new(&self.base_url, self.salon.clone())
            .with_timeout(self.request_timeout);
        match &self.branch {
            Some(branch) => client.with_branch(branch.clone()),
            None => client,
        }
    }
}

/// Push-feed connection settings.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Feed endpoint URL.
    pub feed_url: String,
    /// Recycle a connection with no traffic for this long.
    pub idle_timeout: Duration,
    /// Budget for establishing a connection.
    pub connect_timeout: Duration,
    /// Reconnect pacing and attempt budget.
    pub policy: ReconnectPolicy,
}

/// Booking grid and salon-local time settings.
#[derive(Debug, Clone, Copy)]
pub struct GridConfig {
    /// The daily booking grid.
    pub grid: SlotGrid,
    /// Minutes east of UTC the salon's wall clock runs.
    pub utc_offset_minutes: i32,
}

/// Reconciler knobs.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Page size for the list views.
    pub view_page_size: u32,
    /// Page size for the statistics sweep.
    pub sweep_page_size: u32,
    /// How long shutdown waits for the reconciler to drain.
    pub drain_timeout: Duration,
}

/// Full configuration of one dashboard session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend REST settings.
    pub backend: BackendConfig,
    /// Push-feed settings.
    pub channel: ChannelConfig,
    /// Grid and local-time settings.
    pub grid: GridConfig,
    /// Reconciler settings.
    pub sync: SyncConfig,
}

impl Config {
    /// Loads configuration from `FRONTDESK_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when a required variable is missing, a value does
    /// not parse, or the grid bounds are unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = BackendConfig {
            base_url: required("FRONTDESK_BACKEND_URL")?,
            salon: SalonId::new(required("FRONTDESK_SALON_ID")?),
            branch: optional("FRONTDESK_BRANCH_ID").map(BranchId::new),
            request_timeout: Duration::from_secs(parsed("FRONTDESK_REQUEST_TIMEOUT_SECS", 10)?),
        };
        let channel = ChannelConfig {
            feed_url: required("FRONTDESK_FEED_URL")?,
            idle_timeout: Duration::from_secs(parsed("FRONTDESK_IDLE_TIMEOUT_SECS", 45)?),
            connect_timeout: Duration::from_secs(parsed("FRONTDESK_CONNECT_TIMEOUT_SECS", 10)?),
            policy: ReconnectPolicy::default()
                .with_max_attempts(parsed("FRONTDESK_MAX_RECONNECT_ATTEMPTS", 6)?)
                .with_initial_delay(Duration::from_millis(parsed(
                    "FRONTDESK_RECONNECT_INITIAL_DELAY_MS",
                    1_000,
                )?))
                .with_max_delay(Duration::from_secs(parsed(
                    "FRONTDESK_RECONNECT_MAX_DELAY_SECS",
                    30,
                )?)),
        };
        let grid = GridConfig {
            grid: SlotGrid::new(
                parsed("FRONTDESK_OPEN_MINUTE", 9 * 60)?,
                parsed("FRONTDESK_CLOSE_MINUTE", 18 * 60)?,
                parsed("FRONTDESK_SLOT_MINUTES", 30)?,
            )?,
            utc_offset_minutes: parsed("FRONTDESK_UTC_OFFSET_MINUTES", 0)?,
        };
        let sync = SyncConfig {
            view_page_size: parsed("FRONTDESK_VIEW_PAGE_SIZE", 20)?,
            sweep_page_size: parsed("FRONTDESK_SWEEP_PAGE_SIZE", 200)?,
            drain_timeout: Duration::from_secs(parsed("FRONTDESK_DRAIN_TIMEOUT_SECS", 5)?),
        };
        Ok(Self {
            backend,
            channel,
            grid,
            sync,
        })
    }

    /// Channel settings assembled from the backend and channel sections.
    #[must_use]
    pub fn channel_config(&self) -> frontdesk_channel::ChannelConfig {
        frontdesk_channel::ChannelConfig::new(&self.channel.feed_url, self.backend.salon.clone())
            .with_policy(self.channel.policy)
            .with_idle_timeout(self.channel.idle_timeout)
            .with_connect_timeout(self.channel.connect_timeout)
    }

    /// Engine options assembled from the grid and sync sections.
    #[must_use]
    pub const fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            view_page_size: self.sync.view_page_size,
            sweep_page_size: self.sync.sweep_page_size,
            drain_timeout: self.sync.drain_timeout,
            grid: self.grid.grid,
            utc_offset_minutes: self.grid.utc_offset_minutes,
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    parse_with_default(name, std::env::var(name).ok(), default)
}

fn parse_with_default<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(default);
            }
            trimmed
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_blank_values_fall_back_to_the_default() {
        assert_eq!(parse_with_default("X", None, 42u32).unwrap(), 42);
        assert_eq!(
            parse_with_default("X", Some("   ".to_string()), 42u32).unwrap(),
            42
        );
    }

    #[test]
    fn set_values_parse_with_surrounding_whitespace() {
        assert_eq!(
            parse_with_default("X", Some(" 7 ".to_string()), 42u32).unwrap(),
            7
        );
        assert_eq!(
            parse_with_default("X", Some("-90".to_string()), 0i32).unwrap(),
            -90
        );
    }

    #[test]
    fn unparseable_values_name_the_variable() {
        let error = parse_with_default("FRONTDESK_VIEW_PAGE_SIZE", Some("lots".to_string()), 20u32)
            .unwrap_err();
        assert_eq!(
            error,
            ConfigError::Invalid {
                name: "FRONTDESK_VIEW_PAGE_SIZE",
                value: "lots".to_string(),
            }
        );
    }
}
