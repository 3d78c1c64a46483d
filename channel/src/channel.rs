//! Supervised push-feed connection.
//!
//! [`EventChannel::spawn`] starts a background task that owns the HTTP
//! connection to the salon's event feed, decodes NDJSON lines into
//! [`LedgerEvent`]s, and fans them out over a broadcast channel. The task
//! reconnects on its own with jittered backoff until the attempt budget
//! runs out, then parks in `Down` until [`EventChannel::reconnect_now`].

use crate::backoff::ReconnectPolicy;
use crate::health::{ChannelHealth, ChannelState};
use crate::wire::{self, Frame};
use frontdesk_core::{LedgerEvent, SalonId};
use futures::Stream;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

/// Connection settings for the push feed.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Feed endpoint URL.
    pub url: String,
    /// Salon whose events to subscribe to.
    pub salon: SalonId,
    /// Reconnect pacing and budget.
    pub policy: ReconnectPolicy,
    /// A connection with no traffic (not even heartbeats) for this long
    /// is treated as dead and recycled.
    pub idle_timeout: Duration,
    /// Budget for establishing the connection and receiving headers.
    pub connect_timeout: Duration,
    /// Broadcast buffer depth per subscriber.
    pub buffer: usize,
}

impl ChannelConfig {
    /// Settings with production defaults.
    pub fn new(url: impl Into<String>, salon: SalonId) -> Self {
        Self {
            url: url.into(),
            salon,
            policy: ReconnectPolicy::default(),
            idle_timeout: Duration::from_secs(45),
            connect_timeout: Duration::from_secs(10),
            buffer: 256,
        }
    }

    /// Sets the reconnect policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the broadcast buffer depth.
    #[must_use]
    pub const fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }
}

/// Handle to a running push-feed connection.
///
/// Dropping the handle stops the background task; prefer
/// [`shutdown`](Self::shutdown) when you want to wait for it to finish.
#[derive(Debug)]
pub struct EventChannel {
    events_tx: broadcast::Sender<LedgerEvent>,
    health_rx: watch::Receiver<ChannelHealth>,
    state_rx: watch::Receiver<ChannelState>,
    reconnect_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl EventChannel {
    /// Starts the connection supervisor in the background.
    #[must_use]
    pub fn spawn(config: ChannelConfig) -> Self {
        let (events_tx, _) = broadcast::channel(config.buffer.max(1));
        let (health_tx, health_rx) = watch::channel(ChannelHealth::Degraded {
            reason: "not yet connected".to_string(),
        });
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (reconnect_tx, reconnect_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let supervisor = Supervisor {
            config,
            http: Client::new(),
            events: events_tx.clone(),
            health: health_tx,
            state: state_tx,
            reconnect: reconnect_rx,
            shutdown: shutdown_rx,
        };
        let handle = tokio::spawn(supervisor.run());

        Self {
            events_tx,
            health_rx,
            state_rx,
            reconnect_tx,
            shutdown_tx,
            handle,
        }
    }

    /// New subscription to decoded events.
    ///
    /// Delivery starts from the moment of subscription; a slow subscriber
    /// that overruns the buffer sees `Lagged` and should resynchronize
    /// from the backend rather than assume continuity.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events_tx.subscribe()
    }

    /// Decoded events as a plain [`Stream`].
    ///
    /// Lag is logged and skipped over, so this surface is for displays
    /// and tooling; state maintenance should use [`subscribe`](Self::subscribe)
    /// and react to lag explicitly.
    pub fn event_stream(&self) -> impl Stream<Item = LedgerEvent> + Send {
        let mut events = self.events_tx.subscribe();
        async_stream::stream! {
            loop {
                match events.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "event stream lagged, resuming from the live edge");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// Watch handle for health transitions.
    #[must_use]
    pub fn watch_health(&self) -> watch::Receiver<ChannelHealth> {
        self.health_rx.clone()
    }

    /// Current health snapshot.
    #[must_use]
    pub fn health(&self) -> ChannelHealth {
        self.health_rx.borrow().clone()
    }

    /// Current connection state snapshot.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    /// Requests an immediate reconnect, skipping any backoff sleep and
    /// reviving a channel that has gone `Down`.
    pub fn reconnect_now(&self) {
        // A full queue means a reconnect is already pending.
        let _ = self.reconnect_tx.try_send(());
    }

    /// Stops the supervisor and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

/// Why a connection cycle ended.
enum ConsumeEnd {
    /// The connection was never established or rejected before any data.
    NeverConnected(String),
    /// The feed was live and then lost.
    LostAfterConnect(String),
    /// Shutdown was requested.
    Shutdown,
}

/// What woke the supervisor out of a backoff sleep.
#[derive(PartialEq, Eq)]
enum Wake {
    Timer,
    Manual,
    Shutdown,
}

struct Supervisor {
    config: ChannelConfig,
    http: Client,
    events: broadcast::Sender<LedgerEvent>,
    health: watch::Sender<ChannelHealth>,
    state: watch::Sender<ChannelState>,
    reconnect: mpsc::Receiver<()>,
    shutdown: watch::Receiver<bool>,
}

impl Supervisor {
    async fn run(mut self) {
        let mut attempt: u32 = 0;
        while !*self.shutdown.borrow() {
            self.set_state(ChannelState::Connecting);
            let end = self.consume_feed().await;
            self.set_state(ChannelState::Disconnected);

            let reason = match end {
                ConsumeEnd::Shutdown => break,
                ConsumeEnd::LostAfterConnect(reason) => {
                    // A successful connection refills the retry budget.
                    attempt = 1;
                    reason
                }
                ConsumeEnd::NeverConnected(reason) => {
                    attempt = attempt.saturating_add(1);
                    reason
                }
            };

            // Reconnect requests queued while the feed was still up are stale.
            while self.reconnect.try_recv().is_ok() {}

            if attempt >= self.config.policy.max_attempts {
                tracing::error!(
                    reason = %reason,
                    attempt,
                    "retry budget exhausted, channel is down until reconnect_now"
                );
                self.set_health(ChannelHealth::Down { reason });
                if self.wait_for_manual().await {
                    attempt = 0;
                    continue;
                }
                break;
            }

            let delay = self.config.policy.delay_for_attempt(attempt);
            metrics::counter!("channel.reconnect.attempts").increment(1);
            tracing::warn!(reason = %reason, attempt, delay = ?delay, "push feed disconnected, retrying");
            self.set_health(ChannelHealth::Degraded { reason });
            match self.sleep_or_manual(delay).await {
                Wake::Shutdown => break,
                Wake::Manual => attempt = 0,
                Wake::Timer => {}
            }
        }
        self.set_state(ChannelState::Disconnected);
        tracing::info!("event channel stopped");
    }

    /// Opens the feed and consumes it until it drops, goes idle, or
    /// shutdown is requested.
    async fn consume_feed(&mut self) -> ConsumeEnd {
        let request = self
            .http
            .get(&self.config.url)
            .query(&[("salonId", self.config.salon.as_str())]);

        let send = tokio::time::timeout(self.config.connect_timeout, request.send());
        let response = tokio::select! {
            _ = self.shutdown.changed() => return ConsumeEnd::Shutdown,
            outcome = send => match outcome {
                Err(_) => {
                    return ConsumeEnd::NeverConnected(format!(
                        "connect timed out after {:?}",
                        self.config.connect_timeout
                    ));
                }
                Ok(Err(error)) => {
                    return ConsumeEnd::NeverConnected(format!("connect failed: {error}"));
                }
                Ok(Ok(response)) => response,
            },
        };

        if !response.status().is_success() {
            return ConsumeEnd::NeverConnected(format!(
                "feed endpoint answered {}",
                response.status()
            ));
        }

        self.set_state(ChannelState::Connected);
        self.set_health(ChannelHealth::Healthy);
        tracing::info!(url = %self.config.url, salon = %self.config.salon, "push feed connected");

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        loop {
            // Heartbeats count as traffic, so a healthy-but-quiet feed
            // keeps resetting this deadline.
            let chunk = tokio::select! {
                _ = self.shutdown.changed() => return ConsumeEnd::Shutdown,
                next = tokio::time::timeout(self.config.idle_timeout, stream.next()) => match next {
                    Err(_) => {
                        return ConsumeEnd::LostAfterConnect(format!(
                            "no traffic for {:?}",
                            self.config.idle_timeout
                        ));
                    }
                    Ok(None) => return ConsumeEnd::LostAfterConnect("stream closed by server".to_string()),
                    Ok(Some(Err(error))) => {
                        return ConsumeEnd::LostAfterConnect(format!("stream error: {error}"));
                    }
                    Ok(Some(Ok(chunk))) => chunk,
                },
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buffer.find('\n') {
                let line: String = buffer[..pos].to_string();
                buffer.drain(..=pos);
                self.handle_line(&line);
            }
        }
    }

    fn handle_line(&self, line: &str) {
        match wire::decode_frame(line) {
            Ok(None) => {}
            Ok(Some(Frame::Heartbeat)) => {
                tracing::trace!("heartbeat");
            }
            Ok(Some(Frame::Event(event))) => {
                metrics::counter!("channel.events.received", "kind" => event.kind.wire_name())
                    .increment(1);
                tracing::debug!(kind = %event.kind, appointment = ?event.appointment_id, "event received");
                let _ = self.events.send(event);
            }
            Ok(Some(Frame::Unknown { event_type })) => {
                metrics::counter!("channel.events.dropped", "reason" => "unknown_type").increment(1);
                tracing::debug!(event_type = %event_type, "dropping event outside the known vocabulary");
            }
            Err(error) => {
                metrics::counter!("channel.events.dropped", "reason" => "malformed").increment(1);
                tracing::warn!(error = %error, line = %preview(line), "dropping malformed frame");
            }
        }
    }

    /// Waits out the backoff delay unless interrupted.
    async fn sleep_or_manual(&mut self, delay: Duration) -> Wake {
        tokio::select! {
            _ = self.shutdown.changed() => Wake::Shutdown,
            _ = tokio::time::sleep(delay) => Wake::Timer,
            request = self.reconnect.recv() => match request {
                Some(()) => Wake::Manual,
                None => Wake::Shutdown,
            },
        }
    }

    /// Parks until `reconnect_now` or shutdown. True on a manual request.
    async fn wait_for_manual(&mut self) -> bool {
        tokio::select! {
            _ = self.shutdown.changed() => false,
            request = self.reconnect.recv() => request.is_some(),
        }
    }

    fn set_state(&self, state: ChannelState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn set_health(&self, health: ChannelHealth) {
        self.health.send_if_modified(|current| {
            if *current == health {
                false
            } else {
                *current = health;
                true
            }
        });
    }
}

fn preview(line: &str) -> &str {
    match line.char_indices().nth(120) {
        Some((index, _)) => &line[..index],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders_override_defaults() {
        let config = ChannelConfig::new("http://localhost/feed", SalonId::new("salon-1"))
            .with_idle_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_millis(250))
            .with_buffer(16);
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.buffer, 16);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let short = "short line";
        assert_eq!(preview(short), short);
        let long = "é".repeat(200);
        assert_eq!(preview(&long).chars().count(), 120);
    }
}
