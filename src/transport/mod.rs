//! Device Hub Transport
//!
//! Drives an [`Engine`] from a single cooperative event loop:
//!
//! ```text
//!                 ┌── WebSocket frame ──> Engine::handle_frame
//!                 ├── render interval ──> Engine::render_tick
//! tokio::select! ─┼── dwell deadline ───> Engine::poll_timers
//!                 ├── control command ──> Engine::apply_command
//!                 ├── metrics interval ─> MetricsCollector::log_summary
//!                 └── ctrl-c ───────────> shutdown
//! ```
//!
//! Every handler runs to completion before the next event is taken. The
//! connection is a small state machine (waiting, connecting, open); a closed
//! or failed connection marks every device disconnected and retries after a
//! fixed backoff, forever. Rendering never stops while the link is down.

pub mod bridge;
pub mod control;

pub use bridge::{spawn_command_reader, JsonLinesRenderer, JsonLinesSink};
pub use control::ControlCommand;

use futures_util::StreamExt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::cursor::CursorRenderer;
use crate::engine::Engine;
use crate::interaction::{EventSink, Surface};
use crate::utils::metric_names;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connecting or handshaking failed
    #[error("WebSocket connect to {url} failed: {source}")]
    Connect {
        /// Hub URL
        url: String,
        /// Underlying error
        #[source]
        source: tungstenite::Error,
    },

    /// Established stream failed
    #[error("WebSocket stream error: {0}")]
    Stream(#[from] tungstenite::Error),

    /// Shutdown signal could not be installed
    #[error("Signal handler error: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

type HubStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectFuture = Pin<Box<dyn Future<Output = std::result::Result<HubStream, TransportError>>>>;

/// Event loop settings
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Hub WebSocket URL
    pub url: String,
    /// Delay before each reconnect attempt
    pub reconnect_backoff: Duration,
    /// Render tick period
    pub render_interval: Duration,
    /// Metrics summary period (None = disabled)
    pub metrics_interval: Option<Duration>,
}

impl TransportOptions {
    /// Options from file configuration
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            url: config.transport.url.clone(),
            reconnect_backoff: Duration::from_millis(config.transport.reconnect_backoff_ms),
            render_interval: Duration::from_secs_f64(1.0 / f64::from(config.render.fps.max(1))),
            metrics_interval: (config.logging.metrics_interval_secs > 0)
                .then(|| Duration::from_secs(config.logging.metrics_interval_secs)),
        }
    }
}

/// Connection state
enum Link {
    /// Waiting for the next attempt
    Waiting { retry_at: Instant },
    /// Handshake in progress
    Connecting(ConnectFuture),
    /// Receiving frames
    Open(Box<HubStream>),
}

/// What the connection produced
enum LinkEvent {
    RetryDue,
    Connected(std::result::Result<HubStream, TransportError>),
    Frame(Option<std::result::Result<Message, tungstenite::Error>>),
}

impl Link {
    /// Wait for the next event in the current state
    ///
    /// Cancel-safe: dropping the future leaves the state untouched.
    async fn next_event(&mut self) -> LinkEvent {
        match self {
            Link::Waiting { retry_at } => {
                time::sleep_until(*retry_at).await;
                LinkEvent::RetryDue
            }
            Link::Connecting(fut) => LinkEvent::Connected(fut.await),
            Link::Open(stream) => LinkEvent::Frame(stream.next().await),
        }
    }
}

fn connect(url: String) -> ConnectFuture {
    Box::pin(async move {
        tokio_tungstenite::connect_async(url.clone())
            .await
            .map(|(stream, _response)| stream)
            .map_err(|source| TransportError::Connect { url, source })
    })
}

/// Run the event loop until ctrl-c
///
/// `commands` carries configuration commands; the loop keeps running after
/// the sender side is dropped.
pub async fn run<S, E, R>(
    engine: &mut Engine<S, E, R>,
    options: TransportOptions,
    mut commands: mpsc::Receiver<ControlCommand>,
) -> Result<()>
where
    S: Surface,
    E: EventSink,
    R: CursorRenderer,
{
    info!("Connecting to device hub at {}", options.url);

    let mut render = time::interval(options.render_interval);
    render.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let metrics_period = options.metrics_interval.unwrap_or(Duration::from_secs(3600));
    let mut metrics_tick = time::interval_at(Instant::now() + metrics_period, metrics_period);

    let mut link = Link::Connecting(connect(options.url.clone()));
    let mut commands_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let dwell_at = engine
            .next_deadline()
            .map(Instant::from_std)
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        let dwell_pending = engine.next_deadline().is_some();

        tokio::select! {
            event = link.next_event() => {
                if let Some(next) = on_link_event(engine, event, &options) {
                    link = next;
                }
            }

            _ = render.tick() => {
                engine.render_tick(std::time::Instant::now());
            }

            _ = time::sleep_until(dwell_at), if dwell_pending => {
                engine.poll_timers(std::time::Instant::now());
            }

            command = commands.recv(), if commands_open => match command {
                Some(command) => {
                    if let Err(e) = engine.apply_command(command) {
                        warn!("Control command failed: {}", e);
                    }
                }
                None => {
                    debug!("Control channel closed");
                    commands_open = false;
                }
            },

            _ = metrics_tick.tick(), if options.metrics_interval.is_some() => {
                engine.metrics().log_summary();
            }

            result = &mut shutdown => {
                result?;
                info!("Shutdown requested");
                if let Link::Open(mut stream) = link {
                    if let Err(e) = stream.close(None).await {
                        debug!("Close handshake failed: {}", e);
                    }
                }
                engine.handle_disconnect(std::time::Instant::now());
                return Ok(());
            }
        }
    }
}

/// Apply a link event; returns the next state, or `None` to stay put
fn on_link_event<S, E, R>(
    engine: &mut Engine<S, E, R>,
    event: LinkEvent,
    options: &TransportOptions,
) -> Option<Link>
where
    S: Surface,
    E: EventSink,
    R: CursorRenderer,
{
    let now = std::time::Instant::now();
    let retry = Link::Waiting {
        retry_at: Instant::now() + options.reconnect_backoff,
    };

    match event {
        LinkEvent::RetryDue => {
            engine
                .metrics()
                .increment_counter(metric_names::RECONNECTS, 1);
            debug!("Reconnecting to {}", options.url);
            Some(Link::Connecting(connect(options.url.clone())))
        }
        LinkEvent::Connected(Ok(stream)) => {
            info!("🔌 Connected to device hub {}", options.url);
            Some(Link::Open(Box::new(stream)))
        }
        LinkEvent::Connected(Err(e)) => {
            warn!("{}; retrying in {:?}", e, options.reconnect_backoff);
            Some(retry)
        }
        LinkEvent::Frame(Some(Ok(message))) => {
            on_message(engine, message, now);
            None
        }
        LinkEvent::Frame(Some(Err(e))) => {
            warn!(
                "{}; retrying in {:?}",
                TransportError::from(e),
                options.reconnect_backoff
            );
            engine.handle_disconnect(now);
            Some(retry)
        }
        LinkEvent::Frame(None) => {
            warn!(
                "Device hub closed the connection; retrying in {:?}",
                options.reconnect_backoff
            );
            engine.handle_disconnect(now);
            Some(retry)
        }
    }
}

fn on_message<S, E, R>(engine: &mut Engine<S, E, R>, message: Message, now: std::time::Instant)
where
    S: Surface,
    E: EventSink,
    R: CursorRenderer,
{
    match message {
        Message::Text(text) => {
            let summary = engine.handle_frame(&text, now);
            trace!(
                "Frame: {} samples, {} dropped",
                summary.accepted,
                summary.dropped
            );
        }
        Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
            Ok(text) => {
                engine.handle_frame(text, now);
            }
            Err(_) => debug!("Ignoring non-UTF-8 binary frame ({} bytes)", bytes.len()),
        },
        Message::Close(frame) => debug!("Close frame from hub: {:?}", frame),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default_config();
        config.logging.metrics_interval_secs = 30;
        let options = TransportOptions::from_config(&config);
        assert_eq!(options.url, "ws://192.168.4.1/ws");
        assert_eq!(options.reconnect_backoff, Duration::from_millis(2000));
        assert!((options.render_interval.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(options.metrics_interval, Some(Duration::from_secs(30)));

        config.logging.metrics_interval_secs = 0;
        assert_eq!(TransportOptions::from_config(&config).metrics_interval, None);
    }

    #[test]
    fn test_connect_error_names_url() {
        let err = TransportError::Connect {
            url: "ws://10.0.0.9/ws".to_string(),
            source: tungstenite::Error::ConnectionClosed,
        };
        assert!(err.to_string().contains("ws://10.0.0.9/ws"));
    }
}
