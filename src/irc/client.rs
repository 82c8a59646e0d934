//! IRC client: reconnect loop, session driving, outbound send path.
//!
//! [`IrcClient::run`] owns the socket and the receive loop for the lifetime
//! of the process. Each inbound line is fed through the protocol session
//! machine and every resulting action is applied before the next line is
//! read, so event callbacks never run concurrently. Outbound sends from
//! other tasks go through [`IrcSender`], whose writer slot is guarded by a
//! single mutex.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use tgbridge_proto::{
    Action, Line, ProtocolError, SessionConfig, SessionEvent, SessionMachine, TlsMode, Transport,
    TransportConfig, TransportWriter,
};

use crate::config::IrcConfig;
use crate::dispatch::Dispatcher;

/// Outbound messages longer than this many characters are split into
/// multiple PRIVMSGs.
const MESSAGE_SPLIT_LEN: usize = 420;

/// Fixed delay between a disconnect and the next connect attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Consecutive failed cycles after which the process gives up. Indefinite
/// silent retry against an unreachable server helps nobody.
const MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// The retry ceiling was hit; the process must terminate.
#[derive(Debug, thiserror::Error)]
#[error("giving up after {0} consecutive failed IRC connection attempts")]
pub struct RetryExhausted(pub u32);

/// Cloneable handle for sending to the IRC server from any task.
///
/// The writer slot is `None` exactly when no connection exists; sends in
/// that window are dropped with a warning rather than queued.
#[derive(Clone)]
pub struct IrcSender {
    writer: Arc<Mutex<Option<TransportWriter>>>,
}

impl IrcSender {
    fn new() -> Self {
        Self {
            writer: Arc::new(Mutex::new(None)),
        }
    }

    async fn send(&self, line: Line) {
        let mut slot = self.writer.lock().await;
        match slot.as_mut() {
            None => warn!(command = %line.command, "dropping message, IRC not connected"),
            Some(writer) => match writer.write_line(line).await {
                Ok(()) => {}
                Err(ProtocolError::LineTooLong { actual, limit }) => {
                    // Programmer error; the connection itself is fine.
                    error!(actual, limit, "refusing to send oversized line");
                }
                Err(e) => {
                    // Stop further sends early; the receive loop notices the
                    // dead socket and drives the reconnect.
                    warn!(error = %e, "IRC write failed");
                    *slot = None;
                }
            },
        }
    }

    /// Join a channel.
    pub async fn join(&self, channel: &str) {
        self.send(Line::join(channel)).await;
    }

    /// Send a message, splitting it when it exceeds the per-line budget.
    pub async fn privmsg(&self, target: &str, text: &str) {
        for chunk in split_message(text, MESSAGE_SPLIT_LEN) {
            self.send(Line::privmsg(target, chunk)).await;
        }
    }
}

/// The IRC network client.
pub struct IrcClient {
    config: IrcConfig,
    sender: IrcSender,
}

impl IrcClient {
    /// Create a client from configuration. Nothing connects until
    /// [`IrcClient::run`].
    pub fn new(config: IrcConfig) -> Self {
        Self {
            config,
            sender: IrcSender::new(),
        }
    }

    /// Handle for outbound sends, usable before and across connections.
    pub fn sender(&self) -> IrcSender {
        self.sender.clone()
    }

    /// Run the connection lifecycle until the retry ceiling is hit.
    ///
    /// Connect, register, read lines and apply session actions; on any
    /// disconnect wait the fixed delay and start over. The consecutive
    /// failure counter resets only when a cycle reaches the registered
    /// state, and once it hits the ceiling this returns the fatal error.
    pub async fn run(self, dispatcher: Dispatcher<SessionEvent>) -> Result<(), RetryExhausted> {
        let transport_config = TransportConfig {
            host: self.config.server.clone(),
            port: self.config.port,
            tls: match (self.config.ssl, self.config.ssl_verify) {
                (false, _) => TlsMode::Off,
                (true, true) => TlsMode::Verified,
                (true, false) => TlsMode::Insecure,
            },
            prefer_ipv6: self.config.ipv6,
            keepalive_interval: Duration::from_secs(self.config.keepalive_interval),
        };

        let mut failures: u32 = 0;
        loop {
            let transport = match Transport::connect(&transport_config).await {
                Ok(transport) => transport,
                Err(e) => {
                    failures += 1;
                    error!(error = %e, failures, "IRC connection attempt failed");
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        return Err(RetryExhausted(failures));
                    }
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            };
            info!(
                server = %self.config.server,
                port = self.config.port,
                "connected, registering"
            );

            let (mut reader, writer) = transport.split();
            *self.sender.writer.lock().await = Some(writer);

            let mut machine = SessionMachine::new(SessionConfig {
                nickname: self.config.nick.clone(),
                username: self
                    .config
                    .username
                    .clone()
                    .unwrap_or_else(|| self.config.nick.clone()),
                realname: self.config.realname.clone(),
                password: self.config.password.clone(),
                nickserv_password: self.config.nickpassword.clone(),
            });

            for action in machine.start() {
                self.apply(action, &dispatcher, &mut failures).await;
            }

            loop {
                match reader.read_line().await {
                    Ok(Some(line)) => {
                        for action in machine.feed(&line) {
                            self.apply(action, &dispatcher, &mut failures).await;
                        }
                    }
                    Ok(None) => {
                        warn!("server closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "IRC read failed");
                        break;
                    }
                }
            }

            *self.sender.writer.lock().await = None;
            failures += 1;
            if failures >= MAX_CONSECUTIVE_FAILURES {
                return Err(RetryExhausted(failures));
            }
            warn!(
                delay_secs = RECONNECT_DELAY.as_secs(),
                failures, "disconnected, reconnecting"
            );
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn apply(
        &self,
        action: Action,
        dispatcher: &Dispatcher<SessionEvent>,
        failures: &mut u32,
    ) {
        match action {
            Action::Send(line) => self.sender.send(line).await,
            Action::Emit(event) => {
                if matches!(event, SessionEvent::Connected) {
                    info!("IRC connection established");
                    *failures = 0;
                }
                dispatcher.dispatch(event).await;
            }
        }
    }
}

/// Split a message into chunks of at most `limit` characters.
fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() < limit {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
