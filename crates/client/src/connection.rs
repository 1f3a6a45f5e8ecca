//! Async client driver.
//!
//! One task per connection: it reads server lines into the [`Reconciler`],
//! feeds user edits through the [`Debouncer`], and answers pings directly.
//! The embedding UI talks to it through two channels: [`UserInput`] in,
//! [`ClientEvent`] out. The event channel is unbounded so a UI that falls
//! behind never stalls ping replies.

use std::time::{Duration, Instant};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use planning_poker_adapter::LineReader;

use crate::debounce::{Debouncer, InputStream};
use crate::protocol::{
    create_join_room, encode, parse_server_message, ClientMessage, NotifyChange, StateSnapshot,
};
use crate::reconciler::{Reaction, Reconciler};
use crate::reveal::{request_reveal, CONFIRM_PROMPT};
use crate::types::{PlayerId, DEFAULT_PORT, MAX_LINE_BYTES, NAME_DEBOUNCE_MS, VALUE_DEBOUNCE_MS};
use crate::ConfigError;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: String,
    pub room: String,
    pub name_debounce: Duration,
    pub value_debounce: Duration,
}

impl ClientConfig {
    pub fn new(server: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            room: room.into(),
            name_debounce: Duration::from_millis(NAME_DEBOUNCE_MS),
            value_debounce: Duration::from_millis(VALUE_DEBOUNCE_MS),
        }
    }

    /// Read `POKER_SERVER`, `POKER_ROOM` and the debounce delays.
    ///
    /// `room` overrides `POKER_ROOM` (the client binary passes its first
    /// argument here).
    pub fn from_env(room: Option<String>) -> Result<Self, ConfigError> {
        let server = std::env::var("POKER_SERVER")
            .unwrap_or_else(|_| format!("127.0.0.1:{DEFAULT_PORT}"));
        let room = room
            .or_else(|| std::env::var("POKER_ROOM").ok())
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or(ConfigError::Missing { var: "POKER_ROOM" })?;

        let mut config = Self::new(server, room);
        if let Some(ms) = env_millis("POKER_NAME_DEBOUNCE_MS")? {
            config.name_debounce = ms;
        }
        if let Some(ms) = env_millis("POKER_VALUE_DEBOUNCE_MS")? {
            config.value_debounce = ms;
        }
        Ok(config)
    }
}

fn env_millis(var: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(None),
    }
}

/// Requests from the embedding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Name(String),
    Vote(u32),
    /// Toggle reveal; `confirmed` answers the missing-votes prompt up front.
    Reveal { confirmed: bool },
    Quit,
}

/// Notifications for the embedding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Assigned(PlayerId),
    Snapshot {
        state: StateSnapshot,
        local: Option<PlayerId>,
    },
    Reassigned(NotifyChange),
    /// A reveal was held back; resend with `confirmed: true` to go ahead.
    ConfirmationRequired(String),
    Error(String),
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Edit {
    Name(String),
    Vote(u32),
}

async fn send(writer: &mut OwnedWriteHalf, msg: &ClientMessage) -> anyhow::Result<()> {
    let line = encode(msg)?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await,
        None => std::future::pending().await,
    }
}

struct Driver {
    reconciler: Reconciler,
    debouncer: Debouncer<InputStream, Edit>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl Driver {
    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    async fn on_reaction(&mut self, reaction: Reaction, writer: &mut OwnedWriteHalf) -> anyhow::Result<()> {
        if let Some(msg) = reaction.outbound() {
            send(writer, msg).await?;
        }
        match reaction {
            Reaction::Assigned(id) => self.emit(ClientEvent::Assigned(id)),
            Reaction::Synced => self.emit_snapshot(),
            Reaction::Reassigned { notice, .. } => {
                self.emit(ClientEvent::Reassigned(notice));
                self.emit_snapshot();
            }
            Reaction::Rejected(message) => self.emit(ClientEvent::Error(message)),
            Reaction::Pong(_) | Reaction::Ignored => {}
        }
        Ok(())
    }

    fn emit_snapshot(&self) {
        if let Some(state) = self.reconciler.mirror() {
            self.emit(ClientEvent::Snapshot {
                state: state.clone(),
                local: self.reconciler.seat_id(),
            });
        }
    }

    /// Apply a user request; returns false on quit.
    async fn on_input(&mut self, input: UserInput, writer: &mut OwnedWriteHalf) -> anyhow::Result<bool> {
        match input {
            UserInput::Name(name) => {
                self.reconciler.set_display_name(&name);
                self.debouncer.push(InputStream::Name, Edit::Name(name), now());
            }
            UserInput::Vote(value) => {
                if self.reconciler.is_spectator() {
                    debug!(value, "vote ignored while spectating");
                    self.emit(ClientEvent::Error("spectators cannot vote".to_string()));
                } else {
                    self.reconciler.set_estimate(value);
                    self.debouncer.push(InputStream::Value, Edit::Vote(value), now());
                }
            }
            UserInput::Reveal { confirmed } => {
                let Some(mirror) = self.reconciler.mirror() else {
                    debug!("reveal before first snapshot ignored");
                    return Ok(true);
                };
                let mut confirm = |_: &str| confirmed;
                match request_reveal(mirror, &mut confirm) {
                    Some(msg) => send(writer, &msg).await?,
                    None => self.emit(ClientEvent::ConfirmationRequired(CONFIRM_PROMPT.to_string())),
                }
            }
            UserInput::Quit => return Ok(false),
        }
        Ok(true)
    }

    async fn send_edits(&mut self, edits: Vec<(InputStream, Edit)>, writer: &mut OwnedWriteHalf) -> anyhow::Result<()> {
        for (stream, edit) in edits {
            let msg = match edit {
                Edit::Name(name) => {
                    debug!(?stream, %name, "name settled");
                    self.reconciler.change_name()
                }
                Edit::Vote(value) if self.reconciler.is_spectator() => {
                    debug!(?stream, value, "vote dropped while spectating");
                    None
                }
                Edit::Vote(value) => {
                    debug!(?stream, value, "vote settled");
                    self.reconciler.change_value()
                }
            };
            if let Some(msg) = msg {
                send(writer, &msg).await?;
            }
        }
        Ok(())
    }
}

/// Connect to a room and run until the server closes the connection or the
/// user quits. Pending edits are flushed before quitting.
pub async fn run_client(
    config: ClientConfig,
    mut input: mpsc::Receiver<UserInput>,
    events: mpsc::UnboundedSender<ClientEvent>,
) -> anyhow::Result<()> {
    let stream = TcpStream::connect(&config.server).await?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = LineReader::new(BufReader::new(reader), MAX_LINE_BYTES);
    info!(server = %config.server, room = %config.room, "connected");

    let join = serde_json::to_string(&create_join_room(&config.room))?;
    writer.write_all(join.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    let mut driver = Driver {
        reconciler: Reconciler::new(),
        debouncer: Debouncer::new()
            .with_delay(InputStream::Name, config.name_debounce)
            .with_delay(InputStream::Value, config.value_debounce),
        events,
    };

    let result = async {
        loop {
            let deadline = driver.debouncer.next_deadline();
            tokio::select! {
                frame = lines.next_line() => {
                    let Some(frame) = frame? else {
                        info!("server closed the connection");
                        break;
                    };
                    let line = match frame {
                        Ok(line) => line,
                        Err(e) => {
                            warn!(error = %e, "dropping malformed message");
                            continue;
                        }
                    };
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match parse_server_message(trimmed) {
                        Ok(msg) => {
                            let reaction = driver.reconciler.handle(msg);
                            driver.on_reaction(reaction, &mut writer).await?;
                        }
                        Err(e) => warn!(error = %e, "dropping malformed message"),
                    }
                }
                req = input.recv() => {
                    let keep_going = match req {
                        Some(req) => driver.on_input(req, &mut writer).await?,
                        None => false,
                    };
                    if !keep_going {
                        let pending = driver.debouncer.flush();
                        driver.send_edits(pending, &mut writer).await?;
                        break;
                    }
                    // Zero-delay streams go out right away.
                    let ready = driver.debouncer.poll_ready(now());
                    driver.send_edits(ready, &mut writer).await?;
                }
                _ = sleep_until(deadline) => {
                    let ready = driver.debouncer.poll_ready(now());
                    driver.send_edits(ready, &mut writer).await?;
                }
            }
        }
        anyhow::Ok(())
    }
    .await;

    driver.emit(ClientEvent::Disconnected);
    result
}
