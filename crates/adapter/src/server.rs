//! TCP server for poker rooms
//!
//! Accepts connections, reads the `JoinRoom` preamble, and then drives each
//! connection in a single event loop: inbound lines go to the room authority,
//! authority messages go out to the socket, and a heartbeat pings the client
//! and drops it when it stops answering.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::authority::{run_authority, Authority, InboundEvent, InboundPayload, RoomRequest};
use crate::framing::LineReader;
use crate::heartbeat::Heartbeat;
use crate::protocol::*;
use crate::types::{
    ConnectionId, DEFAULT_PORT, MAX_LINE_BYTES, MAX_SEATS, PING_INTERVAL_MS, PONG_TIMEOUT_MS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },
    #[error("{var} is invalid: {value}")]
    Invalid { var: &'static str, value: String },
    #[error("{var} must be within 1..={max} (got {value})")]
    OutOfRange {
        var: &'static str,
        value: u64,
        max: u64,
    },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_seats: usize,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub max_pending_events: usize,
    pub log_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_seats: MAX_SEATS,
            ping_interval: Duration::from_millis(PING_INTERVAL_MS),
            pong_timeout: Duration::from_millis(PONG_TIMEOUT_MS),
            max_pending_events: 256,
            log_path: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(None),
    }
}

impl ServerConfig {
    /// Create from environment variables, falling back to defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = std::env::var("POKER_HOST").unwrap_or(defaults.host);
        let port = env_parse::<u16>("POKER_PORT")?.unwrap_or(defaults.port);

        let max_seats = env_parse::<usize>("POKER_MAX_SEATS")?.unwrap_or(defaults.max_seats);
        if max_seats == 0 || max_seats > MAX_SEATS {
            return Err(ConfigError::OutOfRange {
                var: "POKER_MAX_SEATS",
                value: max_seats as u64,
                max: MAX_SEATS as u64,
            });
        }

        let ping_interval = env_parse::<u64>("POKER_PING_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.ping_interval);
        let pong_timeout = env_parse::<u64>("POKER_PONG_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.pong_timeout);
        if ping_interval.is_zero() {
            return Err(ConfigError::OutOfRange {
                var: "POKER_PING_INTERVAL_MS",
                value: 0,
                max: u64::MAX,
            });
        }

        let log_path = std::env::var("POKER_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) });

        Ok(Self {
            host,
            port,
            max_seats,
            ping_interval,
            pong_timeout,
            max_pending_events: defaults.max_pending_events,
            log_path,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            var: "POKER_HOST",
            value: raw,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone)]
struct WireRecord {
    connection: ConnectionId,
    direction: Direction,
    line: String,
}

type WireLog = Option<mpsc::UnboundedSender<WireRecord>>;

fn spawn_wire_log(path: String) -> mpsc::UnboundedSender<WireRecord> {
    let (tx, mut rx) = mpsc::unbounded_channel::<WireRecord>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                warn!(%path, error = %e, "wire log disabled");
                return;
            }
        };

        while let Some(rec) = rx.recv().await {
            let arrow = match rec.direction {
                Direction::Inbound => "<-",
                Direction::Outbound => "->",
            };
            let entry = format!("{} {} {}\n", rec.connection, arrow, rec.line);
            if file.write_all(entry.as_bytes()).await.is_err() {
                break;
            }
        }

        let _ = file.flush().await;
    });
    tx
}

fn log_wire(wire_log: &WireLog, connection: ConnectionId, direction: Direction, line: &str) {
    if let Some(tx) = wire_log.as_ref() {
        let _ = tx.send(WireRecord {
            connection,
            direction,
            line: line.to_string(),
        });
    }
}

/// Start the TCP server.
///
/// `ready_tx` receives the bound address once the listener is up, which lets
/// tests bind to port 0.
pub async fn run_server(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let wire_log: WireLog = config.log_path.clone().map(spawn_wire_log);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr).await?;
    let bound = listener.local_addr()?;
    info!(%bound, max_seats = config.max_seats, "poker server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let authority = Authority::new(config.max_seats)?;
    let (event_tx, event_rx) = mpsc::channel::<InboundEvent>(config.max_pending_events.max(1));
    tokio::spawn(run_authority(authority, event_rx));

    let mut connection_counter = 0u64;

    loop {
        let (socket, addr) = listener.accept().await?;
        connection_counter += 1;
        let connection = ConnectionId(connection_counter);

        info!(%connection, %addr, "client connected");

        let event_tx = event_tx.clone();
        let wire_log = wire_log.clone();
        let config = config.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, connection, &config, event_tx, wire_log).await {
                warn!(%connection, error = %e, "client error");
            }
            info!(%connection, "client disconnected");
        });
    }
}

async fn write_message(
    writer: &mut OwnedWriteHalf,
    msg: &ServerMessage,
    connection: ConnectionId,
    wire_log: &WireLog,
) -> anyhow::Result<()> {
    let line = encode(msg)?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    log_wire(wire_log, connection, Direction::Outbound, &line);
    Ok(())
}

/// Handle a single client connection.
async fn handle_client(
    socket: TcpStream,
    connection: ConnectionId,
    config: &ServerConfig,
    event_tx: mpsc::Sender<InboundEvent>,
    wire_log: WireLog,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut lines = LineReader::new(BufReader::new(reader), MAX_LINE_BYTES);

    // Preamble: the room name. A client that never sends one is dropped
    // after the heartbeat window.
    let first = match tokio::time::timeout(config.pong_timeout, lines.next_line()).await {
        Ok(line) => line?,
        Err(_) => {
            warn!(%connection, "no JoinRoom preamble before timeout");
            return Ok(());
        }
    };
    let first = match first {
        Some(Ok(line)) => line,
        Some(Err(e)) => {
            warn!(%connection, error = %e, "invalid JoinRoom preamble");
            return Ok(());
        }
        None => return Ok(()),
    };
    log_wire(&wire_log, connection, Direction::Inbound, &first);
    let join = match parse_join_room(first.trim()) {
        Ok(join) if !join.room.trim().is_empty() => join,
        Ok(_) => {
            warn!(%connection, "empty room name");
            return Ok(());
        }
        Err(e) => {
            warn!(%connection, error = %e, "invalid JoinRoom preamble");
            return Ok(());
        }
    };
    let room = join.room.trim().to_string();
    debug!(%connection, %room, "joining room");

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    event_tx
        .send(InboundEvent {
            connection,
            payload: InboundPayload::Join { room, tx },
        })
        .await?;

    let result = drive_connection(
        connection,
        config,
        &event_tx,
        &wire_log,
        &mut lines,
        &mut writer,
        &mut rx,
    )
    .await;

    // Exactly one Leave per connection; the authority ignores repeats anyway.
    let _ = event_tx
        .send(InboundEvent {
            connection,
            payload: InboundPayload::Leave,
        })
        .await;

    result
}

async fn drive_connection(
    connection: ConnectionId,
    config: &ServerConfig,
    event_tx: &mpsc::Sender<InboundEvent>,
    wire_log: &WireLog,
    lines: &mut LineReader<BufReader<OwnedReadHalf>>,
    writer: &mut OwnedWriteHalf,
    rx: &mut mpsc::UnboundedReceiver<ServerMessage>,
) -> anyhow::Result<()> {
    let now = tokio::time::Instant::now();
    let mut heartbeat = Heartbeat::new(config.ping_interval, config.pong_timeout, now.into_std());
    let mut ping = tokio::time::interval_at(now + heartbeat.interval(), heartbeat.interval());

    loop {
        tokio::select! {
            frame = lines.next_line() => {
                let Some(frame) = frame? else {
                    break;
                };
                let line = match frame {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(%connection, error = %e, "dropping malformed message");
                        continue;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                log_wire(wire_log, connection, Direction::Inbound, trimmed);

                match parse_client_message(trimmed) {
                    Ok(ClientMessage::Pong { .. }) => {
                        heartbeat.on_pong(tokio::time::Instant::now().into_std());
                    }
                    Ok(msg) => {
                        if let Some(request) = RoomRequest::from_client(msg) {
                            event_tx
                                .send(InboundEvent { connection, payload: InboundPayload::Request(request) })
                                .await?;
                        }
                    }
                    Err(e) => {
                        warn!(%connection, error = %e, "dropping malformed message");
                    }
                }
            }
            msg = rx.recv() => {
                let Some(msg) = msg else {
                    break;
                };
                write_message(writer, &msg, connection, wire_log).await?;
            }
            _ = ping.tick() => {
                if heartbeat.is_expired(tokio::time::Instant::now().into_std()) {
                    warn!(%connection, pings = heartbeat.pings_sent(), "heartbeat timeout");
                    break;
                }
                write_message(writer, &ServerMessage::Ping, connection, wire_log).await?;
                heartbeat.on_ping_sent();
            }
        }
    }

    Ok(())
}
