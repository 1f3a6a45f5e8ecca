//! Adapter module - session sync over a TCP socket with a JSON protocol
//!
//! This crate puts a [`planning_poker_core::Session`] per room behind a TCP
//! listener. Every connected client is either seated or spectating; every
//! accepted change is followed by a full snapshot sent to everyone in the
//! room.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to the TCP socket (default: 127.0.0.1:3000)
//! 2. **Preamble**: Client sends `JoinRoom` naming the room
//! 3. **Assignment**: Server responds with `PlayerAssigned` (a seat id, or a
//!    spectator id ≥ 100), followed by the current `UpdateState`
//! 4. **Changes**: Client sends `ChangeName` / `ChangeValue` / `RevealNumbers`;
//!    each accepted change is broadcast as a new `UpdateState`
//! 5. **Heartbeat**: Server sends `Ping` periodically, client answers `Pong`
//!
//! A line that is not valid UTF-8, exceeds
//! [`MAX_LINE_BYTES`](planning_poker_types::MAX_LINE_BYTES) or does not parse
//! is logged and dropped; the connection stays open.
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **ChangeName** / **ChangeValue**: the client's whole identity
//!   `{player_id, name, value}`
//! - **RevealNumbers**: `{value: bool}` sets the room-wide reveal flag
//! - **Pong**: heartbeat answer
//!
//! ## Server → Client
//!
//! - **PlayerAssigned**: the id given to this connection
//! - **UpdateState**: full snapshot, including the reassignment notice
//! - **Ping**: heartbeat check, answered with `Pong`
//! - **ErrorMessage**: a rejected request, sent to its originator only
//!
//! # Environment Variables
//!
//! - `POKER_HOST`: Bind address (default: "127.0.0.1")
//! - `POKER_PORT`: Port number (default: 3000)
//! - `POKER_MAX_SEATS`: Seats per room, 1..=12 (default: 12)
//! - `POKER_PING_INTERVAL_MS` / `POKER_PONG_TIMEOUT_MS`: heartbeat timing
//! - `POKER_LOG_PATH`: append every wire line to this file
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"JoinRoom","room":"SwiftFox"}
//! Server -> Client: {"type":"PlayerAssigned","player_id":0}
//! Server -> Client: {"type":"UpdateState","players":[...],"all_revealed":false,"notify_change":{"current_id":0,"new_id":0}}
//! Client -> Server: {"type":"ChangeValue","player_id":0,"name":"Ann","value":5}
//! Server -> Client: {"type":"UpdateState",...}
//! ```
//!
//! # Testing
//!
//! ```bash
//! nc 127.0.0.1 3000
//! {"type":"JoinRoom","room":"demo"}
//! ```

pub mod authority;
pub mod framing;
pub mod heartbeat;
pub mod protocol;
pub mod server;

pub use planning_poker_core as core;
pub use planning_poker_types as types;

pub use authority::{run_authority, Authority, InboundEvent, InboundPayload, RoomRequest};
pub use framing::{FrameError, LineReader};
pub use heartbeat::Heartbeat;
pub use protocol::*;
pub use server::{run_server, ConfigError, ServerConfig};
