//! Client side of the poker session protocol (UI-independent).
//!
//! - [`reconciler`]: `Connecting → Identified → Synced` state machine holding
//!   the local identity and a wholesale-replaced snapshot mirror
//! - [`debounce`]: per-stream coalescing of user edits
//! - [`reveal`]: advisory missing-votes check before revealing
//! - [`view`]: table summary derived from a snapshot
//! - [`connection`]: async driver tying the above to a TCP connection

pub mod connection;
pub mod debounce;
pub mod reconciler;
pub mod reveal;
pub mod view;

pub use planning_poker_adapter::protocol;
pub use planning_poker_adapter::ConfigError;
pub use planning_poker_types as types;

pub use connection::{run_client, ClientConfig, ClientEvent, UserInput};
pub use debounce::{Debouncer, InputStream};
pub use reconciler::{LocalIdentity, Reaction, Reconciler, ReconcilerState};
pub use reveal::{request_reveal, Confirm, CONFIRM_PROMPT};
pub use view::TableView;
