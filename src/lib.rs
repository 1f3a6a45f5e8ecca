//! Planning poker (workspace facade crate).
//!
//! Re-exports the member crates under short names so binaries and integration
//! tests can write `planning_poker::{core, adapter, client, types}`.

pub use planning_poker_adapter as adapter;
pub use planning_poker_client as client;
pub use planning_poker_core as core;
pub use planning_poker_types as types;
