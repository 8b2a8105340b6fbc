//! Room coordination for honk.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! session registry and subscriber map. Events fan out to socket sessions
//! and pull-based subscription queues through one broadcast path.
//!
//! # Key types
//!
//! - [`RoomManager`]: creates rooms by name, respawns stopped ones
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`EventQueue`] / [`Subscription`]: the pull-based transport
//! - [`Leaderboard`]: the seam for the sound counter collaborator
//! - [`ConnectionState`]: per-socket lifecycle state machine
//! - [`RoomConfig`]: name rules, channel size, sweep timings

mod config;
mod error;
mod leaderboard;
mod manager;
mod queue;
mod room;

pub use config::{ConnectionState, RoomConfig};
pub use error::{LeaderboardError, RoomError};
pub use honk_session::SocketSender;
pub use leaderboard::Leaderboard;
pub use manager::RoomManager;
pub use queue::{EventQueue, Subscription};
pub use room::RoomHandle;
