//! # Honk
//!
//! Room server for lightweight named sounds ("honks") with live presence.
//!
//! Participants reach a room two ways: a raw WebSocket that pushes every
//! event, or an HTTP event stream (`/subscribe`) fed by a pull-based queue.
//! Both end up in the same room actor, which validates names, tracks who
//! is there and fans events out. Every accepted sound is also reported to
//! a leaderboard collaborator without holding up the broadcast.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use honk::prelude::*;
//!
//! # async fn run() -> Result<(), HonkError> {
//! let config = Config::default();
//! let server = HonkServer::builder(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod http;
mod leaderboard;
mod server;

pub use config::{Config, ConfigError};
pub use error::HonkError;
pub use leaderboard::{
    HttpLeaderboard, LeaderboardStore, Reaction, RecordRequest,
    SortedReactions,
};
pub use server::{HonkServer, HonkServerBuilder};

/// The types needed to configure and run a server.
pub mod prelude {
    pub use crate::{Config, HonkError, HonkServer, HonkServerBuilder};
    pub use honk_protocol::{Account, AccountId, RoomEvent, ServerMessage};
    pub use honk_room::{Leaderboard, RoomConfig};
}
