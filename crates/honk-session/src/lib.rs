//! Session registry for honk rooms.
//!
//! A session binds an [`Account`](honk_protocol::Account) to a transport.
//! The [`SessionRegistry`] holds every session of one room and is owned
//! exclusively by that room's coordinator.
//!
//! ```text
//! Room Coordinator (above)  ← validates names, mutates the registry, broadcasts
//!     ↕
//! Session Registry (this crate)  ← who is in the room and how to reach them
//!     ↕
//! Protocol (below)  ← Account, AccountId, ServerMessage
//! ```

mod registry;
mod session;

pub use registry::SessionRegistry;
pub use session::{
    Session, SocketSender, generate_account_id, new_account,
};
