//! Wire protocol for honk rooms.
//!
//! - **Types** ([`ClientMessage`], [`RoomEvent`], [`ServerMessage`],
//!   [`Account`]) — what travels between clients and the room.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   turned into bytes.
//! - **Errors** ([`ProtocolError`]) — what goes wrong doing so.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (RoomEvent fan-out)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Account, AccountId, ClientMessage, ErrorCode, RoomEvent, ServerMessage,
    ServerReply,
};
