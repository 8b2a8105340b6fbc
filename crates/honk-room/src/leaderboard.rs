//! The leaderboard seam.

use std::future::Future;

use crate::LeaderboardError;

/// External counter of how often each sound was played.
///
/// The room calls [`record`](Self::record) from a detached task once per
/// accepted sound, so an implementation may be slow or fail without
/// delaying any broadcast.
pub trait Leaderboard: Send + Sync + 'static {
    /// Increments the counter for `sound`. Names are case-sensitive.
    fn record(
        &self,
        sound: &str,
    ) -> impl Future<Output = Result<(), LeaderboardError>> + Send;
}
