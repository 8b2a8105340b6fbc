//! Room manager: creates, tracks, and hands out rooms by name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::room::spawn_room;
use crate::{Leaderboard, RoomConfig, RoomHandle};

/// Owns every live room in the process, keyed by name.
///
/// This is the entry point for room operations from the transport shims.
/// Rooms are created on first reference. A room whose actor has stopped
/// (idle eviction or shutdown) is replaced by a fresh, empty one the next
/// time its name is used. Stopped rooms are forgotten whenever a new
/// room is spawned, so client-chosen names do not pile up.
pub struct RoomManager<L: Leaderboard> {
    rooms: HashMap<String, RoomHandle>,
    config: RoomConfig,
    leaderboard: Arc<L>,
}

impl<L: Leaderboard> RoomManager<L> {
    /// Creates a manager whose rooms all use `config` and report sounds
    /// to `leaderboard`.
    pub fn new(config: RoomConfig, leaderboard: Arc<L>) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            leaderboard,
        }
    }

    /// Returns the handle for `name`, spawning the room if it does not
    /// exist or has stopped.
    pub fn room(&mut self, name: &str) -> RoomHandle {
        if let Some(handle) = self.rooms.get(name) {
            if !handle.is_closed() {
                return handle.clone();
            }
            tracing::debug!(room = %name, "replacing stopped room");
        }

        let pruned = self.prune_closed();
        if pruned > 0 {
            tracing::debug!(pruned, "forgot stopped rooms");
        }
        let handle = spawn_room(
            name,
            self.config.clone(),
            Arc::clone(&self.leaderboard),
        );
        self.rooms.insert(name.to_string(), handle.clone());
        tracing::info!(room = %name, rooms = self.rooms.len(), "room created");
        handle
    }

    /// Shuts every room down. Ends all subscriptions and closes every
    /// socket session's channel.
    pub async fn shutdown_all(&mut self) {
        for (name, handle) in self.rooms.drain() {
            let _ = handle.shutdown().await;
            tracing::debug!(room = %name, "room shut down");
        }
    }

    /// Forgets rooms whose actors have stopped. Returns how many were
    /// dropped.
    pub fn prune_closed(&mut self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, handle| !handle.is_closed());
        before - self.rooms.len()
    }
}
