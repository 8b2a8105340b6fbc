//! The session registry: the authoritative set of sessions in one room.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself. It is owned by a single
//! room actor, and every mutation goes through that actor's command loop.
//! The registry is a plain data structure and never fails; checking name
//! uniqueness before [`add`](SessionRegistry::add) is the caller's job.

use honk_protocol::Account;

use crate::Session;

/// In-memory collection of sessions, in registration order.
///
/// A `Vec` rather than a map: rooms are small, lookups are by arbitrary
/// predicate (id or name), and the roster should come back in join order.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<Session>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a session. Does not check name uniqueness.
    pub fn add(&mut self, session: Session) {
        tracing::debug!(
            account_id = %session.account.id,
            name = %session.account.name,
            socket = session.has_socket(),
            "session registered"
        );
        self.sessions.push(session);
    }

    /// Removes every session matching `predicate` and hands them back, so
    /// the caller can decide whether a `remove` broadcast is due.
    pub fn remove<F>(&mut self, mut predicate: F) -> Vec<Session>
    where
        F: FnMut(&Session) -> bool,
    {
        let (removed, kept): (Vec<Session>, Vec<Session>) =
            std::mem::take(&mut self.sessions)
                .into_iter()
                .partition(|s| predicate(s));
        self.sessions = kept;
        removed
    }

    /// Returns the first session matching `predicate`.
    pub fn find<F>(&self, mut predicate: F) -> Option<&Session>
    where
        F: FnMut(&Session) -> bool,
    {
        self.sessions.iter().find(|s| predicate(s))
    }

    /// Snapshot of every registered account, in registration order.
    pub fn list_accounts(&self) -> Vec<Account> {
        self.sessions.iter().map(|s| s.account.clone()).collect()
    }

    /// Iterates over the registered sessions.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use super::*;
    use crate::new_account;
    use honk_protocol::AccountId;

    fn registry_with(names: &[&str]) -> SessionRegistry {
        let mut registry = SessionRegistry::new();
        for name in names {
            registry.add(Session::detached(new_account(*name)));
        }
        registry
    }

    // =====================================================================
    // add() / list_accounts()
    // =====================================================================

    #[test]
    fn test_add_keeps_registration_order() {
        let registry = registry_with(&["amy", "bob", "cat"]);

        let names: Vec<String> =
            registry.list_accounts().into_iter().map(|a| a.name).collect();
        assert_eq!(names, ["amy", "bob", "cat"]);
    }

    #[test]
    fn test_add_does_not_enforce_unique_names() {
        // Uniqueness is the coordinator's job; the registry stores what
        // it is given.
        let registry = registry_with(&["amy", "amy"]);
        assert_eq!(registry.len(), 2);
    }

    // =====================================================================
    // find()
    // =====================================================================

    #[test]
    fn test_find_by_name_returns_matching_session() {
        let registry = registry_with(&["amy", "bob"]);

        let found = registry.find(|s| s.account.name == "bob");
        assert_eq!(found.map(|s| s.account.name.as_str()), Some("bob"));
    }

    #[test]
    fn test_find_missing_returns_none() {
        let registry = registry_with(&["amy"]);
        assert!(registry.find(|s| s.account.name == "zed").is_none());
    }

    // =====================================================================
    // remove()
    // =====================================================================

    #[test]
    fn test_remove_by_id_returns_removed_sessions() {
        let mut registry = registry_with(&["amy", "bob"]);
        let bob_id = registry.list_accounts()[1].id.clone();

        let removed = registry.remove(|s| s.account.id == bob_id);

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].account.name, "bob");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_by_name_removes_all_matches() {
        let mut registry = registry_with(&["amy", "bob", "amy"]);

        let removed = registry.remove(|s| s.account.name == "amy");

        assert_eq!(removed.len(), 2);
        assert_eq!(registry.list_accounts()[0].name, "bob");
    }

    #[test]
    fn test_remove_no_match_leaves_registry_untouched() {
        let mut registry = registry_with(&["amy"]);

        let removed = registry.remove(|s| s.account.id == AccountId::new("nope"));

        assert!(removed.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_len_and_is_empty_track_sessions() {
        let mut registry = SessionRegistry::new();
        assert!(registry.is_empty());

        registry.add(Session::detached(new_account("amy")));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }
}
