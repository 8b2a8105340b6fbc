//! Room actor: an isolated Tokio task that owns one room's participants.
//!
//! Each room runs in its own task and talks to the outside world through
//! an mpsc channel. The task is the only owner of the session registry and
//! the subscriber map, so every mutation is serialized by the command loop.

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use honk_protocol::{Account, AccountId, RoomEvent, ServerMessage, ServerReply};
use honk_session::{Session, SessionRegistry, SocketSender, new_account};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{EventQueue, Leaderboard, RoomConfig, RoomError, Subscription};

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends the command and waits for the answer on it.
pub(crate) enum RoomCommand {
    /// A socket connection asks to enter under `name`.
    Enter {
        account_id: AccountId,
        name: String,
        socket: SocketSender,
        reply: oneshot::Sender<Result<Account, RoomError>>,
    },

    /// Request/response join with no push channel.
    Join {
        name: String,
        reply: oneshot::Sender<Result<Account, RoomError>>,
    },

    /// `from` played `name`.
    Sound { name: String, from: String },

    /// Explicit leave of a subscriber.
    Leave {
        account_id: AccountId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A socket connection went away.
    Disconnect { account_id: AccountId },

    /// Start delivering events into `queue`.
    Subscribe {
        account: Account,
        queue: EventQueue,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A subscriber's queue was torn down.
    Unsubscribe { account_id: AccountId, queue_id: u64 },

    /// Who is in the room.
    Presence { reply: oneshot::Sender<Vec<Account>> },

    /// Stop the room.
    Shutdown,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone: it is a name plus an `mpsc::Sender`. The
/// [`RoomManager`](crate::RoomManager) holds one per room.
#[derive(Clone)]
pub struct RoomHandle {
    name: Arc<str>,
    sender: mpsc::Sender<RoomCommand>,
}

impl fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomHandle")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl RoomHandle {
    /// Returns the room's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.name.to_string())
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| self.unavailable())
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Enters the room from a socket connection.
    ///
    /// On success the `entered` reply has already been pushed into
    /// `socket`, ahead of any broadcast that follows.
    pub async fn enter(
        &self,
        account_id: AccountId,
        name: impl Into<String>,
        socket: SocketSender,
    ) -> Result<Account, RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Enter {
            account_id,
            name,
            socket,
            reply,
        })
        .await?
    }

    /// Joins the room without a socket and returns the new account.
    pub async fn join(
        &self,
        name: impl Into<String>,
    ) -> Result<Account, RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Join { name, reply }).await?
    }

    /// Broadcasts a sound and records it on the leaderboard
    /// (fire-and-forget).
    pub async fn sound(
        &self,
        name: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Sound {
            name: name.into(),
            from: from.into(),
        })
        .await
    }

    /// Removes the subscriber with this account id, plus any session with
    /// the same name, and broadcasts `remove`.
    pub async fn leave(
        &self,
        account_id: AccountId,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { account_id, reply })
            .await?
    }

    /// Drops the socket session for `account_id`, if it entered.
    pub async fn disconnect(
        &self,
        account_id: AccountId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Disconnect { account_id }).await
    }

    /// Subscribes to every room event as `account`.
    ///
    /// `account` must be the one a `join` returned, or carry a free name.
    /// Dropping the returned [`Subscription`] leaves the room.
    pub async fn subscribe(
        &self,
        account: Account,
    ) -> Result<Subscription, RoomError> {
        let weak = self.sender.downgrade();
        let account_id = account.id.clone();
        let queue = EventQueue::with_teardown(move |queue_id| {
            notify_unsubscribed(
                &weak,
                RoomCommand::Unsubscribe {
                    account_id,
                    queue_id,
                },
            );
        });

        // Built before sending so a cancelled caller still tears down.
        let subscription = Subscription::new(account.clone(), queue.clone());
        self.request(|reply| RoomCommand::Subscribe {
            account,
            queue,
            reply,
        })
        .await??;
        Ok(subscription)
    }

    /// Everyone currently in the room.
    pub async fn presence(&self) -> Result<Vec<Account>, RoomError> {
        self.request(|reply| RoomCommand::Presence { reply }).await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }
}

// Runs on whichever task terminates the queue, possibly the actor itself,
// so it must never wait on the channel.
fn notify_unsubscribed(
    weak: &mpsc::WeakSender<RoomCommand>,
    cmd: RoomCommand,
) {
    let Some(sender) = weak.upgrade() else {
        return;
    };
    match sender.try_send(cmd) {
        Ok(()) | Err(TrySendError::Closed(_)) => {}
        Err(TrySendError::Full(cmd)) => {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    let _ = sender.send(cmd).await;
                });
            }
        }
    }
}

/// A pull-based participant.
struct Subscriber {
    account: Account,
    queue: EventQueue,
}

/// Somewhere a broadcast event can go.
enum Destination<'a> {
    Socket(&'a SocketSender),
    Queue(&'a EventQueue),
}

impl Destination<'_> {
    /// Never waits; a gone receiver drops the event.
    fn deliver(&self, event: &RoomEvent) {
        match self {
            Self::Socket(socket) => {
                let _ = socket.send(ServerMessage::from(event.clone()));
            }
            Self::Queue(queue) => {
                queue.push(event.clone());
            }
        }
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<L: Leaderboard> {
    name: Arc<str>,
    config: RoomConfig,
    sessions: SessionRegistry,
    subscribers: HashMap<AccountId, Subscriber>,
    leaderboard: Arc<L>,
    receiver: mpsc::Receiver<RoomCommand>,
    last_activity: Instant,
}

impl<L: Leaderboard> RoomActor<L> {
    /// Runs the actor loop until shutdown or idle eviction.
    async fn run(mut self) {
        tracing::info!(room = %self.name, "room actor started");

        let period = self.config.sweep_interval.max(Duration::from_millis(1));
        let mut sweep = time::interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    self.last_activity = Instant::now();
                    if self.handle_command(cmd).is_break() {
                        tracing::info!(room = %self.name, "room shutting down");
                        break;
                    }
                }
                _ = sweep.tick() => {
                    self.reap_unclaimed_joins();
                    if self.is_idle() {
                        tracing::info!(room = %self.name, "room idle, stopping");
                        break;
                    }
                }
            }
        }

        self.stop();
        tracing::info!(room = %self.name, "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) -> ControlFlow<()> {
        match cmd {
            RoomCommand::Enter {
                account_id,
                name,
                socket,
                reply,
            } => {
                let _ = reply.send(self.handle_enter(account_id, name, socket));
            }
            RoomCommand::Join { name, reply } => {
                let _ = reply.send(self.handle_join(name));
            }
            RoomCommand::Sound { name, from } => {
                self.handle_sound(name, from);
            }
            RoomCommand::Leave { account_id, reply } => {
                let _ = reply.send(self.handle_leave(account_id));
            }
            RoomCommand::Disconnect { account_id } => {
                self.handle_disconnect(&account_id);
            }
            RoomCommand::Subscribe {
                account,
                queue,
                reply,
            } => {
                let _ = reply.send(self.handle_subscribe(account, queue));
            }
            RoomCommand::Unsubscribe {
                account_id,
                queue_id,
            } => {
                self.handle_unsubscribe(account_id, queue_id);
            }
            RoomCommand::Presence { reply } => {
                let _ = reply.send(self.presence());
            }
            RoomCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn handle_enter(
        &mut self,
        account_id: AccountId,
        name: String,
        socket: SocketSender,
    ) -> Result<Account, RoomError> {
        if self.sessions.find(|s| s.account.id == account_id).is_some() {
            return Err(RoomError::AlreadyEntered(account_id));
        }
        self.validate_name(&name)?;

        let account = Account {
            id: account_id,
            name,
        };
        let others: Vec<Account> = self
            .presence()
            .into_iter()
            .filter(|a| a.id != account.id)
            .collect();
        let _ = socket.send(ServerMessage::from(ServerReply::Entered {
            accounts: others,
            self_account: account.clone(),
        }));
        self.sessions
            .add(Session::with_socket(account.clone(), socket));

        tracing::info!(
            room = %self.name,
            account_id = %account.id,
            name = %account.name,
            "participant entered"
        );
        self.broadcast(
            &RoomEvent::Add {
                account: account.clone(),
            },
            Some(&account.id),
        );
        Ok(account)
    }

    fn handle_join(&mut self, name: String) -> Result<Account, RoomError> {
        self.validate_name(&name)?;

        let account = new_account(name);
        self.sessions.add(Session::detached(account.clone()));

        tracing::info!(
            room = %self.name,
            account_id = %account.id,
            name = %account.name,
            "participant joined"
        );
        self.broadcast(
            &RoomEvent::Add {
                account: account.clone(),
            },
            Some(&account.id),
        );
        Ok(account)
    }

    fn handle_sound(&self, name: String, from: String) {
        tracing::debug!(room = %self.name, sound = %name, %from, "sound");
        self.broadcast(
            &RoomEvent::Sound {
                name: name.clone(),
                from,
            },
            None,
        );

        let leaderboard = Arc::clone(&self.leaderboard);
        let room = Arc::clone(&self.name);
        tokio::spawn(async move {
            if let Err(error) = leaderboard.record(&name).await {
                tracing::warn!(
                    room = %room,
                    sound = %name,
                    %error,
                    "leaderboard record failed"
                );
            }
        });
    }

    fn handle_leave(&mut self, account_id: AccountId) -> Result<(), RoomError> {
        let subscriber = self
            .subscribers
            .remove(&account_id)
            .ok_or(RoomError::UnknownAccount(account_id))?;
        self.depart(subscriber);
        Ok(())
    }

    fn handle_disconnect(&mut self, account_id: &AccountId) {
        let removed = self.sessions.remove(|s| s.account.id == *account_id);
        for session in removed {
            tracing::info!(
                room = %self.name,
                account_id = %session.account.id,
                name = %session.account.name,
                "participant disconnected"
            );
            self.broadcast(
                &RoomEvent::Remove {
                    account: session.account,
                },
                None,
            );
        }
    }

    fn handle_subscribe(
        &mut self,
        account: Account,
        queue: EventQueue,
    ) -> Result<(), RoomError> {
        self.admit_subscriber(&account)?;
        tracing::info!(
            room = %self.name,
            account_id = %account.id,
            name = %account.name,
            "subscriber attached"
        );
        let replaced = self
            .subscribers
            .insert(account.id.clone(), Subscriber { account, queue });
        // The old queue's teardown carries a stale queue id and is ignored.
        if let Some(old) = replaced {
            old.queue.terminate();
        }
        Ok(())
    }

    /// A subscriber either resumes an account the room already knows, under
    /// the same name, or brings a fresh account with a free name.
    fn admit_subscriber(&self, account: &Account) -> Result<(), RoomError> {
        let known = self
            .sessions
            .find(|s| s.account.id == account.id)
            .map(|s| &s.account)
            .or_else(|| self.subscribers.get(&account.id).map(|s| &s.account));
        match known {
            Some(existing) if existing.name == account.name => Ok(()),
            Some(_) => {
                tracing::debug!(
                    room = %self.name,
                    account_id = %account.id,
                    name = %account.name,
                    "subscriber name does not match its account"
                );
                Err(RoomError::InvalidName(account.name.clone()))
            }
            None => self.validate_name(&account.name),
        }
    }

    fn handle_unsubscribe(&mut self, account_id: AccountId, queue_id: u64) {
        let current = self
            .subscribers
            .get(&account_id)
            .is_some_and(|s| s.queue.id() == queue_id);
        if !current {
            tracing::debug!(
                room = %self.name,
                %account_id,
                queue_id,
                "stale unsubscribe ignored"
            );
            return;
        }
        if let Some(subscriber) = self.subscribers.remove(&account_id) {
            self.depart(subscriber);
        }
    }

    /// Tears down a subscriber that has already been taken out of the map.
    fn depart(&mut self, subscriber: Subscriber) {
        subscriber.queue.terminate();
        let account = subscriber.account;
        if account.is_named() {
            self.sessions.remove(|s| s.account.name == account.name);
        }
        tracing::info!(
            room = %self.name,
            account_id = %account.id,
            name = %account.name,
            "participant left"
        );
        self.broadcast(&RoomEvent::Remove { account }, None);
    }

    fn validate_name(&self, name: &str) -> Result<(), RoomError> {
        let too_short = name.chars().count() < self.config.min_name_len;
        let taken = self.sessions.find(|s| s.account.name == name).is_some()
            || self.subscribers.values().any(|s| s.account.name == name);
        if too_short || taken {
            tracing::debug!(room = %self.name, %name, too_short, taken, "name rejected");
            return Err(RoomError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// Sessions in registration order, then subscribers that have no
    /// session, sorted by name.
    fn presence(&self) -> Vec<Account> {
        let mut accounts = self.sessions.list_accounts();
        let mut listeners: Vec<Account> = self
            .subscribers
            .values()
            .filter(|s| !accounts.iter().any(|a| a.id == s.account.id))
            .map(|s| s.account.clone())
            .collect();
        listeners.sort_by(|a, b| a.name.cmp(&b.name));
        accounts.extend(listeners);
        accounts
    }

    fn destinations(&self) -> impl Iterator<Item = (&AccountId, Destination<'_>)> {
        let sockets = self.sessions.iter().filter_map(|s| {
            s.socket
                .as_ref()
                .map(|socket| (&s.account.id, Destination::Socket(socket)))
        });
        let queues = self
            .subscribers
            .iter()
            .map(|(id, s)| (id, Destination::Queue(&s.queue)));
        sockets.chain(queues)
    }

    /// Delivers `event` to every destination except `exclude`.
    fn broadcast(&self, event: &RoomEvent, exclude: Option<&AccountId>) {
        let mut delivered = 0usize;
        for (account_id, destination) in self.destinations() {
            if exclude == Some(account_id) {
                continue;
            }
            destination.deliver(event);
            delivered += 1;
        }
        tracing::debug!(room = %self.name, delivered, "broadcast");
    }

    /// Removes `join` sessions that never got a socket or subscriber.
    fn reap_unclaimed_joins(&mut self) {
        let Some(ttl) = self.config.unclaimed_join_ttl else {
            return;
        };
        let subscribers = &self.subscribers;
        let reaped = self.sessions.remove(|s| {
            !s.has_socket()
                && !subscribers.contains_key(&s.account.id)
                && s.age() >= ttl
        });
        for session in reaped {
            tracing::info!(
                room = %self.name,
                account_id = %session.account.id,
                name = %session.account.name,
                "unclaimed join reaped"
            );
            self.broadcast(
                &RoomEvent::Remove {
                    account: session.account,
                },
                None,
            );
        }
    }

    /// Idle means nobody is in the room and no handle besides the
    /// manager's is held. A socket that has not entered yet still holds one.
    fn is_idle(&self) -> bool {
        match self.config.idle_timeout {
            Some(timeout) => {
                self.sessions.is_empty()
                    && self.subscribers.is_empty()
                    && self.receiver.sender_strong_count() <= 1
                    && self.last_activity.elapsed() >= timeout
            }
            None => false,
        }
    }

    /// Closes the command channel and ends every subscription. Socket
    /// sessions see their channel close when the registry drops.
    fn stop(&mut self) {
        self.receiver.close();
        for (_, subscriber) in self.subscribers.drain() {
            subscriber.queue.terminate();
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `config.channel_size` bounds the command channel; callers wait when it
/// is full.
pub(crate) fn spawn_room<L: Leaderboard>(
    name: &str,
    config: RoomConfig,
    leaderboard: Arc<L>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let name: Arc<str> = Arc::from(name);

    let actor = RoomActor {
        name: Arc::clone(&name),
        config,
        sessions: SessionRegistry::new(),
        subscribers: HashMap::new(),
        leaderboard,
        receiver: rx,
        last_activity: Instant::now(),
    };

    tokio::spawn(actor.run());

    RoomHandle { name, sender: tx }
}
