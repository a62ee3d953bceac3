//! The session registry.
//!
//! Owns every live session behind its own mutex. All mutation, whether it
//! comes from an inbound command or from a continuation, goes through
//! [`SessionRegistry::apply`], which locks the session, runs the domain
//! operation and publishes the resulting snapshots before releasing the
//! lock. Snapshots of one session therefore reach the gateway in the order
//! the changes were made. Follow-up work is scheduled after the lock is
//! released.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use fable_core::clock::Clock;
use fable_core::deck::DeckProvider;
use fable_core::error::DomainError;
use fable_core::moral::MoralGenerator;
use fable_core::rng::DeterministicRng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::GameConfig;
use super::continuations;
use super::gateway::BroadcastGateway;
use crate::domain::projection::SessionView;
use crate::domain::random::index_in;
use crate::domain::session::{ContinuationOutcome, FollowUp, GameSession};

/// Length of a join code.
pub const JOIN_CODE_LEN: usize = 6;

const JOIN_CODE_ATTEMPTS: usize = 32;

type SessionHandle = Arc<Mutex<GameSession>>;

/// Live sessions plus the collaborators every session shares.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    deck: Arc<dyn DeckProvider>,
    moral_generator: Arc<dyn MoralGenerator>,
    gateway: Arc<dyn BroadcastGateway>,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn DeterministicRng>>,
    config: GameConfig,
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn poisoned(what: &str) -> DomainError {
    DomainError::Infrastructure(format!("{what} lock poisoned"))
}

/// Join codes are case-insensitive on input.
#[must_use]
pub fn normalize_join_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(
        deck: Arc<dyn DeckProvider>,
        moral_generator: Arc<dyn MoralGenerator>,
        gateway: Arc<dyn BroadcastGateway>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DeterministicRng>,
        config: GameConfig,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            deck,
            moral_generator,
            gateway,
            clock,
            rng: Mutex::new(rng),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn deck(&self) -> &dyn DeckProvider {
        self.deck.as_ref()
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn moral_generator(&self) -> Arc<dyn MoralGenerator> {
        Arc::clone(&self.moral_generator)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().map_or(0, |sessions| sessions.len())
    }

    pub(crate) fn rng(&self) -> Result<MutexGuard<'_, Box<dyn DeterministicRng>>, DomainError> {
        self.rng.lock().map_err(|_| poisoned("rng"))
    }

    fn handle(&self, session_id: &str) -> Result<SessionHandle, DomainError> {
        let code = normalize_join_code(session_id);
        let sessions = self.sessions.lock().map_err(|_| poisoned("registry"))?;
        sessions
            .get(&code)
            .cloned()
            .ok_or(DomainError::SessionNotFound(code))
    }

    /// Opens a new session hosted by `host_name` under a fresh join code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an invalid name and
    /// `DomainError::Infrastructure` if no free join code was found.
    pub(crate) fn open(self: &Arc<Self>, host_name: &str) -> Result<(String, Uuid), DomainError> {
        let (code, host_id) = {
            let mut sessions = self.sessions.lock().map_err(|_| poisoned("registry"))?;
            let code = {
                let mut rng = self.rng()?;
                (0..JOIN_CODE_ATTEMPTS)
                    .map(|_| generate_join_code(&mut **rng))
                    .find(|code| !sessions.contains_key(code))
                    .ok_or_else(|| {
                        DomainError::Infrastructure("no free join code available".to_owned())
                    })?
            };
            let (session, host_id) = GameSession::create(
                code.clone(),
                host_name,
                self.config.settings,
                self.clock.as_ref(),
            )?;
            self.publish(&session);
            sessions.insert(code.clone(), Arc::new(Mutex::new(session)));
            (code, host_id)
        };

        info!(session = %code, host = %host_id, "session opened");
        Ok((code, host_id))
    }

    /// Runs `operation` against the session and publishes fresh snapshots,
    /// both under the session lock, then schedules whatever follow-up work
    /// it produced.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` for an unknown session, or
    /// whatever `operation` rejected the change with.
    pub(crate) fn apply<F>(self: &Arc<Self>, session_id: &str, operation: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut GameSession, &mut dyn DeterministicRng) -> Result<Vec<FollowUp>, DomainError>,
    {
        let handle = self.handle(session_id)?;
        let (code, follow_ups, abandoned) = {
            let mut session = handle.lock().map_err(|_| poisoned("session"))?;
            let follow_ups = {
                let mut rng = self.rng()?;
                operation(&mut session, &mut **rng)?
            };
            // Published under the session lock so a concurrent change
            // cannot overtake this one at the gateway.
            self.publish(&session);
            (session.id().to_owned(), follow_ups, session.human_count() == 0)
        };

        if abandoned {
            self.tear_down(&code);
        } else {
            self.schedule(&code, follow_ups);
        }
        Ok(())
    }

    /// Commits the result of a continuation. A missing session or a stale
    /// ticket drops the work.
    pub(crate) fn commit<F>(self: &Arc<Self>, session_id: &str, commit: F)
    where
        F: FnOnce(&mut GameSession, &mut dyn DeterministicRng, &dyn Clock) -> ContinuationOutcome,
    {
        let clock = Arc::clone(&self.clock);
        let result = self.apply(session_id, |session, rng| {
            match commit(session, rng, clock.as_ref()) {
                ContinuationOutcome::Applied(follow_ups) => Ok(follow_ups),
                ContinuationOutcome::Stale => Err(DomainError::validation("stale continuation")),
            }
        });
        if let Err(err) = result {
            debug!(session = %session_id, error = %err, "continuation dropped");
        }
    }

    /// Reads the session under its lock.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` for an unknown session.
    pub fn inspect<T>(&self, session_id: &str, read: impl FnOnce(&GameSession) -> T) -> Result<T, DomainError> {
        let handle = self.handle(session_id)?;
        let session = handle.lock().map_err(|_| poisoned("session"))?;
        Ok(read(&session))
    }

    /// Sends every human their view of `session`. Callers hold the session
    /// lock, or own a session that is not registered yet.
    fn publish(&self, session: &GameSession) {
        for view in project_for_humans(session) {
            self.gateway.send_to(view.viewer_id, view);
        }
    }

    fn schedule(self: &Arc<Self>, session_id: &str, follow_ups: Vec<FollowUp>) {
        if follow_ups.is_empty() {
            return;
        }
        // The participants are already marked pending, so their work must
        // be spawned even without a usable rng.
        let mut rng = match self.rng() {
            Ok(rng) => Some(rng),
            Err(err) => {
                warn!(session = %session_id, error = %err, "scheduling with minimum delays");
                None
            }
        };
        for follow_up in follow_ups {
            let delay = delay_for(&self.config, &follow_up, rng.as_deref_mut().map(|rng| -> &mut dyn DeterministicRng { &mut **rng }));
            debug!(session = %session_id, ?follow_up, ?delay, "continuation scheduled");
            tokio::spawn(continuations::run(
                Arc::clone(self),
                session_id.to_owned(),
                follow_up,
                delay,
            ));
        }
    }

    fn tear_down(&self, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            if sessions.remove(session_id).is_some() {
                info!(session = %session_id, "session torn down, no humans left");
            }
        }
    }
}

/// How long a continuation waits before committing. Morals wait on the
/// generator instead. Without an rng the shortest delay is used.
fn delay_for(config: &GameConfig, follow_up: &FollowUp, rng: Option<&mut dyn DeterministicRng>) -> Duration {
    let range = match follow_up {
        FollowUp::SimulatedSelection { .. } => config.selection_delay,
        FollowUp::SimulatedVote { .. } => config.vote_delay,
        FollowUp::SimulatedMoral { .. } => return Duration::ZERO,
    };
    rng.map_or_else(|| range.min(), |rng| range.sample(rng))
}

fn project_for_humans(session: &GameSession) -> Vec<SessionView> {
    session
        .participants()
        .iter()
        .filter(|p| p.is_human())
        .map(|p| SessionView::for_participant(session, p.id))
        .collect()
}

fn generate_join_code(rng: &mut dyn DeterministicRng) -> String {
    (0..JOIN_CODE_LEN)
        .map(|_| {
            let offset = u8::try_from(index_in(rng, 0, 25)).unwrap_or(0);
            char::from(b'A' + offset)
        })
        .collect()
}
