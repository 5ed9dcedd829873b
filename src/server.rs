//! The lobby service: one exclusive section around the state machine, side effects after it.
//!
//! [`LobbyService`] is what a shell (chat bot, terminal, test) talks to. Its responsibilities:
//!
//! - Checking the actor's identity and capability for each [`Command`]
//! - Applying the command to the [`SignupCoordinator`] under a lock, so transitions never
//!   interleave and reads never observe a half-applied one
//! - Running the resulting [`Effect`]s (persist, announce, notify, refresh) after the lock is
//!   released, so a slow store or chat platform never stalls the next transition
//! - Reporting effect failures without undoing anything: the in-memory lobby is the source of
//!   truth and the store only mirrors it
//!
//! Effects from concurrent dispatches are run one batch at a time. A snapshot older than the
//! last one saved (or a view older than the last one rendered) is skipped, so the store always
//! ends up with the newest state.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lobby_signup::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Configuration::from_env();
//!     let clock = Arc::new(SystemClock::new(config.zone()));
//!     let store = Arc::new(JsonFileStore::new(config.state_file()));
//!     let lobby = LobbyService::open(config, clock, store, Arc::new(LogSink), &OpenDirectory);
//!
//!     let me = Actor::member(42);
//!     lobby.dispatch(me, Command::Join(ParticipantId(42)))?;
//!     lobby.dispatch(me, Command::SetReadyIn(ParticipantId(42), 30))?;
//!     println!("{}", lobby.snapshot());
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex};

use tracing::{info, instrument, trace, warn};

use crate::{
    clock::Clock,
    command::{Actor, Command},
    configuration::Configuration,
    coordinator::{Effect, LobbyView, Outcome, SignupCoordinator},
    error::{EffectFailure, InputError},
    notify::{NotificationSink, Renderer},
    store::{Directory, StateStore},
};

/// Result of a dispatched command whose input was accepted.
#[derive(Debug)]
pub struct Dispatched {
    /// What the transition did.
    pub outcome: Outcome,
    /// Effects that failed. The transition itself stands.
    pub failures: Vec<EffectFailure>,
}

impl Dispatched {
    /// Every effect succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct Published {
    saved_revision: Option<u64>,
    rendered_revision: Option<u64>,
}

/// Thread-safe front of the lobby. See the module documentation.
pub struct LobbyService {
    lobby: Mutex<SignupCoordinator>,
    published: Mutex<Published>,
    config: Configuration,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn NotificationSink>,
    renderers: Vec<Arc<dyn Renderer>>,
}

impl LobbyService {
    /// A service around an empty lobby.
    pub fn new(
        config: Configuration,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let lobby = SignupCoordinator::new(&config, clock.clone());
        Self::with_coordinator(lobby, config, clock, store, sink)
    }

    /// A service around the lobby saved in `store`, rehydrated against `directory`.
    ///
    /// A store that cannot be read is logged and the lobby starts empty.
    #[instrument(skip_all)]
    pub fn open(
        config: Configuration,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn NotificationSink>,
        directory: &dyn Directory,
    ) -> Self {
        let lobby = match store.load() {
            Ok(Some(snapshot)) => {
                SignupCoordinator::restore(&config, clock.clone(), snapshot, directory)
            }
            Ok(None) => SignupCoordinator::new(&config, clock.clone()),
            Err(e) => {
                warn!("could not load saved lobby, starting empty: {e:#}");
                SignupCoordinator::new(&config, clock.clone())
            }
        };
        Self::with_coordinator(lobby, config, clock, store, sink)
    }

    fn with_coordinator(
        lobby: SignupCoordinator,
        config: Configuration,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        trace!(?config);
        Self {
            lobby: Mutex::new(lobby),
            published: Mutex::new(Published::default()),
            config,
            clock,
            store,
            sink,
            renderers: vec![],
        }
    }

    /// Adds something to redraw after every change.
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderers.push(renderer);
        self
    }

    /// Settings the lobby was opened with.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// The lobby's time source.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Authorizes, applies and publishes one command.
    ///
    /// # Errors
    /// Returns the [`InputError`] when `actor` may not issue `command`; nothing changes then.
    pub fn dispatch(&self, actor: Actor, command: Command) -> Result<Dispatched, InputError> {
        if let Err(e) = actor.authorize(&command) {
            info!(?actor, ?command, "rejected: {e}");
            return Err(e);
        }

        let transition = {
            let mut lobby = self.lobby.lock().expect("poisoned");
            lobby.apply(command)
        };

        let failures = self.publish(transition.effects);
        Ok(Dispatched {
            outcome: transition.outcome,
            failures,
        })
    }

    /// Quorum check as of the clock's current instant.
    pub fn tick(&self) -> Dispatched {
        self.system(Command::Tick(self.clock.now()))
    }

    /// Clears the lobby and announces that sign-ups are open.
    pub fn daily_reset(&self) -> Dispatched {
        self.system(Command::DailyReset)
    }

    fn system(&self, command: Command) -> Dispatched {
        let transition = {
            let mut lobby = self.lobby.lock().expect("poisoned");
            lobby.apply(command)
        };
        Dispatched {
            outcome: transition.outcome,
            failures: self.publish(transition.effects),
        }
    }

    /// Renderable state as of now.
    pub fn snapshot(&self) -> LobbyView {
        self.lobby.lock().expect("poisoned").snapshot()
    }

    /// Read access to the state machine, under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&SignupCoordinator) -> R) -> R {
        f(&self.lobby.lock().expect("poisoned"))
    }

    fn publish(&self, effects: Vec<Effect>) -> Vec<EffectFailure> {
        let mut published = self.published.lock().expect("poisoned");
        let mut failures = vec![];

        for effect in effects {
            let name = effect.name();
            let result = match effect {
                Effect::Persist(snapshot) => {
                    if published
                        .saved_revision
                        .is_some_and(|saved| snapshot.revision < saved)
                    {
                        trace!(revision = snapshot.revision, "stale snapshot, not saved");
                        continue;
                    }
                    self.store.save(&snapshot).map(|()| {
                        published.saved_revision = Some(snapshot.revision);
                    })
                }
                Effect::Announce(text) => self.sink.announce(&text),
                Effect::DirectNotify { to, text } => self.sink.direct_notify(to, &text),
                Effect::Refresh(view) => {
                    let revision = view.snapshot.revision;
                    if published
                        .rendered_revision
                        .is_some_and(|rendered| revision < rendered)
                    {
                        trace!(revision, "stale view, not rendered");
                        continue;
                    }
                    published.rendered_revision = Some(revision);
                    // every renderer gets the view; the first error is the one reported
                    let mut result = Ok(());
                    for renderer in &self.renderers {
                        if let Err(e) = renderer.refresh(&view) {
                            if result.is_ok() {
                                result = Err(e);
                            }
                        }
                    }
                    result
                }
            };

            if let Err(error) = result {
                warn!("{name} failed: {error:#}");
                failures.push(EffectFailure {
                    effect: name,
                    error,
                });
            }
        }
        failures
    }
}
