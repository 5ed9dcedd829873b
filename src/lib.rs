//! # Lobby Sign-up
//!
//! The state machine behind a daily sign-up board for custom lobbies.
//!
//! It provides:
//! - A capacity-bounded active roster with a FIFO reserve queue and automatic promotion
//!   ([`roster`])
//! - Per-participant "ready at" times and a quorum notification that fires once per episode
//!   ([`readiness`], [`coordinator`])
//! - Team and position selection, with conflicting or `Fill` picks floated into open positions
//!   ([`roles`])
//! - A daily reset on a fixed wall-clock time, daylight saving included ([`scheduler`],
//!   [`zone`])
//! - Persistence of the lobby to a JSON file, and rehydration on start ([`store`])
//!
//! The chat platform is not part of this crate. A shell (bot, terminal, test) feeds
//! [`Command`](crate::command::Command)s to a [`LobbyService`](crate::server::LobbyService) and
//! implements [`NotificationSink`](crate::notify::NotificationSink) and
//! [`Renderer`](crate::notify::Renderer) to hear back.
//!
//! # Documentation Overview
//!
//! - For the transitions themselves and the side effects they request, see [`coordinator`].
//! - For locking, authorization and how side effects are run, see the [`server`] module.
//! - For settings and the environment variables they are read from, see
//!   [`Configuration`](crate::configuration::Configuration).
//! - For the terminal command syntax, see [`parse_line`](crate::command::parse_line).
//!
//! # Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lobby_signup::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Configuration::new().with_capacity(2).with_quorum_threshold(2);
//!     let clock = Arc::new(SystemClock::new(config.zone()));
//!     let lobby = LobbyService::new(config, clock, Arc::new(InMemoryStore::new()), Arc::new(LogSink));
//!
//!     for id in 1..=3 {
//!         lobby.dispatch(Actor::member(id), Command::Join(ParticipantId(id)))?;
//!     }
//!     // the third participant waits in the reserve queue
//!     let view = lobby.snapshot();
//!     assert_eq!(view.snapshot.reserve_ids, vec![ParticipantId(3)]);
//!
//!     // leaving frees a slot for them
//!     lobby.dispatch(Actor::member(1), Command::Leave(ParticipantId(1)))?;
//!     assert_eq!(lobby.snapshot().snapshot.active_ids, vec![ParticipantId(2), ParticipantId(3)]);
//!
//!     println!("{}", lobby.snapshot());
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

pub use anyhow;
mod board;
pub mod clock;
pub mod command;
pub mod configuration;
pub mod coordinator;
pub mod error;
mod logger;
pub mod notify;
pub mod participant;
pub mod readiness;
pub mod roles;
pub mod roster;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod zone;

pub use logger::init_logger;

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use lobby_signup::prelude::*;
/// ```
///
/// Includes:
/// - [`Configuration`](crate::configuration::Configuration)
/// - [`LobbyService`](crate::server::LobbyService)
/// - [`Command`](crate::command::Command) and [`Actor`](crate::command::Actor)
/// - the clocks, stores and sinks a shell needs to wire one up
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::command::{parse_line, Actor, Command};
    pub use crate::configuration::Configuration;
    pub use crate::coordinator::{LobbyView, Outcome};
    pub use crate::error::InputError;
    pub use crate::notify::{LogSink, NotificationSink, RecordingSink, Renderer};
    pub use crate::participant::{Participant, ParticipantId};
    pub use crate::roles::{Position, Team};
    pub use crate::server::LobbyService;
    pub use crate::store::{InMemoryStore, JsonFileStore, OpenDirectory, StateStore};
    pub use crate::zone::LobbyZone;
}
