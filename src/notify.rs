//! Traits the shell implements to hear about the lobby.
//!
//! Both are called after a transition has been committed and outside the lobby lock. An error
//! returned here is logged and reported back to the caller of the transition, nothing more.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use anyhow::bail;
use tracing::info;

use crate::{coordinator::LobbyView, participant::ParticipantId};

/// Where announcements go.
pub trait NotificationSink: Send + Sync {
    /// Broadcast to the sign-up channel.
    fn announce(&self, text: &str) -> anyhow::Result<()>;

    /// Private notice to one participant. Best-effort.
    fn direct_notify(&self, to: ParticipantId, text: &str) -> anyhow::Result<()>;
}

/// Redraws whatever displays the lobby (a pinned message, a terminal, ...).
pub trait Renderer: Send + Sync {
    /// Show `view`. Views arrive in revision order; stale ones are never passed.
    fn refresh(&self, view: &LobbyView) -> anyhow::Result<()>;
}

/// Sends every notification to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn announce(&self, text: &str) -> anyhow::Result<()> {
        info!(target: "lobby::announce", "{text}");
        Ok(())
    }

    fn direct_notify(&self, to: ParticipantId, text: &str) -> anyhow::Result<()> {
        info!(target: "lobby::direct", %to, "{text}");
        Ok(())
    }
}

/// A notification captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Sent with [`NotificationSink::announce`].
    Announcement(String),
    /// Sent with [`NotificationSink::direct_notify`].
    Direct(ParticipantId, String),
}

/// Keeps every notification in memory. Direct notices can be made to fail.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
    refreshes: Mutex<Vec<LobbyView>>,
    fail_direct: AtomicBool,
}

impl RecordingSink {
    /// Nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, direct notices fail and are not recorded.
    pub fn set_fail_direct(&self, fail: bool) {
        self.fail_direct.store(fail, Ordering::Relaxed);
    }

    /// Every delivered notification, in order.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("poisoned").clone()
    }

    /// Delivered announcements only.
    pub fn announcements(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Announcement(text) => Some(text),
                Notice::Direct(..) => None,
            })
            .collect()
    }

    /// Number of views received as a [`Renderer`].
    pub fn refresh_count(&self) -> usize {
        self.refreshes.lock().expect("poisoned").len()
    }

    /// Most recent view received as a [`Renderer`].
    pub fn last_view(&self) -> Option<LobbyView> {
        self.refreshes.lock().expect("poisoned").last().cloned()
    }
}

impl NotificationSink for RecordingSink {
    fn announce(&self, text: &str) -> anyhow::Result<()> {
        self.notices
            .lock()
            .expect("poisoned")
            .push(Notice::Announcement(text.to_string()));
        Ok(())
    }

    fn direct_notify(&self, to: ParticipantId, text: &str) -> anyhow::Result<()> {
        if self.fail_direct.load(Ordering::Relaxed) {
            bail!("cannot send direct messages to {to}");
        }
        self.notices
            .lock()
            .expect("poisoned")
            .push(Notice::Direct(to, text.to_string()));
        Ok(())
    }
}

impl Renderer for RecordingSink {
    fn refresh(&self, view: &LobbyView) -> anyhow::Result<()> {
        self.refreshes.lock().expect("poisoned").push(view.clone());
        Ok(())
    }
}
