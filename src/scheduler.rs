//! Timers driving the lobby: a periodic quorum check and the daily reset.
//!
//! Both run on their own thread and go through [`LobbyService`] like any other command, so they
//! serialize with user commands. A timer that fires late fires once; missed ticks or resets are
//! not replayed.
//!
//! The reset timer re-reads the clock at least once a minute while it waits, so a clock that is
//! adjusted (or a manual clock moved by a test) is noticed without waiting out the old deadline.

use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::Context;
use tracing::{debug, info, trace, warn};

use crate::{clock::next_reset_after, server::LobbyService};

const RESET_RECHECK: Duration = Duration::from_secs(60);

/// Running timers. Dropping the handle also stops them, without waiting.
pub struct SchedulerHandle {
    stop: Vec<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops both timers and waits for their threads.
    pub fn stop(self) {
        for tx in &self.stop {
            // a timer that already exited has dropped its receiver
            let _ = tx.send(());
        }
        for thread in self.threads {
            if thread.join().is_err() {
                warn!("a timer thread panicked");
            }
        }
        debug!("timers stopped");
    }
}

/// Starts the tick and daily reset timers for `service`.
///
/// Intervals and the reset time come from the service's configuration.
pub fn start(service: Arc<LobbyService>) -> anyhow::Result<SchedulerHandle> {
    let (tick_tx, tick_rx) = mpsc::channel();
    let (reset_tx, reset_rx) = mpsc::channel();

    let tick = {
        let service = service.clone();
        thread::Builder::new()
            .name("lobby-tick".to_string())
            .spawn(move || run_ticks(&service, tick_rx))
            .context("could not spawn the tick timer")?
    };
    let reset = thread::Builder::new()
        .name("lobby-reset".to_string())
        .spawn(move || run_resets(&service, reset_rx))
        .context("could not spawn the reset timer")?;

    Ok(SchedulerHandle {
        stop: vec![tick_tx, reset_tx],
        threads: vec![tick, reset],
    })
}

fn run_ticks(service: &LobbyService, stop: Receiver<()>) {
    let interval = service.config().tick_interval();
    info!(?interval, "tick timer started");
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let done = service.tick();
                trace!(outcome = ?done.outcome, "tick");
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn run_resets(service: &LobbyService, stop: Receiver<()>) {
    let reset_time = service.config().reset_time();
    let zone = service.config().zone();
    let mut due = next_reset_after(service.clock().now(), reset_time, &zone);
    debug!(%due, "next daily reset");
    loop {
        let now = service.clock().now();
        let wait = Duration::try_from(due - now)
            .unwrap_or(Duration::ZERO)
            .min(RESET_RECHECK);

        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {
                let now = service.clock().now();
                if now < due {
                    continue;
                }
                let done = service.daily_reset();
                trace!(outcome = ?done.outcome, "daily reset");
                due = next_reset_after(now, reset_time, &zone);
                debug!(%due, "next daily reset");
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
