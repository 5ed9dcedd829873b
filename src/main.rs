//! Terminal shell for the lobby.
//!
//! Reads one command per line on stdin, e.g. `42 join`, `42 ready in 30m`, `42 role 1 mid`,
//! `7! kick 42`, `sys reset`. `board` prints the board, `quit` exits. Settings come from the
//! `LOBBY_*` environment variables.

use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

use lobby_signup::{prelude::*, scheduler};
use tracing::{error, info};

/// Prints announcements and direct notices to stdout.
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn announce(&self, text: &str) -> anyhow::Result<()> {
        println!("[announce] {text}");
        Ok(())
    }

    fn direct_notify(&self, to: ParticipantId, text: &str) -> anyhow::Result<()> {
        println!("[to {to}] {text}");
        Ok(())
    }
}

/// Prints the whole board after every change.
struct ConsoleBoard;

impl Renderer for ConsoleBoard {
    fn refresh(&self, view: &LobbyView) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{view}")?;
        writeln!(out)?;
        Ok(())
    }
}

const HELP: &str = "\
<id>[!] join | leave | ready [now | in <offset> | at <rfc3339>] | role <team> <position>
<id>!   kick <id> | code <text>
sys     tick | reset | board-ref <ref>
board | help | quit";

fn main() -> anyhow::Result<()> {
    let config = Configuration::from_env();
    if config.log() {
        lobby_signup::init_logger()?;
    }

    let clock = Arc::new(SystemClock::new(config.zone()));
    let store = Arc::new(JsonFileStore::new(config.state_file()));
    let verbose = config.verbose();
    let mut service = LobbyService::open(config, clock.clone(), store, Arc::new(ConsoleSink), &OpenDirectory);
    if verbose {
        service = service.with_renderer(Arc::new(ConsoleBoard));
    }
    let service = Arc::new(service);
    let timers = scheduler::start(service.clone())?;
    info!("lobby shell started");

    println!("{}\n", service.snapshot());
    for line in io::stdin().lock().lines() {
        let line = line?;
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "board" => println!("{}\n", service.snapshot()),
            line => match parse_line(line, clock.now()) {
                Ok((actor, command)) => match service.dispatch(actor, command) {
                    Ok(done) => {
                        println!("{:?}", done.outcome);
                        for failure in &done.failures {
                            error!("{failure}");
                            println!("warning: {failure}");
                        }
                    }
                    Err(e) => println!("rejected: {e}"),
                },
                Err(e) => println!("invalid command: {e} (try `help`)"),
            },
        }
    }

    timers.stop();
    Ok(())
}
