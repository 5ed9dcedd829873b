//! Plain-text rendering of the sign-up board.
//!
//! ```text
//! Team 1                        Team 2
//! Top: <@1>                     Top: Open
//! JG: Open                      JG: <@4>
//! Mid: <@3>                     Mid: Open
//! Bot: Open                     Bot: Open
//! Support: Open                 Support: Open
//! Fill: <@5>
//!
//! Active (4/10, 1 ready):
//! 1. <@1> (Ready: Ready now)
//! 2. <@3> (Ready: 18:30)
//! 3. <@4>
//! 4. <@5>
//! Reserves:
//! 1. <@6>
//! Lobby codes:
//! - NA04a9
//! Max active players: 10. Lobby resets in: 16:00
//! ```

use std::fmt;

use time::macros::format_description;

use crate::{
    clock::format_countdown,
    coordinator::LobbyView,
    participant::{mention, ParticipantId},
    roles::{Team, TeamComposition},
    store::ReadyAt,
};

const COLUMN: usize = 30;

fn team_lines(team: &TeamComposition) -> Vec<String> {
    let mut lines = vec![team.team.to_string()];
    lines.extend(team.slots().map(|(position, occupant)| {
        let occupant = occupant.map_or_else(|| "Open".to_string(), mention);
        format!("{position}: {occupant}")
    }));
    if !team.unassigned_fill.is_empty() {
        let fill: Vec<_> = team.unassigned_fill.iter().copied().map(mention).collect();
        lines.push(format!("Fill: {}", fill.join(", ")));
    }
    lines
}

impl LobbyView {
    fn ready_label(&self, id: ParticipantId) -> Option<String> {
        let ReadyAt(at) = self.snapshot.readiness.get(&id)?;
        if *at <= self.as_of {
            return Some("Ready now".to_string());
        }
        self.zone
            .to_local(*at)
            .format(format_description!("[hour]:[minute]"))
            .ok()
    }
}

impl fmt::Display for LobbyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let left = team_lines(self.composition(Team::One));
        let right = team_lines(self.composition(Team::Two));
        for i in 0..left.len().max(right.len()) {
            let l = left.get(i).map_or("", String::as_str);
            match right.get(i) {
                Some(r) => writeln!(f, "{l:<COLUMN$}{r}")?,
                None => writeln!(f, "{l}")?,
            }
        }
        writeln!(f)?;

        let active = &self.snapshot.active_ids;
        writeln!(
            f,
            "Active ({}/{}, {} ready):",
            active.len(),
            self.capacity,
            self.ready_count
        )?;
        for (i, id) in active.iter().enumerate() {
            match self.ready_label(*id) {
                Some(ready) => writeln!(f, "{}. {} (Ready: {ready})", i + 1, mention(*id))?,
                None => writeln!(f, "{}. {}", i + 1, mention(*id))?,
            }
        }

        if !self.snapshot.reserve_ids.is_empty() {
            writeln!(f, "Reserves:")?;
            for (i, id) in self.snapshot.reserve_ids.iter().enumerate() {
                writeln!(f, "{}. {}", i + 1, mention(*id))?;
            }
        }

        if !self.codes.is_empty() {
            writeln!(f, "Lobby codes:")?;
            for code in &self.codes {
                writeln!(f, "- {code}")?;
            }
        }

        write!(
            f,
            "Max active players: {}. Lobby resets in: {}",
            self.capacity,
            format_countdown(self.time_until_reset())
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::{macros::datetime, Duration};

    use crate::{
        clock::ManualClock,
        configuration::Configuration,
        coordinator::SignupCoordinator,
        participant::ParticipantId,
        roles::{Position, Team},
    };

    #[test]
    fn renders_full_board() {
        let start = datetime!(2025-02-10 17:00 +13:00);
        let clock = Arc::new(ManualClock::new(start));
        let config = Configuration::new().with_capacity(2);
        let mut lobby = SignupCoordinator::new(&config, clock);
        for id in 1..=3 {
            lobby.on_join_request(ParticipantId(id));
        }
        lobby.on_select_role(ParticipantId(1), Team::One, Position::Top);
        lobby.on_select_role(ParticipantId(2), Team::Two, Position::Fill);
        lobby.on_set_ready_now(ParticipantId(1));
        lobby.on_set_ready_time(ParticipantId(2), start + Duration::minutes(90));
        lobby.on_publish_code("NA04a9".to_string());

        let board = lobby.snapshot().to_string();
        let expected = [
            "Team 1                        Team 2",
            "Top: <@1>                     Top: <@2>",
            "JG: Open                      JG: Open",
            "Mid: Open                     Mid: Open",
            "Bot: Open                     Bot: Open",
            "Support: Open                 Support: Open",
            "",
            "Active (2/2, 1 ready):",
            "1. <@1> (Ready: Ready now)",
            "2. <@2> (Ready: 18:30)",
            "Reserves:",
            "1. <@3>",
            "Lobby codes:",
            "- NA04a9",
            "Max active players: 2. Lobby resets in: 16:00",
        ]
        .join("\n");
        assert_eq!(board, expected);
    }

    #[test]
    fn empty_board_has_open_slots_and_footer() {
        let clock = Arc::new(ManualClock::new(datetime!(2025-02-10 08:30 +13:00)));
        let lobby = SignupCoordinator::new(&Configuration::new(), clock);
        let board = lobby.snapshot().to_string();
        assert!(board.contains("Support: Open                 Support: Open"));
        assert!(board.contains("Active (0/10, 0 ready):"));
        assert!(!board.contains("Reserves:"));
        assert!(board.ends_with("Max active players: 10. Lobby resets in: 00:30"));
    }

    #[test]
    fn ready_times_show_the_wall_clock_of_that_day() {
        // clocks go back overnight, 10:00 the next morning is NZST
        let clock = Arc::new(ManualClock::new(datetime!(2025-04-05 21:00 +13:00)));
        let mut lobby = SignupCoordinator::new(&Configuration::new(), clock);
        lobby.on_join_request(ParticipantId(1));
        lobby.on_set_ready_time(ParticipantId(1), datetime!(2025-04-05 22:00 UTC));

        let board = lobby.snapshot().to_string();
        assert!(board.contains("1. <@1> (Ready: 10:00)"), "{board}");
        assert!(board.ends_with("Lobby resets in: 13:00"), "{board}");
    }
}
