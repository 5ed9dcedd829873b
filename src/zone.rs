//! The lobby's wall clock: a fixed UTC offset, or a POSIX TZ rule with daylight saving.
//!
//! The offset is resolved for every instant, so the daily reset stays at the same wall-clock
//! time across daylight saving changes.
//!
//! Accepted spellings (see [`LobbyZone::from_str`]):
//! - `UTC`, `Z`, `+13:00`, `-03:30`: a fixed offset
//! - `NZST-12NZDT,M9.5.0,M4.1.0/3`, `CET-1CEST,M3.5.0,M10.5.0/3`: a POSIX TZ rule. Offsets count
//!   hours *west* of UTC, as in the `TZ` environment variable. Only `Mm.w.d[/time]` transition
//!   dates are supported.
//! - `Pacific/Auckland` or `NZ`: shorthand for [`LobbyZone::NEW_ZEALAND`]

use std::str::FromStr;

use time::{
    macros::{format_description, offset},
    Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
};

use crate::error::InputError;

/// The day and wall-clock time a daylight saving period starts or ends.
///
/// `Mm.w.d/time`: weekday `d` (0 = Sunday) of week `w` (1 to 5, 5 = last) of month `m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstBoundary {
    month: Month,
    week: u8,
    weekday: u8,
    /// Time after local midnight.
    at: Duration,
}

impl DstBoundary {
    fn date(&self, year: i32) -> Option<Date> {
        let first = Date::from_calendar_date(year, self.month, 1).ok()?;
        let first_weekday = first.weekday().number_days_from_sunday();
        let mut day = 1 + (7 + self.weekday - first_weekday) % 7 + (self.week - 1) * 7;
        let last = self.month.length(year);
        while day > last {
            day -= 7;
        }
        Date::from_calendar_date(year, self.month, day).ok()
    }

    /// The boundary in `year`, read on a wall clock running at `offset`.
    fn instant(&self, year: i32, offset: UtcOffset) -> Option<OffsetDateTime> {
        let midnight = self.date(year)?.midnight().assume_offset(offset);
        midnight.checked_add(self.at)
    }
}

/// A daylight saving period: its offset, and when it starts and ends.
///
/// `start` is read in standard time and `end` in daylight time, as POSIX does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaylightSaving {
    offset: UtcOffset,
    start: DstBoundary,
    end: DstBoundary,
}

impl DaylightSaving {
    fn active_at(&self, instant: OffsetDateTime, standard: UtcOffset) -> bool {
        let Some(local) = instant.checked_to_offset(standard) else {
            return false;
        };
        let year = local.year();
        let (Some(start), Some(end)) = (
            self.start.instant(year, standard),
            self.end.instant(year, self.offset),
        ) else {
            return false;
        };
        if start < end {
            start <= instant && instant < end
        } else {
            // southern hemisphere: the period spans the new year
            instant >= start || instant < end
        }
    }
}

/// Time zone the lobby's reset time and displayed times are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyZone {
    /// Same offset all year round.
    Fixed(UtcOffset),
    /// Standard offset, with a yearly daylight saving period.
    Rule {
        /// Offset outside daylight saving.
        standard: UtcOffset,
        /// The daylight saving period.
        daylight: DaylightSaving,
    },
}

impl LobbyZone {
    /// New Zealand time: `+12:00`, and `+13:00` from the last Sunday of September (02:00) to
    /// the first Sunday of April (03:00).
    pub const NEW_ZEALAND: LobbyZone = LobbyZone::Rule {
        standard: offset!(+12),
        daylight: DaylightSaving {
            offset: offset!(+13),
            start: DstBoundary {
                month: Month::September,
                week: 5,
                weekday: 0,
                at: Duration::hours(2),
            },
            end: DstBoundary {
                month: Month::April,
                week: 1,
                weekday: 0,
                at: Duration::hours(3),
            },
        },
    };

    /// UTC offset in effect at `instant`.
    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        match self {
            LobbyZone::Fixed(offset) => *offset,
            LobbyZone::Rule { standard, daylight } => {
                if daylight.active_at(instant, *standard) {
                    daylight.offset
                } else {
                    *standard
                }
            }
        }
    }

    /// `instant`, expressed in the offset in effect at that instant.
    pub fn to_local(&self, instant: OffsetDateTime) -> OffsetDateTime {
        instant
            .checked_to_offset(self.offset_at(instant))
            .unwrap_or(instant)
    }

    /// The instant the lobby's wall clock reads `time` on `date`.
    ///
    /// A wall time that occurs twice (clocks going back) resolves to the earlier instant. One
    /// skipped by clocks going forward resolves to the same distance past the jump.
    pub fn resolve(&self, date: Date, time: Time) -> OffsetDateTime {
        let wall = PrimitiveDateTime::new(date, time);
        match self {
            LobbyZone::Fixed(offset) => wall.assume_offset(*offset),
            LobbyZone::Rule { standard, daylight } => {
                let as_daylight = wall.assume_offset(daylight.offset);
                if self.offset_at(as_daylight) == daylight.offset {
                    return as_daylight;
                }
                self.to_local(wall.assume_offset(*standard))
            }
        }
    }
}

impl Default for LobbyZone {
    fn default() -> Self {
        LobbyZone::NEW_ZEALAND
    }
}

impl FromStr for LobbyZone {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InputError::InvalidTimeZone(s.to_string());
        let raw = s.trim();
        if raw.eq_ignore_ascii_case("utc") || raw == "Z" {
            return Ok(LobbyZone::Fixed(UtcOffset::UTC));
        }
        if raw.eq_ignore_ascii_case("pacific/auckland") || raw.eq_ignore_ascii_case("nz") {
            return Ok(LobbyZone::NEW_ZEALAND);
        }
        if raw.starts_with(['+', '-']) {
            return UtcOffset::parse(
                raw,
                format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
            )
            .map(LobbyZone::Fixed)
            .map_err(|_| invalid());
        }
        parse_posix(raw).ok_or_else(invalid)
    }
}

fn parse_posix(raw: &str) -> Option<LobbyZone> {
    let mut rule = Cursor { rest: raw };
    rule.name()?;
    let standard = offset_west(rule.clock_time()?)?;
    if rule.rest.is_empty() {
        return Some(LobbyZone::Fixed(standard));
    }

    rule.name()?;
    let daylight = if rule.rest.starts_with(',') {
        UtcOffset::from_whole_seconds(standard.whole_seconds() + 3600).ok()?
    } else {
        offset_west(rule.clock_time()?)?
    };
    if !rule.eat(',') {
        return None;
    }
    let start = rule.boundary()?;
    if !rule.eat(',') {
        return None;
    }
    let end = rule.boundary()?;
    if !rule.rest.is_empty() {
        return None;
    }

    Some(LobbyZone::Rule {
        standard,
        daylight: DaylightSaving {
            offset: daylight,
            start,
            end,
        },
    })
}

/// POSIX offsets count west of Greenwich.
fn offset_west(seconds: i64) -> Option<UtcOffset> {
    UtcOffset::from_whole_seconds(i32::try_from(-seconds).ok()?).ok()
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn eat(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// `NZST` or `<+0530>`.
    fn name(&mut self) -> Option<&'a str> {
        if let Some(quoted) = self.rest.strip_prefix('<') {
            let end = quoted.find('>')?;
            self.rest = &quoted[end + 1..];
            return Some(&quoted[..end]).filter(|name| !name.is_empty());
        }
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.rest.len());
        let name = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(name).filter(|name| name.len() >= 3)
    }

    fn digits(&mut self, max_len: usize) -> Option<&'a str> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 || end > max_len {
            return None;
        }
        let digits = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(digits)
    }

    /// `[+-]hh[:mm[:ss]]`, in seconds.
    fn clock_time(&mut self) -> Option<i64> {
        let sign = if self.eat('-') {
            -1
        } else {
            self.eat('+');
            1
        };
        let mut seconds = 0;
        for (i, unit) in [3600, 60, 1].into_iter().enumerate() {
            if i > 0 && !self.eat(':') {
                break;
            }
            seconds += self.digits(3)?.parse::<i64>().ok()? * unit;
        }
        Some(sign * seconds)
    }

    /// `Mm.w.d[/time]`, transition at 02:00 when no time is given.
    fn boundary(&mut self) -> Option<DstBoundary> {
        if !self.eat('M') {
            return None;
        }
        let month = Month::try_from(self.digits(2)?.parse::<u8>().ok()?).ok()?;
        if !self.eat('.') {
            return None;
        }
        let week = self.digits(1)?.parse::<u8>().ok().filter(|w| (1..=5).contains(w))?;
        if !self.eat('.') {
            return None;
        }
        let weekday = self.digits(1)?.parse::<u8>().ok().filter(|d| *d <= 6)?;
        let at = if self.eat('/') {
            Duration::seconds(self.clock_time()?)
        } else {
            Duration::hours(2)
        };
        Some(DstBoundary {
            month,
            week,
            weekday,
            at,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, time};

    use super::*;

    #[test]
    fn parses_fixed_offsets_and_rules() {
        assert_eq!("UTC".parse::<LobbyZone>(), Ok(LobbyZone::Fixed(UtcOffset::UTC)));
        assert_eq!("+05:30".parse::<LobbyZone>(), Ok(LobbyZone::Fixed(offset!(+5:30))));
        assert_eq!("EST5".parse::<LobbyZone>(), Ok(LobbyZone::Fixed(offset!(-5))));
        assert_eq!(
            "NZST-12NZDT,M9.5.0,M4.1.0/3".parse::<LobbyZone>(),
            Ok(LobbyZone::NEW_ZEALAND)
        );
        assert_eq!("Pacific/Auckland".parse::<LobbyZone>(), Ok(LobbyZone::NEW_ZEALAND));
    }

    #[test]
    fn rejects_malformed_zones() {
        for raw in ["13", "NZST-12NZDT", "NZST-12NZDT,M9.5.0", "NZST-12NZDT,M13.5.0,M4.1.0", "ST-1"] {
            assert_eq!(
                raw.parse::<LobbyZone>(),
                Err(InputError::InvalidTimeZone(raw.to_string())),
                "{raw}"
            );
        }
    }

    #[test]
    fn new_zealand_switches_at_the_boundaries() {
        let nz = LobbyZone::NEW_ZEALAND;
        // clocks go back on 2025-04-06 at 03:00 NZDT (14:00 UTC the day before)
        assert_eq!(nz.offset_at(datetime!(2025-04-05 13:59 UTC)), offset!(+13));
        assert_eq!(nz.offset_at(datetime!(2025-04-05 14:00 UTC)), offset!(+12));
        // clocks go forward on 2025-09-28 at 02:00 NZST
        assert_eq!(nz.offset_at(datetime!(2025-09-27 13:59 UTC)), offset!(+12));
        assert_eq!(nz.offset_at(datetime!(2025-09-27 14:00 UTC)), offset!(+13));
        // summer spans the new year
        assert_eq!(nz.offset_at(datetime!(2026-01-15 00:00 UTC)), offset!(+13));
        assert_eq!(nz.offset_at(datetime!(2025-07-01 00:00 UTC)), offset!(+12));
    }

    #[test]
    fn northern_rule() {
        let cet: LobbyZone = "CET-1CEST,M3.5.0,M10.5.0/3".parse().unwrap();
        assert_eq!(cet.offset_at(datetime!(2025-07-01 12:00 UTC)), offset!(+2));
        assert_eq!(cet.offset_at(datetime!(2025-01-15 12:00 UTC)), offset!(+1));
        assert_eq!(
            cet.to_local(datetime!(2025-07-01 12:00 UTC)),
            datetime!(2025-07-01 14:00 +2)
        );
    }

    #[test]
    fn resolves_repeated_and_skipped_wall_times() {
        let nz = LobbyZone::NEW_ZEALAND;
        assert_eq!(
            nz.resolve(date!(2025-04-06), time!(02:30)),
            datetime!(2025-04-06 02:30 +13:00)
        );
        assert_eq!(
            nz.resolve(date!(2025-09-28), time!(02:30)),
            datetime!(2025-09-28 03:30 +13:00)
        );
        assert_eq!(
            nz.resolve(date!(2025-06-01), time!(09:00)).offset(),
            offset!(+12)
        );
    }
}
