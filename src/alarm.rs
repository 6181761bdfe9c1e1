use std::{fmt, str::FromStr};

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Weekday recurrence mask, one flag per day of the week.
///
/// Stored Sunday-first: slot 0 is Sunday, slot 6 is Saturday. An empty
/// mask means the owning alarm rings once and then switches itself off.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Weekdays([bool; 7]);

/// Sunday-first slot of `day`: 0 = Sunday .. 6 = Saturday.
///
/// chrono numbers weekdays Monday-first; every lookup in the crate goes
/// through this one conversion so the two conventions can never drift.
fn slot(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

impl Weekdays {
    pub const NONE: Self = Self([false; 7]);

    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        self.0[slot(day)]
    }

    pub fn set(&mut self, day: Weekday) {
        self.0[slot(day)] = true;
    }

    #[must_use]
    pub fn with(mut self, day: Weekday) -> Self {
        self.set(day);
        self
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        !self.0.iter().any(|set| *set)
    }
}

impl fmt::Display for Weekdays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, set) in DAY_NAMES.iter().zip(self.0) {
            if set {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl FromStr for Weekdays {
    type Err = String;

    /// Parses a comma separated day list like `mon,wed,fri`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut days = Self::NONE;
        for part in s.split(',') {
            let part = part.trim().to_lowercase();
            if part.is_empty() {
                continue;
            }
            let found = DAY_NAMES
                .iter()
                .position(|name| part.starts_with(name))
                .ok_or_else(|| format!("unknown weekday: {part}"))?;
            days.0[found] = true;
        }
        Ok(days)
    }
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

/// A single alarm: a wall-clock time of day, the weekdays it repeats on
/// and whether it is currently switched on.
///
/// Time and recurrence never change after construction; editing an alarm
/// is remove plus re-add. The id is a runtime handle assigned by the
/// store and is not persisted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Alarm {
    #[serde(skip)]
    id: u64,
    #[serde(with = "toml_datetime_compat")]
    time: NaiveTime,
    #[serde(default)]
    days: Weekdays,
    #[serde(default = "always_true")]
    active: bool,
}

impl Alarm {
    /// Creates an active alarm for `hour:minute` repeating on `days`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAlarm`] when the hour is not 0-23 or the
    /// minute is not 0-59.
    pub fn new(hour: u32, minute: u32, days: Weekdays) -> Result<Self> {
        let time =
            NaiveTime::from_hms_opt(hour, minute, 0).ok_or(Error::InvalidAlarm { hour, minute })?;
        Ok(Self {
            id: 0,
            time,
            days,
            active: true,
        })
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: u64) {
        self.id = id;
    }

    /// The match instant within a day: seconds are always zero.
    #[must_use]
    pub const fn time(&self) -> NaiveTime {
        self.time
    }

    #[must_use]
    pub const fn days(&self) -> Weekdays {
        self.days
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// An alarm with no repeat days rings once, then goes inactive.
    #[must_use]
    pub fn is_one_shot(&self) -> bool {
        self.days.is_empty()
    }

    #[must_use]
    pub fn due_on(&self, day: Weekday) -> bool {
        self.days.contains(day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday::{Fri, Mon, Sat, Sun, Thu, Tue, Wed};

    #[test]
    fn accepts_full_time_range() {
        for hour in 0..24 {
            for minute in 0..60 {
                assert!(Alarm::new(hour, minute, Weekdays::NONE).is_ok());
            }
        }
    }

    #[test]
    fn rejects_out_of_range_times() {
        for (hour, minute) in [(24, 0), (0, 60), (25, 61), (99, 0)] {
            assert!(matches!(
                Alarm::new(hour, minute, Weekdays::NONE),
                Err(Error::InvalidAlarm { .. })
            ));
        }
    }

    #[test]
    fn empty_mask_means_one_shot() {
        let once = Alarm::new(7, 0, Weekdays::NONE).unwrap();
        assert!(once.is_one_shot());

        let weekly = Alarm::new(7, 0, Weekdays::NONE.with(Mon)).unwrap();
        assert!(!weekly.is_one_shot());
    }

    #[test]
    fn new_alarms_start_active() {
        assert!(Alarm::new(6, 30, Weekdays::NONE).unwrap().is_active());
    }

    #[test]
    fn sunday_first_slots_for_every_chrono_weekday() {
        // the Monday-first vs Sunday-first mismatch is the classic
        // off-by-one here, so pin down all seven conversions
        let expected = [
            (Sun, 0),
            (Mon, 1),
            (Tue, 2),
            (Wed, 3),
            (Thu, 4),
            (Fri, 5),
            (Sat, 6),
        ];
        for (day, index) in expected {
            assert_eq!(slot(day), index, "{day} should land in slot {index}");
        }
    }

    #[test]
    fn mask_lookup_matches_set_days() {
        let days = Weekdays::NONE.with(Mon).with(Wed);
        assert!(days.contains(Mon));
        assert!(days.contains(Wed));
        assert!(!days.contains(Sun));
        assert!(!days.contains(Sat));
    }

    #[test]
    fn parses_day_lists() {
        let days: Weekdays = "mon,wed,fri".parse().unwrap();
        assert!(days.contains(Mon) && days.contains(Wed) && days.contains(Fri));
        assert!(!days.contains(Tue));

        // long names and mixed case are fine
        let days: Weekdays = "Saturday, Sunday".parse().unwrap();
        assert!(days.contains(Sat) && days.contains(Sun));

        assert!("mon,funday".parse::<Weekdays>().is_err());
    }

    #[test]
    fn displays_set_days_in_week_order() {
        let days = Weekdays::NONE.with(Fri).with(Sun).with(Tue);
        assert_eq!(days.to_string(), "sun,tue,fri");
    }
}
