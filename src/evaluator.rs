use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::store::AlarmStore;

/// One fire event: the alarm that became due and the tick instant it
/// became due at.
#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub alarm_id: u64,
    pub fired_at: NaiveDateTime,
}

/// Decides, once per tick, which alarms are due right now.
///
/// The run-state is the de-duplication guard: the last alarm that fired
/// and the calendar date it fired on. The tick source may present the
/// same matching wall-clock second more than once; the guard makes sure
/// a given (alarm, date) pair produces at most one fire event. The state
/// lives here, not in a global, so tests can drive the evaluator with
/// hand-picked clocks.
#[derive(Debug, Default)]
pub struct Evaluator {
    last_fired: Option<(u64, NaiveDate)>,
}

impl Evaluator {
    #[must_use]
    pub const fn new() -> Self {
        Self { last_fired: None }
    }

    /// Runs one evaluation pass against `now`.
    ///
    /// `now` is truncated to whole seconds; an alarm matches only during
    /// the single second where the clock reads exactly `hh:mm:00`. Due
    /// one-shot alarms are switched inactive after their firing is
    /// recorded. Firings come back in store order.
    pub fn tick(&mut self, store: &mut AlarmStore, now: NaiveDateTime) -> Vec<Firing> {
        let clock = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());
        let today = now.date();
        let weekday = today.weekday();

        let mut fired = Vec::new();
        for alarm in store.iter_mut() {
            if !alarm.is_active() {
                continue;
            }
            if alarm.time() != clock {
                continue;
            }
            if !(alarm.is_one_shot() || alarm.due_on(weekday)) {
                continue;
            }
            // same alarm, same calendar date: already rang this instant
            if self.last_fired == Some((alarm.id(), today)) {
                continue;
            }
            self.last_fired = Some((alarm.id(), today));
            if alarm.is_one_shot() {
                alarm.set_active(false);
            }
            fired.push(Firing {
                alarm_id: alarm.id(),
                fired_at: now,
            });
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{Alarm, Weekdays};
    use chrono::Weekday::{Mon, Wed};
    use chrono::{Datelike, NaiveDate};

    // 2024-01-01 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn at(date: NaiveDate, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, minute, second).unwrap()
    }

    #[test]
    fn one_shot_fires_once_then_goes_inactive() {
        let mut store = AlarmStore::new();
        let id = store.add(Alarm::new(7, 0, Weekdays::NONE).unwrap());
        let mut evaluator = Evaluator::new();

        let fired = evaluator.tick(&mut store, at(monday(), 7, 0, 0));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].alarm_id, id);
        assert!(!store.get(id).unwrap().is_active());

        // next day, same instant: the alarm is off and stays silent
        let next_day = monday().succ_opt().unwrap();
        assert!(evaluator.tick(&mut store, at(next_day, 7, 0, 0)).is_empty());
    }

    #[test]
    fn recurring_alarm_fires_on_its_weekdays_only() {
        let mut store = AlarmStore::new();
        let days = Weekdays::NONE.with(Mon).with(Wed);
        let id = store.add(Alarm::new(8, 30, days).unwrap());
        let mut evaluator = Evaluator::new();

        let monday = monday();
        let tuesday = monday.succ_opt().unwrap();
        let wednesday = tuesday.succ_opt().unwrap();

        assert_eq!(evaluator.tick(&mut store, at(monday, 8, 30, 0)).len(), 1);
        assert!(evaluator.tick(&mut store, at(tuesday, 8, 30, 0)).is_empty());
        assert_eq!(evaluator.tick(&mut store, at(wednesday, 8, 30, 0)).len(), 1);

        // still active, it repeats
        assert!(store.get(id).unwrap().is_active());
    }

    #[test]
    fn same_matching_second_twice_fires_once() {
        let mut store = AlarmStore::new();
        store.add(Alarm::new(9, 0, Weekdays::NONE.with(Mon)).unwrap());
        let mut evaluator = Evaluator::new();

        let instant = at(monday(), 9, 0, 0);
        assert_eq!(evaluator.tick(&mut store, instant).len(), 1);
        assert!(evaluator.tick(&mut store, instant).is_empty());
    }

    #[test]
    fn alarms_sharing_a_time_fire_independently_in_store_order() {
        let mut store = AlarmStore::new();
        let first = store.add(Alarm::new(9, 0, Weekdays::NONE.with(Mon)).unwrap());
        let second = store.add(Alarm::new(9, 0, Weekdays::NONE).unwrap());
        let mut evaluator = Evaluator::new();

        let fired = evaluator.tick(&mut store, at(monday(), 9, 0, 0));
        let ids: Vec<_> = fired.iter().map(|f| f.alarm_id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn matches_only_the_zero_second_of_the_minute() {
        let mut store = AlarmStore::new();
        store.add(Alarm::new(7, 0, Weekdays::NONE).unwrap());
        let mut evaluator = Evaluator::new();

        assert!(evaluator.tick(&mut store, at(monday(), 7, 0, 30)).is_empty());
        assert!(evaluator.tick(&mut store, at(monday(), 6, 59, 59)).is_empty());
        assert_eq!(evaluator.tick(&mut store, at(monday(), 7, 0, 0)).len(), 1);
    }

    #[test]
    fn inactive_alarms_are_never_evaluated() {
        let mut store = AlarmStore::new();
        let id = store.add(Alarm::new(7, 0, Weekdays::NONE.with(Mon)).unwrap());
        store.toggle(id);
        let mut evaluator = Evaluator::new();

        assert!(evaluator.tick(&mut store, at(monday(), 7, 0, 0)).is_empty());
    }

    #[test]
    fn reactivated_one_shot_is_eligible_again() {
        let mut store = AlarmStore::new();
        let id = store.add(Alarm::new(7, 0, Weekdays::NONE).unwrap());
        let mut evaluator = Evaluator::new();

        assert_eq!(evaluator.tick(&mut store, at(monday(), 7, 0, 0)).len(), 1);

        // the user switches it back on; next matching instant rings again
        store.toggle(id);
        let next_monday = monday() + chrono::Days::new(7);
        assert_eq!(next_monday.weekday(), Mon);
        let fired = evaluator.tick(&mut store, at(next_monday, 7, 0, 0));
        assert_eq!(fired.len(), 1);
        assert!(!store.get(id).unwrap().is_active());
    }

    #[test]
    fn subsecond_noise_is_truncated_before_matching() {
        let mut store = AlarmStore::new();
        store.add(Alarm::new(7, 0, Weekdays::NONE).unwrap());
        let mut evaluator = Evaluator::new();

        let noisy = at(monday(), 7, 0, 0)
            .with_nanosecond(250_000_000)
            .unwrap();
        assert_eq!(evaluator.tick(&mut store, noisy).len(), 1);
    }
}
