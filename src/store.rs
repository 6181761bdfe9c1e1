use serde::{Deserialize, Serialize};

use crate::alarm::Alarm;

/// Ordered collection of alarms, the single source of truth for the
/// evaluator, the display boundary and persistence.
///
/// Alarms keep their insertion order, which is also display order.
/// Identity is the runtime id handed out by [`add`](Self::add); ids are
/// not persisted, the whole store round-trips as a plain alarm list and
/// ids are reassigned on load.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(from = "Vec<Alarm>", into = "Vec<Alarm>")]
pub struct AlarmStore {
    alarms: Vec<Alarm>,
    next_id: u64,
}

impl AlarmStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `alarm` and returns its id. Duplicate times are allowed,
    /// each alarm rings on its own.
    pub fn add(&mut self, mut alarm: Alarm) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        alarm.assign_id(id);
        self.alarms.push(alarm);
        id
    }

    /// Removes the alarm with `id`, keeping the order of the rest.
    /// Returns false (and changes nothing) when no alarm has that id.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.alarms.len();
        self.alarms.retain(|alarm| alarm.id() != id);
        self.alarms.len() != before
    }

    /// Flips the active flag of the alarm with `id`; returns the new
    /// state, or None when the id is unknown.
    pub fn toggle(&mut self, id: u64) -> Option<bool> {
        let alarm = self.alarms.iter_mut().find(|alarm| alarm.id() == id)?;
        alarm.set_active(!alarm.is_active());
        Some(alarm.is_active())
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id() == id)
    }

    /// Ordered read-only view for one evaluation pass or for display.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Alarm> {
        self.alarms.clone()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Alarm> {
        self.alarms.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}

impl From<Vec<Alarm>> for AlarmStore {
    fn from(alarms: Vec<Alarm>) -> Self {
        let mut store = Self::new();
        for alarm in alarms {
            store.add(alarm);
        }
        store
    }
}

impl From<AlarmStore> for Vec<Alarm> {
    fn from(store: AlarmStore) -> Self {
        store.alarms
    }
}
