use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::alarm::Alarm;

/// One event from the engine to the boundary. `alarm_id` is 0 for
/// messages that are not about a single alarm.
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageType,
    pub alarm_id: u64,
}

impl Message {
    #[must_use]
    pub const fn new(kind: MessageType, alarm_id: u64) -> Self {
        Self { kind, alarm_id }
    }
}

#[derive(Debug, Clone)]
pub enum MessageType {
    /// An alarm became due. The boundary plays the sound and shows the
    /// alert; the engine only guarantees this arrives once per
    /// (alarm, date) occurrence.
    AlarmTriggered {
        fired_at: NaiveDateTime,
        volume: f32,
        sound: Option<PathBuf>,
    },
    /// The alarm list changed (mutation or one-shot auto-deactivation);
    /// the display should refresh from this snapshot.
    AlarmListChanged(Vec<Alarm>),
    /// Stop the ringing alarm `alarm_id`.
    AlarmStopped,
    /// Stop every currently ringing alarm.
    SilenceAll,
}
