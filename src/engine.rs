use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use crate::{
    alarm::{Alarm, Weekdays},
    clock,
    communication::{Message, MessageType},
    config::{Config, Settings},
    error::Result,
    evaluator::Evaluator,
};

/// The alarm engine: owns the shared state, drives the evaluator once a
/// second and reports to the boundary over an event channel.
///
/// All mutations (the control path) and the evaluator pass go through
/// one mutex, so a tick never sees a half-edited alarm list. Saves are
/// handed to a worker thread: disk never delays a tick, and writes are
/// serialized by the channel. A failed save is logged and dropped; the
/// in-memory state stays authoritative and the next mutation retries.
pub struct AlarmEngine {
    state: Arc<Mutex<Config>>,
    events: Sender<Message>,
    saves: Option<Sender<Config>>,
    save_feed: Option<Receiver<Config>>,
    config_path: PathBuf,
    stop: Arc<AtomicBool>,
    tick_handle: Option<JoinHandle<()>>,
    save_handle: Option<JoinHandle<()>>,
}

impl AlarmEngine {
    #[must_use]
    pub fn new(config: Config, config_path: PathBuf, events: Sender<Message>) -> Self {
        let (saves, save_feed) = mpsc::channel();
        Self {
            state: Arc::new(Mutex::new(config)),
            events,
            saves: Some(saves),
            save_feed: Some(save_feed),
            config_path,
            stop: Arc::new(AtomicBool::new(false)),
            tick_handle: None,
            save_handle: None,
        }
    }

    /// Starts the save worker and the tick loop. Idempotent.
    pub fn start(&mut self) {
        if self.tick_handle.is_some() {
            return;
        }
        let Some(saves) = self.saves.clone() else {
            return;
        };

        if let Some(feed) = self.save_feed.take() {
            let path = self.config_path.clone();
            self.save_handle = Some(thread::spawn(move || run_save_worker(&feed, &path)));
        }

        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let mut evaluator = Evaluator::new();
        self.tick_handle = Some(clock::start_tick_loop(
            Arc::clone(&self.stop),
            move |now| {
                let mut config = state.lock().unwrap();
                let fired = evaluator.tick(&mut config.alarms, now);
                if fired.is_empty() {
                    return;
                }
                let mut deactivated = false;
                for firing in &fired {
                    log::info!("alarm {} fired at {}", firing.alarm_id, firing.fired_at);
                    let _ = events.send(Message::new(
                        MessageType::AlarmTriggered {
                            fired_at: firing.fired_at,
                            volume: config.settings.volume,
                            sound: config.settings.sound.clone(),
                        },
                        firing.alarm_id,
                    ));
                    deactivated |= config
                        .alarms
                        .get(firing.alarm_id)
                        .is_some_and(Alarm::is_one_shot);
                }
                // one-shots switched themselves off during the pass:
                // the display refreshes and the change goes to disk
                if deactivated {
                    let _ = events.send(Message::new(
                        MessageType::AlarmListChanged(config.alarms.snapshot()),
                        0,
                    ));
                    let _ = saves.send(config.clone());
                }
            },
        ));
    }

    /// Stops the tick loop, flushes pending saves and joins both threads.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.tick_handle.take() {
            let _ = handle.join();
        }
        // dropping the sender lets the save worker drain and exit
        self.saves = None;
        if let Some(handle) = self.save_handle.take() {
            let _ = handle.join();
        }
    }

    /// Creates and appends a new alarm, returning its id.
    ///
    /// # Errors
    /// [`crate::Error::InvalidAlarm`] when hour or minute is out of
    /// range; the store is untouched in that case.
    pub fn add_alarm(&self, hour: u32, minute: u32, days: Weekdays) -> Result<u64> {
        let alarm = Alarm::new(hour, minute, days)?;
        let mut config = self.state.lock().unwrap();
        let id = config.alarms.add(alarm);
        self.publish(&config);
        Ok(id)
    }

    /// Removes the alarm with `id`; unknown ids are a no-op.
    pub fn remove_alarm(&self, id: u64) {
        let mut config = self.state.lock().unwrap();
        if config.alarms.remove(id) {
            self.publish(&config);
        }
    }

    /// Flips the active flag of the alarm with `id`; unknown ids are a
    /// no-op.
    pub fn toggle_alarm(&self, id: u64) {
        let mut config = self.state.lock().unwrap();
        if config.alarms.toggle(id).is_some() {
            self.publish(&config);
        }
    }

    /// Replaces the settings snapshot and persists it. Volume is clamped
    /// to 0.0..=1.0.
    pub fn update_settings(&self, settings: Settings) {
        let mut config = self.state.lock().unwrap();
        config.settings = settings;
        config.settings.volume = config.settings.volume.clamp(0.0, 1.0);
        self.request_save(&config);
    }

    #[must_use]
    pub fn alarms(&self) -> Vec<Alarm> {
        self.state.lock().unwrap().alarms.snapshot()
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.state.lock().unwrap().settings.clone()
    }

    fn publish(&self, config: &Config) {
        let _ = self.events.send(Message::new(
            MessageType::AlarmListChanged(config.alarms.snapshot()),
            0,
        ));
        self.request_save(config);
    }

    fn request_save(&self, config: &Config) {
        if let Some(saves) = &self.saves {
            let _ = saves.send(config.clone());
        }
    }
}

impl Drop for AlarmEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Writes snapshots as they arrive. Only the newest pending snapshot
/// matters, so a backlog collapses into one write.
fn run_save_worker(feed: &Receiver<Config>, path: &Path) {
    while let Ok(mut snapshot) = feed.recv() {
        while let Ok(newer) = feed.try_recv() {
            snapshot = newer;
        }
        if let Err(e) = snapshot.save(path) {
            log::error!("saving alarms failed (state kept in memory): {e}");
        }
    }
}
