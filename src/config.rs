use std::{
    fs,
    io::{self, Write},
    ops::Not,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{
    error::{Error, Result},
    store::AlarmStore,
};

/// Version of the on-disk schema this build writes.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

impl Not for Theme {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

/// User settings persisted next to the alarm list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    /// Playback volume, 0.0 to 1.0.
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<PathBuf>,
    #[serde(default = "default_font")]
    pub font: String,
    /// Custom alert sound; the dispatcher falls back to a generated tone
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<PathBuf>,
}

const fn default_volume() -> f32 {
    1.0
}

fn default_font() -> String {
    "Segoe UI".to_string()
}

const fn current_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            volume: 1.0,
            background: None,
            font: default_font(),
            sound: None,
        }
    }
}

/// The whole durable snapshot: schema version, settings and the ordered
/// alarm list. One TOML document per installation; missing keys fall
/// back to defaults and unknown keys are ignored, so older builds can
/// read files written by newer ones.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(flatten)]
    pub settings: Settings,
    #[serde(default)]
    pub alarms: AlarmStore,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            settings: Settings::default(),
            alarms: AlarmStore::new(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the snapshot at `path`.
    ///
    /// A missing file is not an error: it yields the default state, the
    /// situation on every first start.
    ///
    /// # Errors
    /// [`Error::CorruptState`] when the file exists but does not parse,
    /// [`Error::Persistence`] when it cannot be read at all.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Persistence(e)),
        };
        let config: Self = toml::from_str(&raw)?;
        if config.version > CONFIG_VERSION {
            log::warn!(
                "state file says version {}, this build writes {CONFIG_VERSION}; reading best-effort",
                config.version
            );
        }
        Ok(config)
    }

    /// [`load`](Self::load), recovering from any failure by substituting
    /// the default state. The engine must start even when the saved
    /// state is unreadable.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            log::warn!(
                "could not load saved state from {}: {e}; starting with defaults",
                path.display()
            );
            Self::default()
        })
    }

    /// Writes the whole snapshot to `path`, replacing any previous one.
    ///
    /// The document is written to a temporary file in the target
    /// directory and renamed over `path`, so a crash mid-save can never
    /// leave a half-written file where the next load expects a snapshot.
    ///
    /// # Errors
    /// [`Error::Encode`] when serialization fails, [`Error::Persistence`]
    /// for any filesystem failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(raw.as_bytes())?;
        tmp.persist(path).map_err(|e| Error::Persistence(e.error))?;
        Ok(())
    }

    #[must_use]
    pub fn config_path() -> PathBuf {
        let mut path = directories::ProjectDirs::from("", "", "souris_alarm")
            .expect("couldn't get config path")
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{Alarm, Weekdays};
    use chrono::Weekday::{Mon, Sat, Wed};

    fn state_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        (dir, path)
    }

    #[test]
    fn missing_file_loads_as_default() {
        let (_dir, path) = state_file();
        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.alarms.is_empty());
    }

    #[test]
    fn empty_state_round_trips() {
        let (_dir, path) = state_file();
        let config = Config::default();
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn full_state_round_trips() {
        let (_dir, path) = state_file();
        let mut config = Config::new();
        config.settings.theme = Theme::Dark;
        config.settings.volume = 0.25;
        config.settings.background = Some(PathBuf::from("/tmp/bg.png"));
        config.settings.font = "Georgia".to_string();
        config.settings.sound = Some(PathBuf::from("/tmp/ring.mp3"));

        config
            .alarms
            .add(Alarm::new(7, 0, Weekdays::NONE.with(Mon).with(Wed)).unwrap());
        config.alarms.add(Alarm::new(7, 0, Weekdays::NONE).unwrap());
        let toggled = config.alarms.add(Alarm::new(22, 45, Weekdays::NONE.with(Sat)).unwrap());
        config.alarms.toggle(toggled);

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        // same alarms, same order, same active flags, same settings
        assert_eq!(loaded, config);
        assert!(!loaded.alarms.get(toggled).unwrap().is_active());
    }

    #[test]
    fn corrupt_file_is_an_error_and_recovery_substitutes_defaults() {
        let (_dir, path) = state_file();
        fs::write(&path, "this is not a snapshot [").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::CorruptState(_))));
        assert_eq!(Config::load_or_default(&path), Config::default());
    }

    #[test]
    fn unknown_fields_do_not_break_loading() {
        let (_dir, path) = state_file();
        fs::write(
            &path,
            "version = 1\nfuture_flag = true\n\n[[alarms]]\ntime = 06:15:00\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.alarms.len(), 1);
        // an absent active flag defaults to on
        assert!(config.alarms.get(1).unwrap().is_active());
    }

    #[test]
    fn save_replaces_the_previous_snapshot_wholesale() {
        let (_dir, path) = state_file();
        let mut config = Config::new();
        config.alarms.add(Alarm::new(6, 0, Weekdays::NONE).unwrap());
        config.save(&path).unwrap();

        config.alarms = AlarmStore::new();
        config.save(&path).unwrap();
        assert!(Config::load(&path).unwrap().alarms.is_empty());
    }
}
