use std::{
    collections::{HashMap, VecDeque},
    error::Error,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
    thread,
};

use clap::{command, Parser, Subcommand};
use rodio::{source::SineWave, Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use souris_alarm::{
    communication::{Message, MessageType},
    Alarm, AlarmEngine, Config, Weekdays,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a fresh default state file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// Add an alarm, e.g. `add 7:30am mon,wed,fri` or `add 19:05`
    Add {
        time: String,
        days: Option<Weekdays>,
    },
    /// Show the saved alarms
    List,
    /// Remove an alarm by the id shown by `list`
    Remove { id: u64 },
    /// Switch an alarm on or off by the id shown by `list`
    Toggle { id: u64 },
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_file_logger::init_logger!("souris_alarm").expect("couldn't initialize logger");

    let args = Args::parse();
    let path = Config::config_path();
    match args.command {
        Some(Command::Init { force }) => {
            if force || !path.exists() {
                Config::new().save(&path)?;
                println!("wrote default state to {}", path.display());
            } else {
                println!(
                    "state file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
        }
        Some(Command::Add { time, days }) => {
            let (hour, minute) = parse_time(&time)?;
            let mut config = Config::load_or_default(&path);
            let id = config
                .alarms
                .add(Alarm::new(hour, minute, days.unwrap_or(Weekdays::NONE))?);
            config.save(&path)?;
            println!("added alarm {id}");
        }
        Some(Command::List) => {
            let config = Config::load_or_default(&path);
            if config.alarms.is_empty() {
                println!("no alarms");
            }
            for alarm in config.alarms.snapshot() {
                println!("{}", describe(&alarm));
            }
        }
        Some(Command::Remove { id }) => {
            let mut config = Config::load_or_default(&path);
            if config.alarms.remove(id) {
                config.save(&path)?;
                println!("removed alarm {id}");
            } else {
                println!("no alarm with id {id}");
            }
        }
        Some(Command::Toggle { id }) => {
            let mut config = Config::load_or_default(&path);
            if let Some(active) = config.alarms.toggle(id) {
                config.save(&path)?;
                println!("alarm {id} is now {}", if active { "on" } else { "off" });
            } else {
                println!("no alarm with id {id}");
            }
        }
        None => run(path)?,
    }
    Ok(())
}

/// Runs the engine in the foreground. Any input line silences whatever
/// is ringing; `quit` shuts the engine down.
fn run(path: PathBuf) -> Result<(), Box<dyn Error>> {
    let config = Config::load_or_default(&path);
    let (tx, rx) = mpsc::channel();
    let silence = tx.clone();
    let mut engine = AlarmEngine::new(config, path, tx);
    engine.start();

    println!("alarm clock running; enter silences, `quit` exits");
    for alarm in engine.alarms() {
        println!("{}", describe(&alarm));
    }

    let dispatcher = thread::spawn(move || run_dispatcher(&rx));

    for line in io::stdin().lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }
        let _ = silence.send(Message::new(MessageType::SilenceAll, 0));
    }

    engine.shutdown();
    drop(engine);
    drop(silence);
    let _ = dispatcher.join();
    Ok(())
}

/// Receives engine events, keeps one sink per ringing alarm and a short
/// history of recent firings.
fn run_dispatcher(events: &Receiver<Message>) {
    // with no audio device the alarm still fires, just silently
    let output = OutputStream::try_default();
    let handle = match &output {
        Ok((_stream, handle)) => Some(handle.clone()),
        Err(e) => {
            log::warn!("no audio output available, alarms will be silent: {e}");
            None
        }
    };

    let mut ringing: HashMap<u64, Sink> = HashMap::new();
    let mut history: VecDeque<String> = VecDeque::new();

    for message in events.iter() {
        match message.kind {
            MessageType::AlarmTriggered {
                fired_at,
                volume,
                sound,
            } => {
                println!(
                    "🔔 alarm {} ringing ({})",
                    message.alarm_id,
                    fired_at.format("%Y-%m-%d %H:%M")
                );
                history.push_front(fired_at.format("%Y-%m-%d %H:%M:%S").to_string());
                history.truncate(10);
                if let Some(handle) = &handle {
                    match build_sink(handle, volume, sound.as_deref()) {
                        Ok(sink) => {
                            ringing.insert(message.alarm_id, sink);
                        }
                        Err(e) => log::error!("couldn't start alert sound: {e}"),
                    }
                }
            }
            MessageType::AlarmStopped => {
                if let Some(sink) = ringing.remove(&message.alarm_id) {
                    sink.stop();
                }
            }
            MessageType::SilenceAll => {
                for (_, sink) in ringing.drain() {
                    sink.stop();
                }
                if !history.is_empty() {
                    let recent: Vec<_> = history.iter().map(String::as_str).collect();
                    println!("recent alarms: {}", recent.join(", "));
                }
            }
            MessageType::AlarmListChanged(alarms) => {
                println!("alarms:");
                for alarm in &alarms {
                    println!("{}", describe(alarm));
                }
            }
        }
    }
}

/// Plays the custom sound when one is set and decodable, otherwise the
/// built-in tone, looping until stopped.
fn build_sink(
    handle: &OutputStreamHandle,
    volume: f32,
    sound: Option<&Path>,
) -> Result<Sink, Box<dyn Error>> {
    let sink = Sink::try_new(handle)?;
    sink.set_volume(volume);
    match sound.and_then(|path| File::open(path).ok()) {
        Some(file) => match Decoder::new(BufReader::new(file)) {
            Ok(source) => sink.append(source.repeat_infinite()),
            Err(e) => {
                log::warn!("couldn't decode custom sound, using the built-in tone: {e}");
                sink.append(alert_tone());
            }
        },
        None => sink.append(alert_tone()),
    }
    sink.play();
    Ok(sink)
}

fn alert_tone() -> impl Source<Item = f32> {
    SineWave::new(1000.0).amplify(0.8)
}

fn describe(alarm: &Alarm) -> String {
    let days = if alarm.is_one_shot() {
        "once".to_string()
    } else {
        alarm.days().to_string()
    };
    let state = if alarm.is_active() { "on" } else { "off" };
    format!(
        "{:>3}  {}  {days:<27}  {state}",
        alarm.id(),
        alarm.time().format("%H:%M")
    )
}

/// Accepts `19:05`, `7:30am` or `12:00pm`; 12-hour input converts the
/// way a clock face does.
fn parse_time(input: &str) -> Result<(u32, u32), String> {
    let lower = input.trim().to_lowercase();
    let (clock, meridiem) = if let Some(rest) = lower.strip_suffix("am") {
        (rest.trim(), Some(false))
    } else if let Some(rest) = lower.strip_suffix("pm") {
        (rest.trim(), Some(true))
    } else {
        (lower.as_str(), None)
    };
    let (hour, minute) = clock
        .split_once(':')
        .ok_or_else(|| format!("expected HH:MM, got `{input}`"))?;
    let mut hour: u32 = hour
        .trim()
        .parse()
        .map_err(|_| format!("bad hour in `{input}`"))?;
    let minute: u32 = minute
        .trim()
        .parse()
        .map_err(|_| format!("bad minute in `{input}`"))?;
    if let Some(pm) = meridiem {
        if !(1..=12).contains(&hour) {
            return Err(format!("12-hour input needs an hour of 1-12, got `{input}`"));
        }
        if pm && hour != 12 {
            hour += 12;
        } else if !pm && hour == 12 {
            hour = 0;
        }
    }
    Ok((hour, minute))
}
