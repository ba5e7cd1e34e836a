//! Line commands for the headless driver

use std::str::FromStr;

use crate::domain::{FmError, GainMode};

pub const HELP: &str = "\
commands:
  tune <MHz>       tune manually (cancels scan)
  up | down        step 100 kHz
  step <kHz>       step by a signed amount
  scan             start the band scan
  stop             stop the band scan
  save <name>      save the current frequency as a station
  station <name>   tune to a saved station
  delete <name>    remove a saved station
  list             list saved stations
  vol <0..1>       set volume
  gain <auto|dB>   set tuner gain
  rec              start/stop recording
  status           print the current status line
  quit             stop the radio and exit";

const STEP_KHZ: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Raw MHz text; validated by the receiver so a bad value keeps the old frequency
    Tune(String),
    Step { delta_hz: f64 },
    Scan,
    StopScan,
    Save(String),
    Station(String),
    Delete(String),
    List,
    Volume(f32),
    Gain(GainMode),
    ToggleRecording,
    Status,
    Help,
    Quit,
}

fn argument<'a>(verb: &str, rest: &'a str) -> Result<&'a str, FmError> {
    if rest.is_empty() {
        return Err(FmError::Config(format!("'{verb}' needs an argument")));
    }
    Ok(rest)
}

impl FromStr for Command {
    type Err = FmError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(v, r)| (v, r.trim()));

        match verb.to_ascii_lowercase().as_str() {
            "tune" | "t" => Ok(Command::Tune(argument(verb, rest)?.to_string())),
            "up" | "+" => Ok(Command::Step { delta_hz: STEP_KHZ * 1e3 }),
            "down" | "-" => Ok(Command::Step { delta_hz: -STEP_KHZ * 1e3 }),
            "step" => {
                let khz: f64 = argument(verb, rest)?
                    .parse()
                    .map_err(|_| FmError::Config(format!("Invalid step '{rest}' (kHz)")))?;
                Ok(Command::Step { delta_hz: khz * 1e3 })
            }
            "scan" => Ok(Command::Scan),
            "stop" => Ok(Command::StopScan),
            "save" => Ok(Command::Save(argument(verb, rest)?.to_string())),
            "station" | "go" => Ok(Command::Station(argument(verb, rest)?.to_string())),
            "delete" | "del" => Ok(Command::Delete(argument(verb, rest)?.to_string())),
            "list" | "ls" => Ok(Command::List),
            "vol" | "volume" => {
                let volume: f32 = argument(verb, rest)?
                    .parse()
                    .map_err(|_| FmError::Config(format!("Invalid volume '{rest}'")))?;
                Ok(Command::Volume(volume))
            }
            "gain" => Ok(Command::Gain(argument(verb, rest)?.parse()?)),
            "rec" | "record" => Ok(Command::ToggleRecording),
            "status" | "s" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "" => Err(FmError::Config("Empty command".into())),
            other => Err(FmError::Config(format!("Unknown command '{other}' (try 'help')"))),
        }
    }
}
