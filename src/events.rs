//! Console command parsing and dispatch.

use std::time::Instant;

use bodywatch_types::{AthleteProfile, Channel, MeasurementRecord};
use thiserror::Error;

use crate::app::App;

pub const HELP: &str = "\
Commands:
  start                     start a measurement
  1..7                      measure a channel (7 = ankle, enter manually)
  ankle <cm>                record the ankle height
  list                      show live and recorded measurements
  clear                     delete every recorded measurement
  profile <name> <age> <kg> set the athlete profile
  status                    show the device link
  help                      show this help
  quit                      exit";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Select(Channel),
    Ankle(f64),
    List,
    Clear,
    Profile(AthleteProfile),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "start" | "s" => Command::Start,
        "ankle" | "a" => {
            let [value] = rest.as_slice() else {
                return Err(CommandError::Usage("ankle <cm>"));
            };
            let value = value.parse().map_err(|_| CommandError::Usage("ankle <cm>"))?;
            Command::Ankle(value)
        }
        "list" | "ls" => Command::List,
        "clear" => Command::Clear,
        "profile" => Command::Profile(parse_profile(&rest)?),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => match Channel::from_key(head) {
            Some(channel) if rest.is_empty() => Command::Select(channel),
            _ => return Err(CommandError::Unknown(head.to_string())),
        },
    };
    Ok(Some(command))
}

fn parse_profile(words: &[&str]) -> Result<AthleteProfile, CommandError> {
    const USAGE: &str = "profile <name> <age> <weight>";
    let [name @ .., age, weight] = words else {
        return Err(CommandError::Usage(USAGE));
    };
    if name.is_empty() {
        return Err(CommandError::Usage(USAGE));
    }
    let age = age.parse().map_err(|_| CommandError::Usage(USAGE))?;
    let weight = weight.parse().map_err(|_| CommandError::Usage(USAGE))?;
    Ok(AthleteProfile::new(name.join(" "), age, weight))
}

/// Run a command against the app. Returns text to print, if any.
pub fn handle_command(app: &mut App, command: Command, now: Instant) -> Option<String> {
    match command {
        Command::Start => {
            app.start_measurement(now);
        }
        Command::Select(channel) => {
            app.select_channel(channel, now);
        }
        Command::Ankle(value) => {
            app.manual_ankle_height(value);
        }
        Command::Clear => {
            // Failure is reported as a notification
            let _ = app.clear_history();
        }
        Command::Profile(profile) => app.set_profile(profile),
        Command::List => return Some(render_records(app)),
        Command::Status => return Some(app.link_status()),
        Command::Help => return Some(HELP.to_string()),
        Command::Quit => app.quit(),
    }
    None
}

/// Render every record, live first.
pub fn render_records(app: &App) -> String {
    let records = app.reconciler().records();
    if records.is_empty() {
        return "No measurements yet.".to_string();
    }
    records.iter().map(format_record).collect::<Vec<_>>().join("\n")
}

/// One line per record.
pub fn format_record(record: &MeasurementRecord) -> String {
    let label = match record.id() {
        Some(id) => format!("#{}", id),
        None => "live".to_string(),
    };
    let captured = record.captured();
    let readings = record
        .fields()
        .readings()
        .map(|(channel, value)| format!("{}={}", channel.field_name(), value))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{:<16} {} {:<8} {}", label, captured.date, captured.time, readings)
}
