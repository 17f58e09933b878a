//! Command-line commands

use std::fmt::Write as _;

use anyhow::{anyhow, bail, Context, Result};
use atten_core::Attenuator;
use atten_rack::Rack;

/// One command from the command line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Describe the rack
    List,
    /// Rack snapshot as JSON
    Status,
    /// Cached value of a group
    Get { group: String },
    /// Set a whole group
    Set { group: String, value: f64 },
    /// Re-command a group's cached value
    Sync { group: String },
    /// Check a group against hardware
    Check { group: String },
    /// Read one attenuator
    GetChannel { instrument: usize, index: usize },
    /// Set one attenuator
    SetChannel {
        instrument: usize,
        index: usize,
        value: f64,
    },
}

/// Parse a sequence of commands
pub fn parse_all(args: &[String]) -> Result<Vec<Command>> {
    let mut args = args.iter().map(String::as_str);
    let mut commands = Vec::new();

    while let Some(name) = args.next() {
        let mut next = |what: &str| {
            args.next()
                .ok_or_else(|| anyhow!("{name}: missing {what}"))
        };

        let cmd = match name {
            "list" => Command::List,
            "status" => Command::Status,
            "get" => Command::Get {
                group: next("group")?.to_string(),
            },
            "set" => Command::Set {
                group: next("group")?.to_string(),
                value: parse_db(next("value")?)?,
            },
            "sync" => Command::Sync {
                group: next("group")?.to_string(),
            },
            "check" => Command::Check {
                group: next("group")?.to_string(),
            },
            "get-channel" => Command::GetChannel {
                instrument: parse_index(next("instrument")?)?,
                index: parse_index(next("index")?)?,
            },
            "set-channel" => Command::SetChannel {
                instrument: parse_index(next("instrument")?)?,
                index: parse_index(next("index")?)?,
                value: parse_db(next("value")?)?,
            },
            other => bail!("unknown command: {other}"),
        };
        commands.push(cmd);
    }

    Ok(commands)
}

fn parse_db(text: &str) -> Result<f64> {
    text.parse()
        .with_context(|| format!("not an attenuation value: {text}"))
}

fn parse_index(text: &str) -> Result<usize> {
    text.parse()
        .with_context(|| format!("not an index: {text}"))
}

fn channel(rack: &Rack, instrument: usize, index: usize) -> Result<&Attenuator> {
    rack.attenuator(instrument, index)
        .ok_or_else(|| anyhow!("no attenuator at instrument {instrument} index {index}"))
}

fn describe(attenuator: &Attenuator) -> String {
    match attenuator.path() {
        Some(path) => format!("{}[{}] ({})", attenuator.model(), attenuator.index(), path),
        None => format!("{}[{}]", attenuator.model(), attenuator.index()),
    }
}

impl Command {
    /// Run against a rack, returning the text to print
    pub fn execute(&self, rack: &mut Rack) -> Result<String> {
        match self {
            Command::List => Ok(list(rack)),

            Command::Status => Ok(rack.status()?.to_json()?),

            Command::Get { group } => {
                let group = rack.require_group(group)?;
                Ok(format!("{}: {} dB", group.name(), group.get_attenuation()))
            }

            Command::Set { group, value } => {
                let group = rack.require_group_mut(group)?;
                group.set_attenuation(*value)?;
                Ok(format!("{}: set to {} dB", group.name(), value))
            }

            Command::Sync { group } => {
                let group = rack.require_group_mut(group)?;
                group.synchronize()?;
                Ok(format!(
                    "{}: re-commanded {} dB",
                    group.name(),
                    group.get_attenuation()
                ))
            }

            Command::Check { group } => {
                let group = rack.require_group(group)?;
                let state = if group.is_synchronized()? {
                    "synchronized"
                } else {
                    "NOT synchronized"
                };
                Ok(format!("{}: {}", group.name(), state))
            }

            Command::GetChannel { instrument, index } => {
                let attenuator = channel(rack, *instrument, *index)?;
                let value = attenuator.get_attenuation()?;
                Ok(format!("{}: {} dB", describe(attenuator), value))
            }

            Command::SetChannel {
                instrument,
                index,
                value,
            } => {
                let attenuator = channel(rack, *instrument, *index)?;
                attenuator.set_attenuation(*value)?;
                Ok(format!("{}: set to {} dB", describe(attenuator), value))
            }
        }
    }
}

fn list(rack: &Rack) -> String {
    let mut out = String::new();

    for (position, instrument) in rack.instruments().iter().enumerate() {
        let max = match instrument.instrument.max_attenuation() {
            Ok(Some(max)) => format!("{max} dB"),
            Ok(None) => "unknown".to_string(),
            Err(e) => format!("unavailable ({e})"),
        };
        let _ = writeln!(out, "instrument {position}: max {max}");
        for attenuator in &instrument.attenuators {
            let _ = writeln!(
                out,
                "  {} offset {} dB",
                describe(attenuator),
                attenuator.offset()
            );
        }
    }

    for group in rack.groups() {
        let members: Vec<String> = group.iter().map(describe).collect();
        let _ = writeln!(out, "group {}: {}", group.name(), members.join(", "));
    }

    out.trim_end().to_string()
}
