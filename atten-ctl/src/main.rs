//! Step Attenuator Rack Control
//!
//! Loads a rack configuration and runs attenuator commands against it.
//! Several commands can be given in one invocation; they run in order
//! against the same connected rack:
//!
//! ```text
//! atten-ctl rack.json set ap 20 check ap get-channel 0 1
//! ```

mod command;

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use atten_rack::{DriverRegistry, Rack, RackConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
usage: atten-ctl <config.json> <command>...

commands:
  list                               list instruments, attenuators and groups
  status                             instrument properties and group values as JSON
  get <group>                        cached group value
  set <group> <dB>                   set every member of a group
  sync <group>                       re-command the cached group value
  check <group>                      compare hardware against the cached value
  get-channel <instrument> <index>   read one attenuator
  set-channel <instrument> <index> <dB>
                                     set one attenuator";

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "atten_ctl=info,atten_core=info,atten_rack=info,atten_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<()> {
    let Some((config_path, rest)) = args.split_first() else {
        bail!("missing configuration file\n\n{USAGE}");
    };
    if config_path == "-h" || config_path == "--help" {
        println!("{USAGE}");
        return Ok(());
    }

    let commands = command::parse_all(rest).context("invalid command line")?;
    if commands.is_empty() {
        bail!("no commands given\n\n{USAGE}");
    }

    let config = RackConfig::load(config_path)
        .with_context(|| format!("failed to load {config_path}"))?;
    let mut rack = Rack::build(&config, &DriverRegistry::with_simulated())
        .context("failed to build rack")?;
    tracing::info!(
        "Rack ready: {} instruments, {} groups",
        rack.instruments().len(),
        rack.groups().len()
    );

    for cmd in &commands {
        let output = cmd.execute(&mut rack)?;
        if !output.is_empty() {
            println!("{output}");
        }
    }
    Ok(())
}
