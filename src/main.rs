//! `grbllink [--config PATH] [ADDRESS]`
//!
//! Line-oriented console: anything typed is queued as a command, lines
//! starting with `:` are console commands (`:help` lists them).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use grbllink::{
    init_logging, Axis, Config, ConnectionPhase, ControllerEvent, ControllerHandle,
    JogDirection, NetworkConnector, BUILD_DATE, VERSION,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

const HELP: &str = "\
:status                 show the current snapshot
:jog <axis> <mm> [feed] incremental jog
:run <axis> <+|-> [feed] continuous jog, stop with :cancel
:cancel                 cancel a jog
:hold / :resume         feed hold / cycle start
:unlock / :home         $X / $H
:reset                  soft reset
:settings               reload $$
:quit                   disconnect and exit";

struct Args {
    config: Option<PathBuf>,
    address: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config: None,
        address: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--version" | "-V" => {
                println!("grbllink {} ({})", VERSION, BUILD_DATE);
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => bail!("unknown option {}", flag),
            address => args.address = Some(address.to_string()),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = parse_args()?;

    let path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load_or_default(&path)
        .with_context(|| format!("loading {}", path.display()))?;

    let address = args
        .address
        .or_else(|| config.connection.address.clone())
        .context("no controller address given and none configured")?;

    let controller = ControllerHandle::spawn(config.to_controller_config(), Arc::new(NetworkConnector))?;
    tokio::spawn(log_events(controller.subscribe()));

    controller.connect(&address).await?;
    let snapshot = controller
        .wait_for_phase(ConnectionPhase::Ready, Duration::from_secs(30))
        .await?;
    match &snapshot.firmware {
        Some(firmware) => println!("connected to {} at {}", firmware, address),
        None => println!("connected at {}", address),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match run_line(&controller, &config, line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("{}", e),
        }
    }

    controller.shutdown().await?;
    Ok(())
}

/// Returns `false` when the console should exit
async fn run_line(controller: &ControllerHandle, config: &Config, line: &str) -> anyhow::Result<bool> {
    let Some(console) = line.strip_prefix(':') else {
        let ticket = controller.submit(line).await?;
        tokio::spawn(async move {
            let command = ticket.command().to_string();
            match ticket.wait().await {
                Ok(_) => println!("{}: ok", command),
                Err(e) => println!("{}: {}", command, e),
            }
        });
        return Ok(true);
    };

    let words: Vec<&str> = console.split_whitespace().collect();
    match words.as_slice() {
        ["quit"] | ["q"] => return Ok(false),
        ["help"] => println!("{}", HELP),
        ["status"] => print_status(controller),
        ["cancel"] => controller.cancel_jog().await?,
        ["hold"] => controller.feed_hold().await?,
        ["resume"] => controller.cycle_start().await?,
        ["reset"] => controller.reset().await?,
        ["unlock"] => {
            controller.unlock().await?;
        }
        ["home"] => {
            controller.home().await?;
        }
        ["settings"] => {
            controller.reload_settings().await?;
        }
        ["jog", axis, distance, rest @ ..] => {
            let axis = parse_axis(axis)?;
            let distance: f64 = distance.parse().context("distance must be a number")?;
            let feed = parse_feed(rest, config)?;
            controller.request_jog(axis, distance, feed).await?;
        }
        ["run", axis, direction, rest @ ..] => {
            let axis = parse_axis(axis)?;
            let direction = match *direction {
                "+" => JogDirection::Positive,
                "-" => JogDirection::Negative,
                other => bail!("direction must be + or -, got {}", other),
            };
            let feed = parse_feed(rest, config)?;
            controller.request_continuous_jog(axis, direction, feed).await?;
        }
        _ => bail!("unknown console command, try :help"),
    }
    Ok(true)
}

fn parse_axis(text: &str) -> anyhow::Result<Axis> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => Axis::from_letter(letter).context("unknown axis"),
        _ => bail!("axis must be a single letter"),
    }
}

fn parse_feed(rest: &[&str], config: &Config) -> anyhow::Result<f64> {
    match rest {
        [] => Ok(config.jog.default_feed_rate),
        [feed] => feed.parse().context("feed rate must be a number"),
        _ => bail!("too many arguments"),
    }
}

fn print_status(controller: &ControllerHandle) {
    let snapshot = controller.snapshot();
    let status = &snapshot.status;
    println!("phase: {}  mode: {}", snapshot.phase, status.mode);
    if let Some(mpos) = &status.machine_position {
        println!("MPos: {}", mpos);
    }
    if let Some(wpos) = &status.work_position {
        println!("WPos: {}", wpos);
    }
    if let (Some(feed), Some(spindle)) = (status.feed_rate, status.spindle_speed) {
        println!("feed: {}  spindle: {}", feed, spindle);
    }
    for alarm in &snapshot.alarms {
        println!("alarm: {} {}", alarm.code.map(|c| c.to_string()).unwrap_or_default(), alarm.name);
    }
    if let Some(error) = &snapshot.last_error {
        println!("last error: {}", error);
    }
    println!(
        "settings: {}  pending commands: {}",
        snapshot.configuration.len(),
        snapshot.pending_commands
    );
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<ControllerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::debug!("{}", event.description()),
            Err(RecvError::Lagged(skipped)) => tracing::warn!("Event log skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
