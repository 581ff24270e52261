//! `lightcraft-cli` – Lightcraft relay command line
//!
//! Streams one rigid body from a motion source to a Previzion tracker over a
//! serial link.
//!
//! ```text
//! lightcraft [SOURCE] [SERIAL_PORT] [test]
//! lightcraft init
//! ```
//!
//! 1. Loads `~/.lightcraft/config.toml` (defaults when absent), applies
//!    `LIGHTCRAFT_*` env overrides and then the positional arguments.
//! 2. Opens the serial port and starts the delivery thread.
//! 3. Runs the operator console until `q`, Ctrl-C, or the source ends.
//! 4. Prints the session statistics.  Any unrecoverable error exits with
//!    status 1.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use lightcraft_hal::serial::{SerialSettings, SerialTransport};
use lightcraft_middleware::replay::ReplaySource;
use lightcraft_middleware::sim_source::SimSource;
use lightcraft_middleware::source::MotionSource;
use lightcraft_runtime::driver::{StreamStats, StreamingDriver};
use lightcraft_runtime::session::Session;
use lightcraft_types::RelayError;

use config::{Command, Config, SourceKind};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> ExitCode {
    // Returned rather than `process::exit`, so the guard drops and flushes
    // pending spans on every path.
    let _guard = lightcraft_runtime::telemetry::init_tracing("lightcraft");
    ExitCode::from(exit_status(&try_main()))
}

fn exit_status(result: &Result<(), RelayError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            1
        }
    }
}

fn try_main() -> Result<(), RelayError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cfg = config::load()?;

    let command = config::apply_args(&mut cfg, &args)?;
    if command != Command::Help {
        cfg.validate()?;
    }

    match command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::Init => {
            let path = config::save(&cfg)?;
            println!(
                "  {} Config saved to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            Ok(())
        }
        Command::Run => run(cfg),
    }
}

fn run(cfg: Config) -> Result<(), RelayError> {
    print_banner(&cfg);

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));

    let ctrlc_flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping relay …".yellow().bold());
        ctrlc_flag.store(true, Ordering::Release);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use 'q' to stop");
    }

    // ── Pipeline ──────────────────────────────────────────────────────────
    let source = build_source(&cfg)?;
    let settings = SerialSettings::default().with_baud_rate(cfg.baud_rate);
    let transport = SerialTransport::open(&cfg.serial_port, &settings)?;
    let driver = StreamingDriver::new(cfg.driver_config(), Box::new(transport));

    let session = Session::with_shutdown(source, driver, Arc::clone(&shutdown))?;
    info!(
        source = %cfg.source,
        port = %cfg.serial_port,
        target_body_id = cfg.target_body_id,
        test_mode = cfg.test_mode,
        "relay started"
    );
    println!(
        "  Streaming body {} to {}. Press {} to stop, {} for help.\n",
        cfg.target_body_id.to_string().bold(),
        cfg.serial_port.bold(),
        "q".bold().cyan(),
        "h".bold().cyan()
    );

    // ── Operator console ──────────────────────────────────────────────────
    // Stdin reads block, so the console gets its own thread and the main
    // thread watches for shutdown or the source ending on its own.
    let repl_flag = Arc::clone(&shutdown);
    thread::Builder::new()
        .name("lightcraft-repl".to_string())
        .spawn(move || repl::run(repl_flag))?;

    while !shutdown.load(Ordering::Acquire) && !session.is_finished() {
        thread::sleep(POLL_INTERVAL);
    }

    let stats = session.stop()?;
    print_stats(&stats);
    Ok(())
}

fn build_source(cfg: &Config) -> Result<Box<dyn MotionSource>, RelayError> {
    let source: Box<dyn MotionSource> = match cfg.source_kind()? {
        SourceKind::Sim => Box::new(SimSource::new(cfg.target_body_id, cfg.sim_rate_hz)),
        SourceKind::Replay(path) => Box::new(ReplaySource::new(path).with_rate(cfg.sim_rate_hz)),
    };
    Ok(source)
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner(cfg: &Config) {
    println!();
    println!("{}", r#"   __   _      __   __                  _____ "#.bold().cyan());
    println!("{}", r#"  / /  (_)__ _/ /  / /_______________ _/ _/ /_"#.bold().cyan());
    println!("{}", r#" / /__/ / _ `/ _ \/ __/ __/ __/ _ `/ _/ __/"#.bold().cyan());
    println!("{}", r#"/____/_/\_, /_//_/\__/\__/_/  \_,_/_/ \__/ "#.bold().cyan());
    println!("{}", r#"       /___/                                "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Lightcraft".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Motion-capture → Previzion relay");
    println!();
    println!("  Source      : {}", cfg.source.yellow());
    println!("  Serial port : {} @ {} baud", cfg.serial_port.yellow(), cfg.baud_rate);
    if cfg.test_mode {
        println!("  {}", "Test mode: every frame is logged".yellow());
    }
    println!();
}

fn print_stats(stats: &StreamStats) {
    println!();
    println!("{}", "Session summary".bold().underline());
    println!("  Frames seen   : {}", stats.frames_seen);
    println!("  Frames sent   : {}", stats.frames_sent.to_string().green());
    println!("  No target     : {}", stats.no_target);
    println!("  Rejected      : {}", stats.rejected);
    println!("  Dropped       : {}", stats.dropped);
    println!("  Delivery gaps : {}", stats.gaps);
    println!();
}

fn print_usage() {
    println!("{}", "Usage".bold().underline());
    println!("  lightcraft [SOURCE] [SERIAL_PORT] [test]");
    println!("  lightcraft init");
    println!();
    println!("  {}  'sim' (default) or 'replay:<path>'", "SOURCE".bold());
    println!("  {}  serial device, default /dev/ttyUSB0", "SERIAL_PORT".bold());
    println!("  {}  log every frame as hex with its send time", "test".bold());
    println!("  {}  write ~/.lightcraft/config.toml with the current settings", "init".bold());
}
