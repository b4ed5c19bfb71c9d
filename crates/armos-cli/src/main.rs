//! `armos-cli` – ArmOS engine entry point
//!
//! 1. Initialises tracing (`RUST_LOG`, `ARMOS_LOG_FORMAT=json`, optional OTLP).
//! 2. Loads `~/.armos/config.toml` (or `ARMOS_CONFIG`); falls back to defaults.
//! 3. Starts the [`Supervisor`] against simulated arms.
//! 4. With `--demo`, sends a short sweep trajectory to every arm.
//! 5. Intercepts **Ctrl-C** to stop every arm, publish an emergency-stop
//!    alert and shut down gracefully.
//!
//! `--init-config` writes the default configuration file and exits.

mod config;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use armos_hal::SimArmFactory;
use armos_middleware::{EventBus, Topic};
use armos_runtime::telemetry::init_tracing;
use armos_runtime::{EngineConfig, GoalHandle, Supervisor};
use armos_types::{DiagnosticLevel, Event, EventPayload, TrajectoryGoal, Waypoint};
use colored::Colorize;
use tracing::{error, warn};

fn main() {
    let _telemetry = init_tracing("armos");
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--init-config") {
        init_config();
        return;
    }

    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", config::config_path().display().to_string().bold());
            cfg
        }
        Ok(None) => {
            println!(
                "  No config at {}; using defaults ({} to create one).",
                config::config_path().display().to_string().dimmed(),
                "armos --init-config".bold()
            );
            let mut cfg = EngineConfig::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            std::process::exit(2);
        }
    };

    let bus = EventBus::default();
    let mut diagnostics = bus.subscribe_to(Topic::Diagnostics);
    let factory = SimArmFactory::new();
    let supervisor = match Supervisor::start(&cfg, &factory, bus.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to start supervisor");
            println!("{}: {}", "Startup failed".red(), e);
            std::process::exit(1);
        }
    };
    println!(
        "  {} arm(s) online: {}",
        supervisor.arms().len(),
        supervisor.arms().ids().join(", ").bold()
    );
    for arm in supervisor.arms().unavailable() {
        println!("  {} {} ({})", "unavailable:".yellow(), arm.id.bold(), arm.error);
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // The handler only holds a weak reference so the supervisor can still be
    // shut down by value once the main loop exits.
    let supervisor = Arc::new(supervisor);
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    let handler_supervisor = Arc::downgrade(&supervisor);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping all arms …".yellow().bold());
        if let Some(supervisor) = handler_supervisor.upgrade() {
            match supervisor.emergency_stop("operator Ctrl-C") {
                0 => println!("{}", "  ✓ Goals preempted, all arms stopped.".green()),
                failed => println!("{}", format!("  ✗ {failed} arm(s) failed to stop.").red()),
            }
        }
        shutdown_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let mut demo: Vec<GoalHandle> = Vec::new();
    if args.iter().any(|a| a == "--demo") {
        for arm in supervisor.arms().iter() {
            match supervisor.send_goal(arm.id(), sweep(arm.motor_ids().len())) {
                Ok(handle) => demo.push(handle),
                Err(e) => println!("{}: {}", "Demo goal rejected".red(), e),
            }
        }
    }

    println!("  Running. Press {} to stop.\n", "Ctrl-C".bold().cyan());
    while !shutdown.load(Ordering::SeqCst) {
        for event in diagnostics.drain() {
            print_diagnostics(&event);
        }
        demo.retain(|handle| match handle.try_result() {
            Some(outcome) => {
                let count = handle.feedback().try_iter().count();
                println!("  goal {} on {}: {} ({count} feedback)", handle.id(), handle.arm().bold(), outcome);
                false
            }
            None => true,
        });
        thread::sleep(Duration::from_millis(100));
    }

    match Arc::try_unwrap(supervisor) {
        Ok(supervisor) => supervisor.shutdown(),
        // The handler is mid-flight; the last reference tears everything down on drop.
        Err(shared) => drop(shared),
    }
    println!("{}", "  ✓ Exiting ArmOS.".green());
}

/// A there-and-back sweep over two seconds for an arm with `motors` joints.
fn sweep(motors: usize) -> TrajectoryGoal {
    const STEPS: u64 = 20;
    let waypoints = (0..=STEPS)
        .map(|step| {
            let phase = step as f64 / STEPS as f64 * std::f64::consts::TAU;
            let counts = (phase.sin() * 500.0).round() as i32;
            Waypoint::new(vec![counts; motors], Duration::from_millis(step * 100))
        })
        .collect();
    TrajectoryGoal::new(waypoints)
}

fn print_diagnostics(event: &Event) {
    let EventPayload::Diagnostics(array) = &event.payload else {
        return;
    };
    for status in &array.status {
        let line = format!("  [{}] {}", status.name, status.message);
        match status.level {
            DiagnosticLevel::Error => println!("{}", line.red()),
            DiagnosticLevel::Warn => println!("{}", line.yellow()),
            DiagnosticLevel::Ok | DiagnosticLevel::Stale => println!("{}", line.dimmed()),
        }
    }
}

fn init_config() {
    let path = config::config_path();
    if path.exists() {
        println!("  Config already exists at {}", path.display().to_string().bold());
        return;
    }
    match config::save(&EngineConfig::default()) {
        Ok(()) => println!("  {} Config saved to {}", "✓".green().bold(), path.display().to_string().bold()),
        Err(e) => {
            println!("{}: {}", "Error saving config".red(), e);
            std::process::exit(1);
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"     _              ___  ____  "#.bold().cyan());
    println!("{}", r#"    / \   _ __ _ __/ _ \/ ___| "#.bold().cyan());
    println!("{}", r#"   / _ \ | '__| '_ \ | | \___ \ "#.bold().cyan());
    println!("{}", r#"  / ___ \| |  | | | | |_| |___) |"#.bold().cyan());
    println!("{}", r#" /_/   \_\_|  |_| |_|\___/|____/ "#.bold().cyan());
    println!();
    println!("  {} {}", "ArmOS".bold(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Multi-arm trajectory execution & monitoring");
    println!();
}
