//! salut-replay: run a recorded skeleton trace through the gesture engine.

use std::path::PathBuf;

use clap::Parser;
use salut::trace::{self, ReplayReport};
use salut::{GestureId, PresenceMonitor, Salut, SalutConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "salut-replay", about = "Replay a skeleton trace through the greeting gesture engine")]
struct Cli {
    /// Trace file, one s-expression frame per line
    trace: PathBuf,

    /// Gesture to wait for: bow, kiss, curtsy, wave, east-coast, metal, indian
    #[arg(long, default_value = "wave")]
    gesture: String,

    /// Config overrides, a keyword plist such as (:bow-min-movement 120)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep waiting for the gesture after each completion
    #[arg(long)]
    repeat: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,
}

fn print_report(report: &ReplayReport) {
    for change in &report.presence {
        println!(
            "(:frame {} :time-ms {} :presence {})",
            change.frame,
            change.time_ms,
            change.event.as_str()
        );
    }
    for completion in &report.completions {
        println!(
            "(:frame {} :time-ms {} :gesture {})",
            completion.frame, completion.time_ms, completion.gesture
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salut=info".into()),
        )
        .init();

    let mut config = SalutConfig::default();
    if let Some(path) = &cli.config {
        config.apply_file(path)?;
    }
    if cli.show_config {
        println!("{}", config.config_sexp());
        return Ok(());
    }

    let gesture = match GestureId::from_name(&cli.gesture) {
        Some(GestureId::None) | None => {
            let names: Vec<&str> = GestureId::ALL[1..].iter().map(|g| g.as_str()).collect();
            anyhow::bail!("unknown gesture {:?}; expected one of: {}", cli.gesture, names.join(", "));
        }
        Some(g) => g,
    };

    let frames = trace::load_trace(&cli.trace)?;
    info!(frames = frames.len(), trace = %cli.trace.display(), "trace loaded");

    let mut presence = PresenceMonitor::new(config.presence.clone());
    let mut salut = Salut::with_config(config);
    salut.select_gesture(gesture, || {});

    let report = trace::replay(&mut salut, &mut presence, &frames, cli.repeat);
    print_report(&report);
    info!(
        fed = report.frames_fed,
        completions = report.completions.len(),
        status = %salut.status_sexp(),
        "replay finished"
    );
    Ok(())
}
