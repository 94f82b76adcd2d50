//! Fallwatch scenario replay
//!
//! Usage: `fallwatch-sim <scenario.json | fixture> [speed_factor]`
//!
//! Runs a scenario through the full pipeline with configuration taken from
//! the environment (`FALLWATCH_*`, `LLM_*`). Audit records go to the log;
//! a per-cycle summary is printed at the end.

use std::path::Path;
use std::sync::Arc;

use fallwatch_runtime::{telemetry, MonitorConfig, TracingSink};
use fallwatch_test::{fixtures, Scenario, Simulator};
use tracing::error;

fn load(arg: &str) -> Result<Scenario, Box<dyn std::error::Error>> {
    if Path::new(arg).is_file() {
        return Ok(Scenario::from_path(arg)?);
    }
    fixtures::all()
        .into_iter()
        .find(|s| s.scenario_id == arg)
        .ok_or_else(|| format!("no scenario file or fixture named {arg}").into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = MonitorConfig::from_env()?;
    telemetry::init(config.log_format)?;

    let mut args = std::env::args().skip(1);
    let Some(target) = args.next() else {
        eprintln!("usage: fallwatch-sim <scenario.json | fixture> [speed_factor]");
        eprintln!("fixtures:");
        for scenario in fixtures::all() {
            eprintln!("  {:<18} {}", scenario.scenario_id, scenario.description);
        }
        std::process::exit(2);
    };
    let speed_factor: f64 = match args.next() {
        Some(raw) => raw.parse()?,
        None => 0.0,
    };

    let scenario = load(&target)?;
    let report = match Simulator::new(scenario, config)
        .with_sink(Arc::new(TracingSink))
        .with_speed_factor(speed_factor)
        .run()
        .await
    {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "simulation failed");
            return Err(e.into());
        }
    };

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║  Scenario: {:<48}║", report.scenario_id);
    println!("╚════════════════════════════════════════════════════════════╝");
    for cycle in &report.cycles {
        println!(
            "  t={:>6.1}s  {:<26} {:<24} {:<20} {}",
            cycle.snapshot.generated_at.as_secs_f64(),
            cycle.trigger().as_str(),
            cycle.snapshot.world_state.as_str(),
            cycle.arbiter.final_decision.as_str(),
            if cycle.policy.is_send() {
                format!("SEND -> {:?}", cycle.policy.recipient)
            } else {
                "suppressed".to_string()
            }
        );
    }
    println!();
    println!(
        "  {} steps over {:.1}s, {} cycles, {} atomic / {} composite events, {} messages",
        report.steps,
        report.simulated_seconds,
        report.stats.cycles,
        report.stats.atomic_events,
        report.stats.composite_events,
        report.stats.messages_authorised
    );
    Ok(())
}
