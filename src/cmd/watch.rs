//! Live-watch command: reprint a plan's state whenever its files change.

use anyhow::{Context, Result};
use cairn::discovery::Plan;
use cairn::{state, watch};
use std::path::Path;
use std::time::Duration;

pub async fn cmd_watch(root: &Path, name: &str, interval: f64, debounce: f64) -> Result<()> {
    let plan = super::resolve_plan(root, name)?;

    println!(
        "Watching '{}' every {:.1}s (Ctrl-C to stop)",
        plan.name, interval
    );

    let render_plan = plan.clone();
    let mut watcher = watch::watch(
        plan.dir.clone(),
        move || render_state(&render_plan),
        Some(Duration::from_secs_f64(interval)),
        Some(Duration::from_secs_f64(debounce)),
    );

    // Show the current state immediately rather than waiting for a change.
    watcher.force_callback();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    watcher.stop();
    println!("Stopped.");
    Ok(())
}

fn render_state(plan: &Plan) {
    let stamp = chrono::Local::now().format("%H:%M:%S");
    match state::plan_state(plan) {
        Ok(ps) => {
            let next = if ps.next_available.is_empty() {
                "-".to_string()
            } else {
                ps.next_available.join(", ")
            };
            println!(
                "[{stamp}] {}: {}/{} ({:.1}%) {} | next: {}",
                ps.name, ps.completed, ps.total, ps.progress, ps.status, next
            );
        }
        Err(err) => {
            println!(
                "[{stamp}] {}",
                console::style(format!("state error: {err}")).red()
            );
        }
    }
}
