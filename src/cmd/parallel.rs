//! Parallel-group reporting command.

use anyhow::Result;
use cairn::parallel;
use std::path::Path;

pub fn cmd_parallel(root: &Path, name: &str) -> Result<()> {
    let plan = super::resolve_plan(root, name)?;

    if !parallel::has_manifest(&plan) {
        println!();
        println!(
            "Plan '{}' has no parallel.json; nothing to parallelize.",
            plan.name
        );
        println!();
        return Ok(());
    }

    let groups = parallel::detect_groups(&plan)?;
    if groups.is_empty() {
        println!();
        println!("All manifest achievements for '{}' are complete.", plan.name);
        println!();
        return Ok(());
    }

    println!();
    println!("Parallel execution groups for '{}':", plan.name);
    println!();
    for group in &groups {
        let members = group.achievement_ids.join(", ");
        println!(
            "  Level {}: {} ({} achievement{})",
            group.level,
            members,
            group.achievement_ids.len(),
            if group.achievement_ids.len() == 1 { "" } else { "s" }
        );
        println!(
            "    sequential {:.0} min, parallel {:.0} min, saves {:.0} min ({:.1}%)",
            group.sequential_minutes,
            group.parallel_minutes,
            group.savings_minutes,
            group.savings_percent
        );
    }

    let total_savings: f64 = groups.iter().map(|g| g.savings_minutes).sum();
    if total_savings > 0.0 {
        println!();
        println!(
            "  {} {:.0} minutes across {} level(s)",
            console::style("Estimated savings:").green().bold(),
            total_savings,
            groups.len()
        );
    }
    println!();
    Ok(())
}
