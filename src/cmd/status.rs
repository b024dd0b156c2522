//! Plan listing and single-plan detail commands.

use anyhow::{Context, Result};
use cairn::achievement::AchievementStatus;
use cairn::state::{self, PlanStatus};
use cairn::{discovery, parallel};
use std::path::Path;

pub fn cmd_plans(root: &Path) -> Result<()> {
    let plans = discovery::list_plans(root)?;

    if plans.is_empty() {
        println!();
        println!("No plans found under {}", root.display());
        println!();
        return Ok(());
    }

    println!();
    println!(
        "{:<24} {:<12} {:<18} Next",
        "Plan", "Progress", "Status"
    );
    println!(
        "{:<24} {:<12} {:<18} ----",
        "------------------------", "--------", "------"
    );

    for plan in &plans {
        match state::plan_state(plan) {
            Ok(ps) => {
                let progress = format!("{}/{} {:>5.1}%", ps.completed, ps.total, ps.progress);
                let next = if ps.next_available.is_empty() {
                    "-".to_string()
                } else {
                    ps.next_available.join(", ")
                };
                println!(
                    "{:<24} {:<12} {:<18} {}",
                    plan.name,
                    progress,
                    styled_status(ps.status),
                    next
                );
            }
            // Skip-and-continue: one broken plan must not hide the rest.
            Err(err) => {
                println!(
                    "{:<24} {}",
                    plan.name,
                    console::style(format!("error: {err}")).red()
                );
            }
        }
    }
    println!();
    Ok(())
}

pub fn cmd_show(root: &Path, name: &str) -> Result<()> {
    let plan = super::resolve_plan(root, name)?;
    let ps = state::plan_state(&plan)?;

    println!();
    println!("Plan: {}", ps.name);
    let Some(index_file) = ps.index_file.as_deref() else {
        println!("Index: none (no PLAN_*.md found)");
        println!();
        return Ok(());
    };
    println!("Index: {}", index_file.display());
    println!(
        "Progress: {}/{} ({:.1}%)  Status: {}",
        ps.completed,
        ps.total,
        ps.progress,
        styled_status(ps.status)
    );
    if let Some(last) = &ps.last_completed {
        println!("Last completed: {last}");
    }
    if !ps.next_available.is_empty() {
        println!("Next available: {}", ps.next_available.join(", "));
    }
    if !ps.pending_reviews.is_empty() {
        println!("Pending review: {}", ps.pending_reviews.join(", "));
    }
    if !ps.pending_fixes.is_empty() {
        println!(
            "Pending fixes: {}",
            console::style(ps.pending_fixes.join(", ")).red()
        );
    }
    if parallel::has_manifest(&plan) {
        println!("Parallel manifest: present (see 'cairn parallel {name}')");
    }

    let content = std::fs::read_to_string(index_file)
        .with_context(|| format!("Failed to re-read index at {}", index_file.display()))?;
    let achievements = state::parse_achievement_index(&content);
    let label = state::plan_label(index_file);

    if !achievements.is_empty() {
        println!();
        println!("{:<8} {:<14} Title", "Id", "Stage");
        for achievement in &achievements {
            let status = state::achievement_status(&plan.dir, &label, &achievement.id);
            println!(
                "{:<8} {:<14} {}",
                achievement.id,
                styled_achievement(status),
                achievement.title
            );
        }
    }
    println!();
    Ok(())
}

fn styled_status(status: PlanStatus) -> String {
    let text = status.to_string();
    match status {
        PlanStatus::Active => text,
        PlanStatus::NeedsAttention => console::style(text).red().to_string(),
        PlanStatus::Complete => console::style(text).green().to_string(),
    }
}

fn styled_achievement(status: AchievementStatus) -> String {
    match status {
        AchievementStatus::NotStarted => console::style("not started").dim().to_string(),
        AchievementStatus::SubplanReady => "subplan ready".to_string(),
        AchievementStatus::InProgress => console::style("in progress").cyan().to_string(),
        AchievementStatus::NeedsFix => console::style("needs fix").red().to_string(),
        AchievementStatus::Complete => console::style("complete").green().to_string(),
    }
}
