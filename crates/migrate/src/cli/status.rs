use anyhow::Result;
use console::style;

use migrate_core::config::RunnerConfig;
use migrate_core::migration::{MigrationState, MigrationStatus};

/// Print where every migration stands.
pub async fn run(config: &RunnerConfig) -> Result<()> {
    let (db, runner) = super::connect(config).await?;
    let result = runner.status().await;
    db.close().await;
    let status = result?;

    println!();
    print_status(&status);
    println!();

    Ok(())
}

fn print_status(status: &MigrationStatus) {
    if status.entries.is_empty() && status.missing_files.is_empty() {
        println!("  {} No migrations found", style("ℹ").blue());
        return;
    }

    for entry in &status.entries {
        match entry.state {
            MigrationState::Applied { at } => println!(
                "  {} {} {} ({})",
                style("✓").green(),
                style(&entry.name).cyan(),
                style("applied at").dim(),
                at.format("%Y-%m-%d %H:%M:%S")
            ),
            MigrationState::RolledBack { at } => println!(
                "  {} {} {} ({})",
                style("↓").yellow(),
                style(&entry.name).yellow(),
                style("rolled back at").dim(),
                at.format("%Y-%m-%d %H:%M:%S")
            ),
            MigrationState::Pending => {
                println!("  {} {}", style("○").dim(), style(&entry.name).bold())
            }
        }
    }

    if !status.missing_files.is_empty() {
        println!();
        println!("  {} Recorded but missing on disk:", style("!").red());
        for name in &status.missing_files {
            println!("    {} {}", style("→").dim(), name);
        }
    }

    println!();
    println!(
        "  {} {} applied, {} rolled back, {} pending",
        style("ℹ").blue(),
        status.count(|s| matches!(s, MigrationState::Applied { .. })),
        status.count(|s| matches!(s, MigrationState::RolledBack { .. })),
        status.count(|s| matches!(s, MigrationState::Pending))
    );
}
