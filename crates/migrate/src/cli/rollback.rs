use anyhow::Result;
use console::style;

use migrate_core::config::RunnerConfig;

/// Roll back the migration named by `--migration_name`.
pub async fn run(config: &RunnerConfig) -> Result<()> {
    let name = config.require_migration_name()?;
    let (db, runner) = super::connect(config).await?;

    println!();
    println!("  {} Rolling back {}...", style("→").dim(), name);

    let result = runner.rollback(name).await;
    db.close().await;
    let report = result?;

    if !report.used_down_section {
        println!(
            "  {} {} has no down section; its up-script was run again",
            style("!").yellow(),
            report.name
        );
    }
    println!("  {} Rolled back: {}", style("✓").green(), style(&report.name).cyan());
    println!();

    Ok(())
}
