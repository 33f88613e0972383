use anyhow::Result;
use console::style;

use migrate_core::config::RunnerConfig;

/// Apply all pending migrations.
pub async fn run(config: &RunnerConfig) -> Result<()> {
    let (db, runner) = super::connect(config).await?;

    println!();
    println!(
        "  {} Running pending migrations from {}...",
        style("→").dim(),
        runner.migrations_dir().display()
    );

    let result = runner.execute().await;
    db.close().await;
    let report = result?;

    if report.nothing_to_do() {
        println!("  {} No migrations to be executed", style("ℹ").blue());
    } else {
        for name in &report.applied {
            println!("  {} Applied: {}", style("✓").green(), style(name).cyan());
        }
        println!();
        println!(
            "  {} {} applied, {} already up to date",
            style("✓").green(),
            report.applied.len(),
            report.skipped
        );
    }
    println!();

    Ok(())
}
