use anyhow::Result;
use console::style;

use migrate_core::config::RunnerConfig;
use migrate_runtime::MigrationGenerator;

/// Scaffold a new migration file.
pub fn run(config: &RunnerConfig) -> Result<()> {
    let name = config.require_migration_name()?;
    let path = MigrationGenerator::new(&config.migrations_dir).create(name)?;

    println!();
    println!("  {} Created {}", style("✓").green(), style(path.display()).cyan());
    println!();

    Ok(())
}
