use console::style;
use miette::Result;

use templ::config::StoreConfig;

pub fn run(store: &StoreConfig) -> Result<()> {
    eprintln!(
        "{} Updating template collections in {}",
        style("...").cyan().bold(),
        style(store.root.display()).cyan()
    );

    let report = templ::update(store)?;

    for path in &report.updated {
        eprintln!("  {} {}", style("↻").cyan(), path.display());
    }
    for path in &report.skipped {
        eprintln!(
            "  {} {} (not fetched by templ)",
            style("-").dim(),
            path.display()
        );
    }
    for (path, err) in &report.failed {
        eprintln!("  {} {}: {err}", style("!").red().bold(), path.display());
    }

    if report.has_failures() {
        return Err(miette::miette!("Update incomplete: {report}"));
    }

    eprintln!("\n{} Update complete: {report}", style("✓").green().bold());
    Ok(())
}
