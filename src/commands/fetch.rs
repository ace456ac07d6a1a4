use console::style;
use miette::Result;

use templ::config::StoreConfig;

pub fn run(store: &StoreConfig, origin: &str) -> Result<()> {
    eprintln!("{} Fetching {}", style("...").cyan().bold(), style(origin).cyan());

    let dest = templ::fetch(store, origin)?;

    eprintln!(
        "{} Templates from {} are in {}",
        style("✓").green().bold(),
        origin,
        style(dest.display()).cyan()
    );
    Ok(())
}
