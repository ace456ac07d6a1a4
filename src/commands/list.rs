use console::style;
use miette::Result;

use templ::config::StoreConfig;
use templ::store::list_store;

pub fn run(store: &StoreConfig) -> Result<()> {
    let mut files = list_store(store)?;

    if files.is_empty() {
        eprintln!(
            "No templates in {}. Use '{}' with a git URL or directory to fetch some.",
            style(store.root.display()).cyan(),
            style("templ -f").cyan()
        );
        return Ok(());
    }

    files.sort();
    for file in &files {
        println!("{file}");
    }

    Ok(())
}
