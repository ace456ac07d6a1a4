use console::style;
use miette::Result;

use templ::config::StoreConfig;
use templ::locator::TemplateLocator;

pub fn run(store: &StoreConfig, templates: &[String]) -> Result<()> {
    let locator = TemplateLocator::from_current_dir(store)?;
    for output in templ::render_all(&locator, templates)? {
        println!("{output}");
    }
    Ok(())
}

pub fn print_hint() {
    eprintln!(
        "Nothing to do. Pass a template name, or see '{}'.",
        style("templ --help").cyan()
    );
}
