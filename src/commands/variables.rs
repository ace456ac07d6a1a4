use miette::Result;

use templ::config::StoreConfig;
use templ::locator::TemplateLocator;

pub fn run(store: &StoreConfig, templates: &[String]) -> Result<()> {
    let locator = TemplateLocator::from_current_dir(store)?;

    for (path, variables) in templ::variables_of(&locator, templates)? {
        if variables.is_empty() {
            println!("No variables detected in {}", path.display());
            continue;
        }
        for variable in variables {
            println!("{variable}");
        }
    }
    Ok(())
}
