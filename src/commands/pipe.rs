use std::io::Read;

use miette::{IntoDiagnostic, Result};

use templ::render::render_piped;

/// Read all of stdin, or `None` when nothing was piped in.
pub fn read_stdin() -> Result<Option<String>> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .into_diagnostic()?;
    Ok((!input.is_empty()).then_some(input))
}

pub fn run(input: &str, assignments: &[String], variables_only: bool) -> Result<()> {
    let output = render_piped(input, assignments, variables_only)?;
    if !output.is_empty() || !variables_only {
        println!("{output}");
    }
    Ok(())
}
