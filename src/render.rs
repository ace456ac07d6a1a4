use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use regex_lite::Regex;
use serde_yaml::Value;
use tera::{Context, Tera};

use crate::error::{Result, TemplError};
use crate::locator::ResolvedInvocation;

pub type Variables = BTreeMap<String, String>;

pub fn build_context(variables: &Variables) -> Context {
    let mut context = Context::new();
    for (key, value) in variables {
        context.insert(key, value);
    }
    context
}

/// Render `content` with `variables`. `name` is only used in error messages.
pub fn render(name: &str, content: &str, variables: &Variables) -> Result<String> {
    Tera::one_off(content, &build_context(variables), false).map_err(|e| {
        TemplError::RenderError {
            name: name.to_string(),
            source: e,
        }
    })
}

/// Names referenced by `{{ ... }}` expressions in `content`, sorted and de-duplicated.
pub fn referenced_variables(content: &str) -> Vec<String> {
    let re = Regex::new(r"\{\{-?\s*([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex");
    re.captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Load a YAML mapping of `name: value` pairs. Scalars are turned into
/// strings, `null` into an empty string.
pub fn load_variables(path: &Path) -> Result<Variables> {
    let content = std::fs::read_to_string(path).map_err(|e| TemplError::Io {
        context: format!("reading variables file {}", path.display()),
        source: e,
    })?;
    parse_variables(path, &content)
}

fn parse_variables(path: &Path, content: &str) -> Result<Variables> {
    let parse_err = |reason: String| TemplError::VariablesParse {
        path: path.to_path_buf(),
        reason,
    };

    let value: Value = serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))?;
    let mapping = match value {
        Value::Null => return Ok(Variables::new()),
        Value::Mapping(mapping) => mapping,
        _ => return Err(parse_err("expected a mapping of names to values".into())),
    };

    let mut variables = Variables::new();
    for (key, value) in mapping {
        let key = scalar_to_string(&key)
            .ok_or_else(|| parse_err("variable names must be plain scalars".into()))?;
        let value = scalar_to_string(&value)
            .ok_or_else(|| parse_err(format!("value of '{key}' must be a plain scalar")))?;
        variables.insert(key, value);
    }
    Ok(variables)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Parse `NAME=VALUE` arguments given on the command line.
pub fn parse_assignments<S: AsRef<str>>(args: &[S]) -> Result<Variables> {
    args.iter()
        .map(|arg| {
            let arg = arg.as_ref();
            match arg.split_once('=') {
                Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
                _ => Err(TemplError::InvalidAssignment {
                    input: arg.to_string(),
                }),
            }
        })
        .collect()
}

/// Output for a template read from stdin.
///
/// `args` are `NAME=VALUE` assignments. With `variables_only` the template is
/// not rendered and its referenced variables are returned one per line.
pub fn render_piped<S: AsRef<str>>(input: &str, args: &[S], variables_only: bool) -> Result<String> {
    if variables_only {
        return Ok(referenced_variables(input).join("\n"));
    }
    render("<stdin>", input, &parse_assignments(args)?)
}

/// Produce the output for one resolved invocation. Without a variables file
/// the template is returned as it is.
pub fn render_invocation(invocation: &ResolvedInvocation) -> Result<String> {
    let path = &invocation.template_path;
    let content = std::fs::read_to_string(path).map_err(|e| TemplError::Io {
        context: format!("reading template {}", path.display()),
        source: e,
    })?;

    match &invocation.variables_path {
        Some(vars_path) => {
            let variables = load_variables(vars_path)?;
            render(&path.display().to_string(), &content, &variables)
        }
        None => Ok(content),
    }
}
