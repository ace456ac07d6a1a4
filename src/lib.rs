pub mod config;
pub mod error;
pub mod locator;
pub mod render;
pub mod repository;
pub mod store;

use std::path::PathBuf;

use crate::config::StoreConfig;
use crate::error::{Result, TemplError};
use crate::locator::TemplateLocator;
use crate::repository::{SourceRepository, StoreLock, UpdateReport};

/// Fetch the collection at `origin` into the store and return where it landed.
pub fn fetch(store: &StoreConfig, origin: &str) -> Result<PathBuf> {
    let repo = SourceRepository::from_origin(origin, store)?;
    let _lock = StoreLock::acquire(store)?;
    repo.fetch()
}

/// Update every collection in the store.
pub fn update(store: &StoreConfig) -> Result<UpdateReport> {
    let _lock = StoreLock::acquire(store)?;
    repository::update_all(store)
}

/// Resolve and render every `name` / `name=variables` argument, in order.
pub fn render_all<S: AsRef<str>>(locator: &TemplateLocator, args: &[S]) -> Result<Vec<String>> {
    locator
        .resolve_all(args)?
        .iter()
        .map(render::render_invocation)
        .collect()
}

/// Variables referenced by each template named in `args`, paired with its path.
pub fn variables_of<S: AsRef<str>>(
    locator: &TemplateLocator,
    args: &[S],
) -> Result<Vec<(PathBuf, Vec<String>)>> {
    locator
        .resolve_all(args)?
        .into_iter()
        .map(|resolved| {
            let path = resolved.template_path;
            let content = std::fs::read_to_string(&path).map_err(|e| TemplError::Io {
                context: format!("reading template {}", path.display()),
                source: e,
            })?;
            Ok((path, render::referenced_variables(&content)))
        })
        .collect()
}
