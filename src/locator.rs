use std::path::PathBuf;

use crate::config::StoreConfig;
use crate::error::{Result, TemplError};
use crate::store;

/// One positional argument: `name` or `name=variablesfile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInvocation {
    pub template: String,
    pub variables: Option<String>,
}

impl TemplateInvocation {
    /// Split on the first `=`.
    pub fn parse(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((template, variables)) => Self {
                template: template.to_string(),
                variables: Some(variables.to_string()),
            },
            None => Self {
                template: arg.to_string(),
                variables: None,
            },
        }
    }
}

/// An invocation with both parts resolved to absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInvocation {
    pub template_path: PathBuf,
    pub variables_path: Option<PathBuf>,
}

/// Resolves template invocations against the store.
///
/// A name matches a store entry when it is the whole relative path or a
/// trailing run of its components, so `deploy.yaml`, `k8s/deploy.yaml` and
/// `github/me/templates/k8s/deploy.yaml` all find the same file. Several
/// matches are an error rather than a guess.
///
/// Variables files are looked up on the filesystem first (relative to the
/// working directory) and in the store second.
#[derive(Debug, Clone)]
pub struct TemplateLocator {
    store: StoreConfig,
    working_dir: PathBuf,
}

impl TemplateLocator {
    pub fn new(store: &StoreConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: store.clone(),
            working_dir: working_dir.into(),
        }
    }

    /// A locator whose relative variables paths are taken from the process
    /// working directory.
    pub fn from_current_dir(store: &StoreConfig) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| TemplError::Io {
            context: "getting current directory".into(),
            source: e,
        })?;
        Ok(Self::new(store, cwd))
    }

    pub fn resolve(&self, arg: &str) -> Result<ResolvedInvocation> {
        let entries = store::list_store(&self.store)?;
        self.resolve_with(&TemplateInvocation::parse(arg), &entries)
    }

    /// Resolve every argument against a single scan of the store. The first
    /// failure is returned.
    pub fn resolve_all<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<ResolvedInvocation>> {
        let entries = store::list_store(&self.store)?;
        args.iter()
            .map(|arg| self.resolve_with(&TemplateInvocation::parse(arg.as_ref()), &entries))
            .collect()
    }

    fn resolve_with(
        &self,
        invocation: &TemplateInvocation,
        entries: &[String],
    ) -> Result<ResolvedInvocation> {
        let template_path = match self.find_in_store(&invocation.template, entries)? {
            Some(path) => path,
            None => {
                return Err(TemplError::TemplateNotFound {
                    name: invocation.template.clone(),
                })
            }
        };

        let variables_path = match &invocation.variables {
            Some(name) => Some(self.find_variables(name, entries)?),
            None => None,
        };

        tracing::debug!(
            "resolved {} to {}",
            invocation.template,
            template_path.display()
        );

        Ok(ResolvedInvocation {
            template_path,
            variables_path,
        })
    }

    fn find_variables(&self, name: &str, entries: &[String]) -> Result<PathBuf> {
        if name.is_empty() {
            return Err(TemplError::VariablesFileNotFound { name: name.into() });
        }

        let on_disk = self.working_dir.join(name);
        if on_disk.is_file() {
            return Ok(on_disk);
        }

        self.find_in_store(name, entries)?
            .ok_or_else(|| TemplError::VariablesFileNotFound { name: name.into() })
    }

    fn find_in_store(&self, name: &str, entries: &[String]) -> Result<Option<PathBuf>> {
        let needle = name.trim_matches('/');
        if needle.is_empty() {
            return Ok(None);
        }

        let mut candidates: Vec<&String> = entries
            .iter()
            .filter(|entry| matches_entry(entry, needle))
            .collect();

        match candidates.len() {
            0 => Ok(None),
            1 => Ok(Some(self.store.root.join(candidates[0]))),
            _ => {
                candidates.sort();
                Err(TemplError::AmbiguousTemplate {
                    name: name.to_string(),
                    candidates: candidates.into_iter().cloned().collect(),
                })
            }
        }
    }
}

/// `entry` is `needle`, or ends with `/needle`.
fn matches_entry(entry: &str, needle: &str) -> bool {
    entry == needle
        || entry
            .strip_suffix(needle)
            .is_some_and(|prefix| prefix.ends_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[&str]) -> (tempfile::TempDir, StoreConfig) {
        let tmp = tempfile::tempdir().unwrap();
        let store = StoreConfig::new(tmp.path().join("store"));
        for file in files {
            let path = store.root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        (tmp, store)
    }

    #[test]
    fn parse_name_only() {
        let inv = TemplateInvocation::parse("foo.tmpl");
        assert_eq!(inv.template, "foo.tmpl");
        assert!(inv.variables.is_none());
    }

    #[test]
    fn parse_name_and_variables() {
        let inv = TemplateInvocation::parse("foo.tmpl=vars.yaml");
        assert_eq!(inv.template, "foo.tmpl");
        assert_eq!(inv.variables.as_deref(), Some("vars.yaml"));
    }

    #[test]
    fn parse_splits_on_first_equals() {
        let inv = TemplateInvocation::parse("a=b=c");
        assert_eq!(inv.template, "a");
        assert_eq!(inv.variables.as_deref(), Some("b=c"));
    }

    #[test]
    fn matches_on_component_boundary() {
        assert!(matches_entry("local/x/foo.tmpl", "foo.tmpl"));
        assert!(matches_entry("local/x/foo.tmpl", "x/foo.tmpl"));
        assert!(matches_entry("foo.tmpl", "foo.tmpl"));
        assert!(!matches_entry("local/x/barfoo.tmpl", "foo.tmpl"));
        assert!(!matches_entry("local/x/foo.tmpl.bak", "foo.tmpl"));
    }

    #[test]
    fn resolves_template_and_store_variables() {
        let (tmp, store) = store_with(&["local/set/foo.tmpl", "local/set/vars.yaml"]);
        let locator = TemplateLocator::new(&store, tmp.path());

        let resolved = locator.resolve("foo.tmpl=vars.yaml").unwrap();
        assert_eq!(resolved.template_path, store.root.join("local/set/foo.tmpl"));
        assert_eq!(
            resolved.variables_path,
            Some(store.root.join("local/set/vars.yaml"))
        );
    }

    #[test]
    fn template_alone_has_no_variables() {
        let (tmp, store) = store_with(&["local/set/foo.tmpl"]);
        let locator = TemplateLocator::new(&store, tmp.path());

        let resolved = locator.resolve("foo.tmpl").unwrap();
        assert_eq!(resolved.template_path, store.root.join("local/set/foo.tmpl"));
        assert!(resolved.variables_path.is_none());
    }

    #[test]
    fn working_directory_variables_win_over_store() {
        let (tmp, store) = store_with(&["local/set/foo.tmpl", "local/set/vars.yaml"]);
        std::fs::write(tmp.path().join("vars.yaml"), "name: local").unwrap();
        let locator = TemplateLocator::new(&store, tmp.path());

        let resolved = locator.resolve("foo.tmpl=vars.yaml").unwrap();
        assert_eq!(resolved.variables_path, Some(tmp.path().join("vars.yaml")));
    }

    #[test]
    fn absolute_variables_path() {
        let (tmp, store) = store_with(&["local/set/foo.tmpl"]);
        let vars = tmp.path().join("elsewhere.yaml");
        std::fs::write(&vars, "").unwrap();
        let locator = TemplateLocator::new(&store, "/");

        let resolved = locator
            .resolve(&format!("foo.tmpl={}", vars.display()))
            .unwrap();
        assert_eq!(resolved.variables_path, Some(vars));
    }

    #[test]
    fn ambiguous_basename_fails_with_candidates() {
        let (tmp, store) = store_with(&["local/a/foo.tmpl", "github/me/t/foo.tmpl"]);
        let locator = TemplateLocator::new(&store, tmp.path());

        match locator.resolve("foo.tmpl").unwrap_err() {
            TemplError::AmbiguousTemplate { name, candidates } => {
                assert_eq!(name, "foo.tmpl");
                assert_eq!(
                    candidates,
                    vec![
                        "github/me/t/foo.tmpl".to_string(),
                        "local/a/foo.tmpl".to_string()
                    ]
                );
            }
            other => panic!("expected AmbiguousTemplate, got: {other:?}"),
        }

        // A longer path disambiguates.
        let resolved = locator.resolve("a/foo.tmpl").unwrap();
        assert_eq!(resolved.template_path, store.root.join("local/a/foo.tmpl"));
    }

    #[test]
    fn missing_template() {
        let (tmp, store) = store_with(&["local/a/foo.tmpl"]);
        let locator = TemplateLocator::new(&store, tmp.path());
        assert!(matches!(
            locator.resolve("bar.tmpl").unwrap_err(),
            TemplError::TemplateNotFound { .. }
        ));
        assert!(matches!(
            locator.resolve("=vars.yaml").unwrap_err(),
            TemplError::TemplateNotFound { .. }
        ));
    }

    #[test]
    fn missing_variables_file() {
        let (tmp, store) = store_with(&["local/a/foo.tmpl"]);
        let locator = TemplateLocator::new(&store, tmp.path());
        for arg in ["foo.tmpl=nope.yaml", "foo.tmpl="] {
            assert!(
                matches!(
                    locator.resolve(arg).unwrap_err(),
                    TemplError::VariablesFileNotFound { .. }
                ),
                "{arg}"
            );
        }
    }

    #[test]
    fn hidden_files_are_not_resolvable() {
        let (tmp, store) = store_with(&["local/a/.git/config", "local/a/config"]);
        let locator = TemplateLocator::new(&store, tmp.path());
        let resolved = locator.resolve("config").unwrap();
        assert_eq!(resolved.template_path, store.root.join("local/a/config"));
    }

    #[test]
    fn resolve_all_stops_at_first_failure() {
        let (tmp, store) = store_with(&["local/a/one", "local/a/two"]);
        let locator = TemplateLocator::new(&store, tmp.path());

        let resolved = locator.resolve_all(&["one", "two"]).unwrap();
        assert_eq!(resolved.len(), 2);

        let err = locator.resolve_all(&["one", "three", "four"]).unwrap_err();
        match err {
            TemplError::TemplateNotFound { name } => assert_eq!(name, "three"),
            other => panic!("expected TemplateNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn empty_store_finds_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StoreConfig::new(tmp.path().join("never-created"));
        let locator = TemplateLocator::new(&store, tmp.path());
        assert!(matches!(
            locator.resolve("anything").unwrap_err(),
            TemplError::TemplateNotFound { .. }
        ));
    }
}
