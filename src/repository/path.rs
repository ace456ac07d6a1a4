//! Destination paths for template collections inside the store.
//!
//! Nothing in here touches the filesystem.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::{Result, TemplError};
use crate::repository::SourceKind;

/// The parsed part of an origin that its destination is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local { name: OsString },
    Remote { owner: String, repo: String },
}

impl Target {
    pub fn parse(origin: &str, kind: SourceKind) -> Result<Self> {
        ensure_non_empty(origin)?;
        match kind {
            SourceKind::Local => {
                let name = Path::new(origin)
                    .file_name()
                    .ok_or_else(|| invalid(origin, "path has no final directory name"))?;
                Ok(Self::Local {
                    name: name.to_os_string(),
                })
            }
            SourceKind::Remote => {
                let (owner, repo) = owner_and_repo(origin)?;
                Ok(Self::Remote { owner, repo })
            }
        }
    }

    pub fn destination(&self, store: &StoreConfig) -> PathBuf {
        match self {
            Self::Local { name } => store.local_root().join(name),
            Self::Remote { owner, repo } => store.github_root().join(owner).join(repo),
        }
    }
}

/// Compute where a collection from `origin` lives in the store.
pub fn destination(store: &StoreConfig, origin: &str, kind: SourceKind) -> Result<PathBuf> {
    Ok(Target::parse(origin, kind)?.destination(store))
}

/// `<store>/local/<basename of origin>`.
pub fn local_destination(store: &StoreConfig, origin: &str) -> Result<PathBuf> {
    destination(store, origin, SourceKind::Local)
}

/// `<store>/github/<owner>/<repo>`.
pub fn remote_destination(store: &StoreConfig, origin: &str) -> Result<PathBuf> {
    destination(store, origin, SourceKind::Remote)
}

/// Extract `owner` and `repo` from a remote origin, dropping a trailing `.git`.
///
/// Accepts scheme URLs (`https://host/owner/repo.git`), scp-style
/// (`git@host:owner/repo.git`) and the `gh:owner/repo` abbreviation.
pub fn owner_and_repo(origin: &str) -> Result<(String, String)> {
    ensure_non_empty(origin)?;

    let path = if let Some(rest) = origin.strip_prefix("gh:") {
        rest
    } else if let Some((_, after_scheme)) = origin.split_once("://") {
        after_scheme
            .split_once('/')
            .map(|(_, path)| path)
            .ok_or_else(|| invalid(origin, "URL has no repository path"))?
    } else if let Some((user_host, path)) = origin.split_once(':') {
        if !user_host.contains('@') {
            return Err(invalid(origin, "not a recognised remote URL"));
        }
        path
    } else {
        return Err(invalid(origin, "not a recognised remote URL"));
    };

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let [.., owner, repo] = segments.as_slice() else {
        return Err(invalid(origin, "expected an <owner>/<repo> path"));
    };

    for segment in [owner, repo] {
        if *segment == "." || *segment == ".." {
            return Err(invalid(origin, "owner and repository names cannot be '.' or '..'"));
        }
    }

    Ok((owner.to_string(), repo.to_string()))
}

fn ensure_non_empty(origin: &str) -> Result<()> {
    if origin.trim().is_empty() {
        return Err(invalid(origin, "origin is empty"));
    }
    Ok(())
}

fn invalid(origin: &str, reason: &str) -> TemplError {
    TemplError::InvalidOrigin {
        origin: origin.to_string(),
        reason: reason.to_string(),
    }
}
