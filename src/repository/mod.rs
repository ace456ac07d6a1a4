pub mod git;
pub mod lock;
pub mod path;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::error::{Result, TemplError};
use crate::store;

pub use lock::StoreLock;
pub use path::Target;

/// Metadata file written into every fetched collection.
pub const METADATA_FILE: &str = ".templ-source.toml";

const STAGING_PREFIX: &str = ".templ-staging-";
const PREVIOUS_PREFIX: &str = ".templ-previous-";

/// Where a template collection comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A directory on this machine, either a git work tree or a plain directory.
    Local,
    /// A git remote, stored under `github/<owner>/<repo>`.
    Remote,
}

impl SourceKind {
    /// Classify an origin by its shape alone: URLs, scp-style addresses and
    /// `gh:` abbreviations are remote, everything else is a local path.
    pub fn detect(origin: &str) -> Self {
        const REMOTE_PREFIXES: &[&str] = &["https://", "http://", "ssh://", "git://", "gh:"];

        if REMOTE_PREFIXES.iter().any(|p| origin.starts_with(p)) || is_scp_like(origin) {
            Self::Remote
        } else {
            Self::Local
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// `user@host:path`, with no `/` before the colon.
fn is_scp_like(origin: &str) -> bool {
    match origin.split_once(':') {
        Some((user_host, _)) => user_host.contains('@') && !user_host.contains('/'),
        None => false,
    }
}

/// Stored alongside a fetched collection so it can be updated later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Origin to update from. Local origins are stored as absolute paths.
    pub origin: String,
    pub kind: SourceKind,
    /// When the collection was last fetched or updated (Unix timestamp in seconds).
    pub fetched_at: String,
    /// `HEAD` after the last fetch, for git-backed collections.
    pub commit: Option<String>,
}

impl SourceMetadata {
    pub fn read(collection: &Path) -> Result<Option<Self>> {
        let path = collection.join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| TemplError::Io {
            context: format!("reading source metadata {}", path.display()),
            source: e,
        })?;
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| TemplError::ConfigParse { path, source: e })
    }

    fn write(&self, collection: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| TemplError::MetadataWrite {
            context: e.to_string(),
        })?;
        let path = collection.join(METADATA_FILE);
        std::fs::write(&path, content).map_err(|e| TemplError::Io {
            context: format!("writing source metadata {}", path.display()),
            source: e,
        })
    }
}

/// A template collection origin bound to its place in the store.
///
/// The destination is never stored: it is derived from the origin each
/// time it is asked for.
#[derive(Debug, Clone)]
pub struct SourceRepository {
    origin: String,
    kind: SourceKind,
    target: Target,
    store: StoreConfig,
}

impl SourceRepository {
    /// Validate `origin` for `kind`. Empty or malformed origins are rejected
    /// here for both kinds, before any I/O happens.
    pub fn new(origin: &str, kind: SourceKind, store: &StoreConfig) -> Result<Self> {
        let target = Target::parse(origin, kind)?;
        Ok(Self {
            origin: origin.to_string(),
            kind,
            target,
            store: store.clone(),
        })
    }

    /// Like [`SourceRepository::new`], with the kind detected from the origin.
    pub fn from_origin(origin: &str, store: &StoreConfig) -> Result<Self> {
        Self::new(origin, SourceKind::detect(origin), store)
    }

    pub fn local(origin: &str, store: &StoreConfig) -> Result<Self> {
        Self::new(origin, SourceKind::Local, store)
    }

    pub fn remote(origin: &str, store: &StoreConfig) -> Result<Self> {
        Self::new(origin, SourceKind::Remote, store)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Where this collection lives in the store.
    pub fn destination(&self) -> PathBuf {
        self.target.destination(&self.store)
    }

    /// URL handed to `git clone` for remote origins.
    pub fn clone_url(&self) -> String {
        match (&self.target, self.origin.starts_with("gh:")) {
            (Target::Remote { owner, repo }, true) => {
                format!("https://github.com/{owner}/{repo}.git")
            }
            _ => self.origin.clone(),
        }
    }

    /// Bring the collection into the store.
    ///
    /// A destination that already holds this collection is updated instead,
    /// so fetching twice never discards what is there. Anything else already
    /// at the destination, including a collection fetched from a different
    /// origin that maps to the same place, is left alone and reported as a
    /// failure.
    pub fn fetch(&self) -> Result<PathBuf> {
        let dest = self.destination();

        if dest.exists() {
            if !is_managed(&dest) {
                return Err(TemplError::FetchFailed {
                    origin: self.origin.clone(),
                    reason: format!(
                        "{} already exists and was not fetched by templ",
                        dest.display()
                    ),
                });
            }
            self.ensure_same_origin(&dest)?;
            tracing::info!("{} is already fetched, updating it", dest.display());
            self.refresh(&dest)?;
            return Ok(dest);
        }

        self.store.ensure_exists()?;
        let staging = self.stage()?;
        place(staging, &dest)?;
        tracing::info!("fetched {} into {}", self.origin, dest.display());
        Ok(dest)
    }

    /// Synchronize an already fetched collection with its origin.
    pub fn update(&self) -> Result<()> {
        let dest = self.destination();
        if !is_managed(&dest) {
            return Err(TemplError::FetchFailed {
                origin: self.origin.clone(),
                reason: format!("{} has not been fetched yet", dest.display()),
            });
        }
        self.ensure_same_origin(&dest)?;
        self.refresh(&dest)
    }

    /// Fail unless the collection at `dest` was fetched from this origin.
    /// The recorded origin comes from the metadata file, or from the `origin`
    /// remote of a work tree without one.
    fn ensure_same_origin(&self, dest: &Path) -> Result<()> {
        let recorded = match SourceMetadata::read(dest)? {
            Some(metadata) => metadata.origin,
            None => match git::remote_url(dest) {
                Some(url) => url,
                None => return Ok(()),
            },
        };

        let same = match self.kind {
            SourceKind::Local => {
                let ours = self.local_source()?;
                let theirs = Path::new(&recorded);
                theirs == ours.as_path() || theirs.canonicalize().is_ok_and(|p| p == ours)
            }
            SourceKind::Remote => remote_identity(&recorded) == remote_identity(&self.origin),
        };

        if same {
            Ok(())
        } else {
            Err(TemplError::FetchFailed {
                origin: self.origin.clone(),
                reason: format!(
                    "{} already holds a collection from {recorded}",
                    dest.display()
                ),
            })
        }
    }

    /// Update the collection at `dest` in place.
    ///
    /// Git work trees are fast-forwarded. Copied local collections are copied
    /// again into staging and swapped in, so a failed copy leaves the old
    /// tree untouched.
    fn refresh(&self, dest: &Path) -> Result<()> {
        if git::is_work_tree(dest) {
            git::pull(dest, &self.origin)?;
            if let Some(mut metadata) = SourceMetadata::read(dest)? {
                metadata.fetched_at = unix_timestamp_secs();
                metadata.commit = git::head_commit(dest);
                metadata.write(dest)?;
            }
            tracing::debug!("fast-forwarded {}", dest.display());
            return Ok(());
        }

        match self.kind {
            SourceKind::Local => {
                let staging = self.stage()?;
                swap(staging, dest, &self.store)?;
                tracing::debug!("refreshed copy at {}", dest.display());
                Ok(())
            }
            SourceKind::Remote => Err(TemplError::FetchFailed {
                origin: self.origin.clone(),
                reason: format!("{} is not a git work tree", dest.display()),
            }),
        }
    }

    /// Clone or copy the origin into a fresh hidden directory in the store
    /// root and write its metadata there.
    fn stage(&self) -> Result<TempDir> {
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.store.root)
            .map_err(|e| TemplError::Io {
                context: format!("creating staging directory in {}", self.store.root.display()),
                source: e,
            })?;

        let origin = match self.kind {
            SourceKind::Remote => {
                git::clone(&self.clone_url(), staging.path())?;
                self.origin.clone()
            }
            SourceKind::Local => {
                let source = self.local_source()?;
                if git::is_work_tree(&source) {
                    git::clone(&source.to_string_lossy(), staging.path())?;
                } else {
                    copy_dir_all(&source, staging.path()).map_err(|e| TemplError::FetchFailed {
                        origin: self.origin.clone(),
                        reason: e.to_string(),
                    })?;
                }
                source.to_string_lossy().into_owned()
            }
        };

        if git::is_work_tree(staging.path()) {
            exclude_metadata_from_git(staging.path())?;
        }

        SourceMetadata {
            origin,
            kind: self.kind,
            fetched_at: unix_timestamp_secs(),
            commit: git::head_commit(staging.path()),
        }
        .write(staging.path())?;

        Ok(staging)
    }

    fn local_source(&self) -> Result<PathBuf> {
        let source = Path::new(&self.origin)
            .canonicalize()
            .map_err(|e| TemplError::FetchFailed {
                origin: self.origin.clone(),
                reason: format!("cannot read local origin: {e}"),
            })?;
        if !source.is_dir() {
            return Err(TemplError::FetchFailed {
                origin: self.origin.clone(),
                reason: "local origin is not a directory".into(),
            });
        }
        if let Ok(store_root) = self.store.root.canonicalize() {
            if store_root.starts_with(&source) || source.starts_with(&store_root) {
                return Err(TemplError::FetchFailed {
                    origin: self.origin.clone(),
                    reason: "local origin overlaps the template store".into(),
                });
            }
        }
        Ok(source)
    }
}

/// Host and path of a remote origin, so that `gh:o/r`,
/// `https://github.com/o/r.git` and `git@github.com:o/r` compare equal.
fn remote_identity(origin: &str) -> String {
    let location = if let Some(rest) = origin.strip_prefix("gh:") {
        format!("github.com/{rest}")
    } else if let Some((_, rest)) = origin.split_once("://") {
        rest.to_string()
    } else {
        origin.replacen(':', "/", 1)
    };

    let location = match location.split_once('@') {
        Some((user, rest)) if !user.contains('/') => rest,
        _ => location.as_str(),
    };
    let location = location.trim_end_matches('/');
    let location = location.strip_suffix(".git").unwrap_or(location);
    location.trim_end_matches('/').to_ascii_lowercase()
}

/// Whether `dir` holds a collection this tool fetched or can update.
pub fn is_managed(dir: &Path) -> bool {
    git::is_work_tree(dir) || dir.join(METADATA_FILE).exists()
}

/// Outcome of updating every collection in the store.
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub updated: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, TemplError)>,
}

impl UpdateReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} updated, {} failed, {} skipped",
            self.updated.len(),
            self.failed.len(),
            self.skipped.len()
        )
    }
}

/// Update every collection in the store.
///
/// Each collection is attempted even if an earlier one failed; failures are
/// collected in the report. Only a failure to enumerate the store itself is
/// returned as an error.
pub fn update_all(store_config: &StoreConfig) -> Result<UpdateReport> {
    let mut report = UpdateReport::default();

    for collection in store::collections(store_config)? {
        match update_collection(&collection, store_config) {
            Ok(true) => report.updated.push(collection),
            Ok(false) => report.skipped.push(collection),
            Err(e) => {
                tracing::warn!("updating {} failed: {e}", collection.display());
                report.failed.push((collection, e));
            }
        }
    }

    Ok(report)
}

/// Returns `Ok(false)` when there is nothing this tool knows how to update.
fn update_collection(collection: &Path, store_config: &StoreConfig) -> Result<bool> {
    match SourceMetadata::read(collection)? {
        Some(metadata) => {
            let repo = SourceRepository::new(&metadata.origin, metadata.kind, store_config)?;
            repo.refresh(collection)?;
            Ok(true)
        }
        None if git::is_work_tree(collection) => {
            git::pull(collection, &collection.to_string_lossy())?;
            Ok(true)
        }
        None => {
            tracing::warn!(
                "skipping {}: no source metadata and not a git work tree",
                collection.display()
            );
            Ok(false)
        }
    }
}

/// Move a staged collection onto `dest`. The staging directory is only
/// persisted once it is in place; on error it is cleaned up on drop.
fn place(staging: TempDir, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TemplError::Io {
            context: format!("creating directory {}", parent.display()),
            source: e,
        })?;
    }

    match std::fs::rename(staging.path(), dest) {
        Ok(()) => {
            // Already moved; nothing left for TempDir to delete.
            let _ = staging.keep();
            Ok(())
        }
        Err(rename_err) => {
            // rename can fail across filesystems; fall back to copy.
            copy_dir_all(staging.path(), dest).map_err(|e| {
                let _ = std::fs::remove_dir_all(dest);
                TemplError::Io {
                    context: format!(
                        "copying staged collection to {} (rename failed: {rename_err})",
                        dest.display()
                    ),
                    source: std::io::Error::other(e.to_string()),
                }
            })
        }
    }
}

/// Replace the collection at `dest` with `staging`, restoring the old tree
/// if the new one cannot be put in place.
fn swap(staging: TempDir, dest: &Path, store_config: &StoreConfig) -> Result<()> {
    let holding = tempfile::Builder::new()
        .prefix(PREVIOUS_PREFIX)
        .tempdir_in(&store_config.root)
        .map_err(|e| TemplError::Io {
            context: format!("creating holding directory in {}", store_config.root.display()),
            source: e,
        })?;
    let previous = holding.path().join("previous");

    std::fs::rename(dest, &previous).map_err(|e| TemplError::Io {
        context: format!("moving {} aside", dest.display()),
        source: e,
    })?;

    if let Err(e) = place(staging, dest) {
        if let Err(restore_err) = std::fs::rename(&previous, dest) {
            let kept = holding.keep();
            tracing::error!(
                "could not restore {} after a failed update: {restore_err}; the previous copy is in {}",
                dest.display(),
                kept.display()
            );
        }
        return Err(e);
    }

    Ok(())
}

/// Keep the metadata file out of `git status` in a cloned work tree.
fn exclude_metadata_from_git(work_tree: &Path) -> Result<()> {
    use std::io::Write;

    let info = work_tree.join(".git").join("info");
    let io_err = |e| TemplError::Io {
        context: format!("updating {}", info.join("exclude").display()),
        source: e,
    };

    std::fs::create_dir_all(&info).map_err(io_err)?;
    let mut exclude = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(info.join("exclude"))
        .map_err(io_err)?;
    writeln!(exclude, "/{METADATA_FILE}").map_err(io_err)
}

/// Copy the tree under `src` into `dst`. Symlinks are not copied.
fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| TemplError::ListFailed {
            path: src.to_path_buf(),
            source: e,
        })?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| TemplError::Io {
                context: format!("creating directory {}", target.display()),
                source: e,
            })?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target).map_err(|e| TemplError::Io {
                context: format!("copying {} to {}", entry.path().display(), target.display()),
                source: e,
            })?;
        }
    }

    Ok(())
}

fn unix_timestamp_secs() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_secs())
}
