use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::StoreConfig;
use crate::error::{Result, TemplError};

/// List every file under each of `roots`, as `/`-separated paths relative to
/// the root it was found under.
///
/// Entries whose name starts with `.` are pruned together with everything
/// below them, so version-control metadata is never read. A root named
/// explicitly is scanned even if it is hidden itself. Symlinks to files are
/// reported; symlinked directories are not followed.
///
/// Roots that do not exist contribute nothing. Any directory that cannot be
/// read aborts the whole listing. Order is unspecified.
pub fn list_files<P: AsRef<Path>>(roots: &[P]) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for root in roots {
        files.extend(list_root(root.as_ref())?);
    }
    Ok(files)
}

/// List every template in the store.
pub fn list_store(store: &StoreConfig) -> Result<Vec<String>> {
    list_files(&[&store.root])
}

fn list_root(root: &Path) -> Result<Vec<String>> {
    if !root.exists() {
        tracing::debug!("{} does not exist, nothing to list", root.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        // min_depth still runs the predicate on the root, so exempt it.
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|e| list_failed(root, e))?;

        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        files.push(to_slash_path(relative));
    }

    Ok(files)
}

/// Every directory that can hold a collection: `local/<name>` and
/// `github/<owner>/<repo>`, sorted.
pub fn collections(store: &StoreConfig) -> Result<Vec<PathBuf>> {
    let mut found = child_dirs(&store.local_root())?;
    for owner in child_dirs(&store.github_root())? {
        found.extend(child_dirs(&owner)?);
    }
    Ok(found)
}

fn child_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| list_failed(dir, e))?;
        if entry.file_type().is_dir() && !is_hidden_name(entry.file_name()) {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn is_hidden(entry: &DirEntry) -> bool {
    is_hidden_name(entry.file_name())
}

fn is_hidden_name(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn list_failed(root: &Path, source: walkdir::Error) -> TemplError {
    let path = source
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    TemplError::ListFailed { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Layout<'a> {
        directories: &'a [&'a str],
        files: &'a [&'a str],
    }

    fn build(layout: &Layout) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for dir in layout.directories {
            std::fs::create_dir_all(tmp.path().join(dir)).unwrap();
        }
        for file in layout.files {
            let path = tmp.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "this is contentious").unwrap();
        }
        tmp
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn listing_matrix() {
        let cases: &[(&str, Layout, &[&str])] = &[
            (
                "only the top level dir",
                Layout {
                    directories: &[],
                    files: &[],
                },
                &[],
            ),
            (
                "one file in top dir",
                Layout {
                    directories: &[],
                    files: &["test1"],
                },
                &["test1"],
            ),
            (
                "one file one dir down",
                Layout {
                    directories: &["a_directory"],
                    files: &["a_directory/test1"],
                },
                &["a_directory/test1"],
            ),
            (
                "hidden directories are not retrieved",
                Layout {
                    directories: &["a_directory/.git"],
                    files: &["a_directory/test1", "a_directory/.git/should_not_discovered"],
                },
                &["a_directory/test1"],
            ),
            (
                "empty directories contribute nothing",
                Layout {
                    directories: &["empty", "deeper/still/empty"],
                    files: &["deeper/file"],
                },
                &["deeper/file"],
            ),
            (
                "hidden files are skipped too",
                Layout {
                    directories: &[],
                    files: &[".templ-source.toml", "visible"],
                },
                &["visible"],
            ),
        ];

        for (name, layout, want) in cases {
            let tmp = build(layout);
            let got = sorted(list_files(&[tmp.path()]).unwrap());
            let want: Vec<String> = want.iter().map(|s| s.to_string()).collect();
            assert_eq!(got, sorted(want), "case: {name}");
        }
    }

    #[test]
    fn missing_root_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let files = list_files(&[tmp.path().join("nope")]).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn explicitly_named_hidden_root_is_scanned() {
        let tmp = build(&Layout {
            directories: &[],
            files: &[".hidden/inside", ".hidden/.deeper/not_listed"],
        });
        let files = list_files(&[tmp.path().join(".hidden")]).unwrap();
        assert_eq!(files, vec!["inside".to_string()]);
    }

    #[test]
    fn several_roots_are_each_relative_to_themselves() {
        let tmp = build(&Layout {
            directories: &[],
            files: &["one/a", "two/b/c"],
        });
        let files = sorted(list_files(&[tmp.path().join("one"), tmp.path().join("two")]).unwrap());
        assert_eq!(files, vec!["a".to_string(), "b/c".to_string()]);
    }

    #[test]
    fn listing_is_idempotent() {
        let tmp = build(&Layout {
            directories: &["x/.git"],
            files: &["x/one", "x/two", "y/three", "x/.git/HEAD"],
        });
        let first = sorted(list_files(&[tmp.path()]).unwrap());
        let second = sorted(list_files(&[tmp.path()]).unwrap());
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_listed_symlinked_dirs_not_followed() {
        let tmp = build(&Layout {
            directories: &[],
            files: &["real/file", "outside/secret"],
        });
        std::os::unix::fs::symlink(tmp.path().join("real/file"), tmp.path().join("real/link"))
            .unwrap();
        std::os::unix::fs::symlink(tmp.path().join("outside"), tmp.path().join("real/dirlink"))
            .unwrap();

        let files = sorted(list_files(&[tmp.path().join("real")]).unwrap());
        assert_eq!(files, vec!["file".to_string(), "link".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_fails_listing() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = build(&Layout {
            directories: &["locked"],
            files: &["ok"],
        });
        let locked = tmp.path().join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read it anyway.
        let readable = std::fs::read_dir(&locked).is_ok();
        let result = list_files(&[tmp.path()]);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert!(matches!(result, Err(TemplError::ListFailed { .. })));
        }
    }

    #[test]
    fn collections_cover_both_layouts() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StoreConfig::new(tmp.path());
        for dir in [
            "local/b",
            "local/a",
            "github/owner/repo",
            "github/other/thing",
            "github/.hidden/skip",
        ] {
            std::fs::create_dir_all(tmp.path().join(dir)).unwrap();
        }
        std::fs::write(tmp.path().join("local/not-a-dir"), "").unwrap();

        let found = collections(&store).unwrap();
        let expected: Vec<PathBuf> = [
            "local/a",
            "local/b",
            "github/other/thing",
            "github/owner/repo",
        ]
        .iter()
        .map(|p| tmp.path().join(p))
        .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn list_store_skips_metadata_and_staging() {
        let tmp = build(&Layout {
            directories: &[".templ-staging-abc"],
            files: &[
                "local/mine/a.tmpl",
                "local/mine/.templ-source.toml",
                ".templ-staging-abc/partial",
                ".templ.lock",
            ],
        });
        let store = StoreConfig::new(tmp.path());
        assert_eq!(list_store(&store).unwrap(), vec!["local/mine/a.tmpl"]);
    }
}
