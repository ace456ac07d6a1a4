use std::path::Path;
use std::process::{Command, Output};

use crate::error::{Result, TemplError};

/// Stderr fragments mapped to a hint shown ahead of git's own output.
const GIT_HINTS: &[(&[&str], &str)] = &[
    (
        &["Authentication failed", "could not read Username"],
        "authentication failed: configure git credentials (`gh auth login` or an SSH key)",
    ),
    (
        &["Repository not found", "does not appear to be a git repository"],
        "repository not found: check the origin; private repositories need configured credentials",
    ),
    (
        &["Host key verification failed"],
        "SSH host key verification failed: add the host with `ssh-keyscan <host> >> ~/.ssh/known_hosts`",
    ),
    (
        &["Could not resolve host", "Connection refused"],
        "network error: check your connection and the origin URL",
    ),
    (
        &["Not possible to fast-forward", "not possible to fast-forward"],
        "local history has diverged from the origin and cannot be fast-forwarded",
    ),
];

fn classify_git_error(stderr: &str) -> String {
    GIT_HINTS
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| stderr.contains(needle)))
        .map(|(_, hint)| format!("{hint}\n\ngit output:\n{stderr}"))
        .unwrap_or_else(|| stderr.to_string())
}

/// Whether `dir` is the top of a git work tree.
pub fn is_work_tree(dir: &Path) -> bool {
    dir.join(".git").exists()
}

fn ensure_git() -> Result<()> {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|_| ())
        .map_err(|_| TemplError::GitNotFound)
}

fn run(mut cmd: Command, origin: &str, what: &str) -> Result<Output> {
    ensure_git()?;
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    tracing::debug!("running {cmd:?}");

    let output = cmd.output().map_err(|e| TemplError::Io {
        context: format!("running {what}"),
        source: e,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TemplError::FetchFailed {
            origin: origin.to_string(),
            reason: classify_git_error(stderr.trim()),
        });
    }

    Ok(output)
}

/// Clone `source` (URL or local path) into `dest`, which must be absent or empty.
///
/// Uses the system `git` binary so that the user's credential helpers,
/// SSH agent and `gh auth` setup are inherited.
pub fn clone(source: &str, dest: &Path) -> Result<()> {
    if source.starts_with('-') {
        return Err(TemplError::InvalidOrigin {
            origin: source.to_string(),
            reason: "origin cannot start with '-'".into(),
        });
    }
    if source.starts_with("http://") {
        tracing::warn!("using insecure http:// URL {source}; consider https:// instead");
    }

    let mut cmd = Command::new("git");
    cmd.arg("clone").arg("--quiet").arg("--").arg(source).arg(dest);
    run(cmd, source, "git clone")?;
    Ok(())
}

/// Fast-forward the work tree at `dir` from its upstream.
pub fn pull(dir: &Path, origin: &str) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(dir)
        .arg("pull")
        .arg("--ff-only")
        .arg("--quiet");
    run(cmd, origin, "git pull")?;
    Ok(())
}

/// Current `HEAD` commit of the work tree at `dir`, if it can be determined.
pub fn head_commit(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .arg("rev-parse")
        .arg("HEAD")
        .output()
        .ok()?;

    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// URL of the `origin` remote of the work tree at `dir`.
pub fn remote_url(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["config", "--get", "remote.origin.url"])
        .output()
        .ok()?;

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (output.status.success() && !url.is_empty()).then_some(url)
}

/// True when a usable `git` binary is on PATH.
pub fn available() -> bool {
    ensure_git().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_rejects_option_like_origin() {
        let tmp = tempfile::tempdir().unwrap();
        let err = clone("--upload-pack=evil", &tmp.path().join("dest")).unwrap_err();
        assert!(matches!(err, TemplError::InvalidOrigin { .. }));
    }

    #[test]
    fn clone_fails_on_missing_local_origin() {
        if !available() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let err = clone(missing.to_str().unwrap(), &tmp.path().join("dest")).unwrap_err();
        match err {
            TemplError::FetchFailed { origin, .. } => {
                assert_eq!(origin, missing.to_str().unwrap());
            }
            other => panic!("expected FetchFailed, got: {other:?}"),
        }
    }

    #[test]
    fn plain_directory_is_not_a_work_tree() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!is_work_tree(tmp.path()));
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        assert!(is_work_tree(tmp.path()));
    }

    #[test]
    fn git_errors_get_hints() {
        let cases = [
            (
                "fatal: Authentication failed for 'https://github.com/org/repo.git'",
                "configure git credentials",
            ),
            ("remote: Repository not found.", "repository not found"),
            ("Host key verification failed.", "ssh-keyscan"),
            (
                "fatal: unable to access: Could not resolve host: github.com",
                "network error",
            ),
            (
                "fatal: Not possible to fast-forward, aborting.",
                "cannot be fast-forwarded",
            ),
        ];
        for (stderr, hint) in cases {
            let msg = classify_git_error(stderr);
            assert!(msg.contains(hint), "{stderr}: {msg}");
            assert!(msg.ends_with(stderr), "git output is kept: {msg}");
        }
    }

    #[test]
    fn unrecognised_git_error_is_passed_through() {
        let msg = classify_git_error("fatal: something unexpected happened");
        assert_eq!(msg, "fatal: something unexpected happened");
    }

    #[test]
    fn remote_url_of_plain_directory_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(remote_url(tmp.path()).is_none());
    }
}
