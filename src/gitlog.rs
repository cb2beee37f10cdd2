//! External `git` invocation: history extraction and author listing.
//!
//! The log format is hand-matched by [`crate::parser`]: the single quotes in
//! the `--date=format:` argument are deliberate, they end up verbatim in the
//! output and anchor the header regex.

use crate::record::author_composite;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Diagnostic substring identifying the benign "empty repository" failure.
pub const NO_COMMITS_MARKER: &str = "does not have any commits yet";

#[derive(Debug)]
pub enum GitError {
    /// The git binary is not on PATH.
    GitMissing { source: std::io::Error },
    /// Spawning or waiting on git failed for one repository.
    Invoke {
        repo: PathBuf,
        source: std::io::Error,
    },
    /// git exited nonzero for a reason other than an empty repository.
    Failed {
        repo: PathBuf,
        code: Option<i32>,
        stderr: String,
    },
}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::GitMissing { source } => {
                write!(f, "could not find git in your PATH: {}", source)
            }
            GitError::Invoke { repo, source } => {
                write!(f, "running git in {} failed: {}", repo.display(), source)
            }
            GitError::Failed { repo, code, stderr } => {
                write!(
                    f,
                    "git log in {} exited with {:?}: {}",
                    repo.display(),
                    code,
                    stderr
                )
            }
        }
    }
}

impl std::error::Error for GitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GitError::GitMissing { source } | GitError::Invoke { source, .. } => Some(source),
            GitError::Failed { .. } => None,
        }
    }
}

/// Verify the git binary is available. Called once, before any repository is
/// enumerated, so a missing binary fails fast instead of per repository.
pub async fn ensure_git() -> Result<(), GitError> {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|_| ())
        .map_err(|source| GitError::GitMissing { source })
}

/// Argument template for the history extraction call. One `:(exclude)` pathspec
/// per non-empty exclusion pattern, after the `--` separator.
fn log_args(repo: &Path, exclude: &[String]) -> Vec<String> {
    let mut args = vec![
        "-C".to_string(),
        repo.display().to_string(),
        "log".to_string(),
        "--pretty=format:%ad,%ae,%an".to_string(),
        "--date=format:'%Y-%m-%d %H:%M'".to_string(),
        "--numstat".to_string(),
        "--".to_string(),
        ".".to_string(),
    ];
    args.extend(
        exclude
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| format!(":(exclude){p}")),
    );
    args
}

/// Run the history extraction command for one repository and return its raw
/// output lines. A repository without commits yields empty output, not an
/// error.
pub async fn log_lines(repo: &Path, exclude: &[String]) -> Result<Vec<String>, GitError> {
    let invoke_err = |source| GitError::Invoke {
        repo: repo.to_path_buf(),
        source,
    };
    let abs = tokio::fs::canonicalize(repo).await.map_err(invoke_err)?;

    let output = Command::new("git")
        .args(log_args(&abs, exclude))
        .output()
        .await
        .map_err(invoke_err)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains(NO_COMMITS_MARKER) {
            return Ok(Vec::new());
        }
        return Err(GitError::Failed {
            repo: repo.to_path_buf(),
            code: output.status.code(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect())
}

/// All distinct author composites in one repository, sorted.
pub async fn list_authors(repo: &Path) -> Result<Vec<String>, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["log", "--format=%an (%ae)"])
        .output()
        .await
        .map_err(|source| GitError::Invoke {
            repo: repo.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains(NO_COMMITS_MARKER) {
            return Ok(Vec::new());
        }
        return Err(GitError::Failed {
            repo: repo.to_path_buf(),
            code: output.status.code(),
            stderr,
        });
    }

    let authors: BTreeSet<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(normalize_author_line)
        .collect();
    Ok(authors.into_iter().collect())
}

/// Re-apply the name/email sentinels to a raw `Name (email)` line.
fn normalize_author_line(line: &str) -> String {
    match line.rsplit_once(" (") {
        Some((name, rest)) => {
            let email = rest.strip_suffix(')').unwrap_or(rest);
            author_composite(name.trim(), email)
        }
        None => author_composite(line.trim(), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn git_available() -> bool {
        ensure_git().await.is_ok()
    }

    /// Init a scratch repository with one commit touching `file` via the real
    /// git binary.
    async fn init_repo(dir: &Path, file: &str, content: &str) {
        let run = |args: Vec<String>| {
            let dir = dir.to_path_buf();
            async move {
                let status = Command::new("git")
                    .arg("-C")
                    .arg(&dir)
                    .args(&args)
                    .env("GIT_AUTHOR_NAME", "Test Author")
                    .env("GIT_AUTHOR_EMAIL", "test@example.com")
                    .env("GIT_COMMITTER_NAME", "Test Author")
                    .env("GIT_COMMITTER_EMAIL", "test@example.com")
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .unwrap();
                assert!(status.success(), "git {args:?} failed");
            }
        };

        run(vec!["init".into(), "-q".into()]).await;
        tokio::fs::write(dir.join(file), content).await.unwrap();
        run(vec!["add".into(), ".".into()]).await;
        run(vec![
            "commit".into(),
            "-q".into(),
            "-m".into(),
            "initial".into(),
        ])
        .await;
    }

    #[test]
    fn log_args_follow_the_fixed_template() {
        let args = log_args(Path::new("/repo"), &[]);
        assert_eq!(
            args,
            vec![
                "-C",
                "/repo",
                "log",
                "--pretty=format:%ad,%ae,%an",
                "--date=format:'%Y-%m-%d %H:%M'",
                "--numstat",
                "--",
                "."
            ]
        );
    }

    #[test]
    fn log_args_append_one_exclude_per_pattern() {
        let args = log_args(
            Path::new("/repo"),
            &["*.lock".to_string(), String::new(), "vendor/*".to_string()],
        );
        assert_eq!(args[8], ":(exclude)*.lock");
        assert_eq!(args[9], ":(exclude)vendor/*");
        assert_eq!(args.len(), 10);
    }

    #[test]
    fn normalize_author_line_applies_sentinels() {
        assert_eq!(
            normalize_author_line("Alice (alice@x.com)"),
            "Alice (alice@x.com)"
        );
        assert_eq!(normalize_author_line("Alice ()"), "Alice (Unknown Email)");
        assert_eq!(
            normalize_author_line(" ("),
            "Unknown Name (Unknown Email)"
        );
        assert_eq!(
            normalize_author_line("NoEmailAtAll"),
            "NoEmailAtAll (Unknown Email)"
        );
    }

    #[tokio::test]
    async fn log_lines_produces_parseable_output() {
        if !git_available().await {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path(), "a.rs", "fn main() {}\n").await;

        let lines = log_lines(dir.path(), &[]).await.unwrap();
        assert!(lines.iter().any(|l| l.starts_with('\'')), "header missing: {lines:?}");
        assert!(lines.iter().any(|l| l.ends_with("a.rs")));

        let parsed = crate::parser::parse(&lines).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.records()[0].author(), "Test Author (test@example.com)");
        assert_eq!(parsed.records()[0].plus(), 1);
    }

    #[tokio::test]
    async fn log_lines_applies_exclusions() {
        if !git_available().await {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path(), "kept.rs", "fn main() {}\n").await;
        tokio::fs::write(dir.path().join("skipped.lock"), "lockfile\n")
            .await
            .unwrap();
        let run = Command::new("git")
            .arg("-C")
            .arg(dir.path())
            .args(["add", "."])
            .status()
            .await
            .unwrap();
        assert!(run.success());
        let run = Command::new("git")
            .arg("-C")
            .arg(dir.path())
            .args(["commit", "-q", "-m", "lock"])
            .env("GIT_AUTHOR_NAME", "Test Author")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test Author")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .status()
            .await
            .unwrap();
        assert!(run.success());

        let lines = log_lines(dir.path(), &["*.lock".to_string()]).await.unwrap();
        assert!(lines.iter().any(|l| l.ends_with("kept.rs")));
        assert!(!lines.iter().any(|l| l.ends_with("skipped.lock")));
    }

    #[tokio::test]
    async fn empty_repository_is_benign() {
        if !git_available().await {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let status = Command::new("git")
            .arg("-C")
            .arg(dir.path())
            .args(["init", "-q"])
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let lines = log_lines(dir.path(), &[]).await.unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn broken_repository_is_fatal() {
        if !git_available().await {
            return;
        }
        // A bare directory with an empty .git folder is not a repository.
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        let err = log_lines(dir.path(), &[]).await.unwrap_err();
        assert!(matches!(err, GitError::Failed { .. }));
    }

    #[tokio::test]
    async fn list_authors_dedupes_and_sorts() {
        if !git_available().await {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path(), "a.rs", "one\n").await;
        // Second commit by the same author must not duplicate the entry.
        tokio::fs::write(dir.path().join("a.rs"), "two\n").await.unwrap();
        let status = Command::new("git")
            .arg("-C")
            .arg(dir.path())
            .args(["commit", "-q", "-am", "again"])
            .env("GIT_AUTHOR_NAME", "Test Author")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test Author")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let authors = list_authors(dir.path()).await.unwrap();
        assert_eq!(authors, vec!["Test Author (test@example.com)"]);
    }
}
