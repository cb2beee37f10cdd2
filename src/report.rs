//! Report generation: concurrent per-repository fan-out and merge.
//!
//! One task per discovered repository, no concurrency ceiling and no
//! cancellation: every task runs to completion even after a sibling fails.
//! Results and errors flow through channels sized to the task count so
//! producers never block; both channels are drained only after every task has
//! been joined, so the collector always observes the full set of errors.

use crate::gitlog::{self, GitError};
use crate::locator::{self, LocateError};
use crate::parser;
use crate::record::{RecordCollection, StoreError};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum ReportError {
    Locate(LocateError),
    Git(GitError),
    /// One message per failed repository, collected across the whole run.
    Repos { errors: Vec<String> },
    Store(StoreError),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Locate(e) => write!(f, "{e}"),
            ReportError::Git(e) => write!(f, "{e}"),
            ReportError::Repos { errors } => {
                write!(
                    f,
                    "{} repositor{} failed: {}",
                    errors.len(),
                    if errors.len() == 1 { "y" } else { "ies" },
                    errors.join("; ")
                )
            }
            ReportError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Locate(e) => Some(e),
            ReportError::Git(e) => Some(e),
            ReportError::Repos { .. } => None,
            ReportError::Store(e) => Some(e),
        }
    }
}

/// Outcome of the concurrent fan-out before error aggregation: the merged
/// records of every successful repository plus one message per failure.
#[derive(Debug)]
struct Harvest {
    records: RecordCollection,
    errors: Vec<String>,
}

/// Generates and persists a productivity report across repository roots.
#[derive(Debug, Clone)]
pub struct Report {
    dirs: Vec<PathBuf>,
    exclude: Vec<String>,
    output: PathBuf,
}

impl Report {
    pub fn new(dirs: Vec<PathBuf>, exclude: Vec<String>, output: PathBuf) -> Self {
        Self {
            dirs,
            exclude,
            output,
        }
    }

    /// Discover repositories, extract and parse their history concurrently,
    /// merge, and persist. Fails before enumeration if git is missing; fails
    /// after the full fan-out if any repository failed.
    pub async fn generate(&self) -> Result<RecordCollection, ReportError> {
        gitlog::ensure_git().await.map_err(ReportError::Git)?;

        let harvest = harvest(&self.dirs, &self.exclude).await?;
        if !harvest.errors.is_empty() {
            return Err(ReportError::Repos {
                errors: harvest.errors,
            });
        }

        harvest.records.save(&self.output).map_err(ReportError::Store)?;
        tracing::info!(
            records = harvest.records.len(),
            output = %self.output.display(),
            "report saved"
        );
        Ok(harvest.records)
    }
}

/// Fan out one task per repository and wait for all of them.
async fn harvest(dirs: &[PathBuf], exclude: &[String]) -> Result<Harvest, ReportError> {
    let mut repos: Vec<PathBuf> = Vec::new();
    locator::find_repositories(dirs, |repo| repos.push(repo.to_path_buf()))
        .map_err(ReportError::Locate)?;

    // Capacity equals the task count; each task sends exactly one message, so
    // no producer ever blocks.
    let capacity = repos.len().max(1);
    let (results_tx, mut results_rx) = mpsc::channel::<RecordCollection>(capacity);
    let (errors_tx, mut errors_rx) = mpsc::channel::<String>(capacity);

    let mut tasks = Vec::with_capacity(repos.len());
    for repo in repos {
        let results_tx = results_tx.clone();
        let errors_tx = errors_tx.clone();
        let exclude = exclude.to_vec();
        tasks.push(tokio::spawn(async move {
            process_repo(&repo, &exclude, results_tx, errors_tx).await;
        }));
    }
    drop(results_tx);
    drop(errors_tx);

    // Join every task before draining: the channels only close once all
    // senders are gone, so a None from recv means the run is fully settled.
    for task in tasks {
        let _ = task.await;
    }

    let mut errors = Vec::new();
    while let Some(message) = errors_rx.recv().await {
        errors.push(message);
    }

    let mut records = RecordCollection::new();
    while let Some(slice) = results_rx.recv().await {
        // Concatenation only: each slice is already internally sorted.
        records.append(slice);
    }

    Ok(Harvest { records, errors })
}

/// Extract and parse one repository, publishing to exactly one channel.
async fn process_repo(
    repo: &Path,
    exclude: &[String],
    results_tx: mpsc::Sender<RecordCollection>,
    errors_tx: mpsc::Sender<String>,
) {
    tracing::info!(repo = %repo.display(), "processing repository");

    let lines = match gitlog::log_lines(repo, exclude).await {
        Ok(lines) => lines,
        Err(err) => {
            let _ = errors_tx.send(format!("getting logs failed: {err}")).await;
            return;
        }
    };

    match parser::parse(&lines) {
        Ok(records) => {
            let _ = results_tx.send(records).await;
        }
        Err(err) => {
            let _ = errors_tx
                .send(format!("parsing logs from {} failed: {err}", repo.display()))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    async fn git_available() -> bool {
        gitlog::ensure_git().await.is_ok()
    }

    async fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_AUTHOR_NAME", "Test Author")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test Author")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .unwrap();
        assert!(status.success(), "git {args:?} failed in {}", dir.display());
    }

    async fn commit_file(dir: &Path, file: &str, content: &str) {
        git(dir, &["init", "-q"]).await;
        tokio::fs::write(dir.join(file), content).await.unwrap();
        git(dir, &["add", "."]).await;
        git(dir, &["commit", "-q", "-m", "initial"]).await;
    }

    #[tokio::test]
    async fn generate_merges_all_repositories() {
        if !git_available().await {
            return;
        }
        let root = tempfile::tempdir().unwrap();
        for name in ["one", "two", "three"] {
            let repo = root.path().join(name);
            tokio::fs::create_dir(&repo).await.unwrap();
            commit_file(&repo, "main.rs", "fn main() {}\nfn extra() {}\n").await;
        }
        let output = root.path().join("report.json");

        let report = Report::new(
            vec![root.path().to_path_buf()],
            Vec::new(),
            output.clone(),
        );
        let records = report.generate().await.unwrap();

        assert_eq!(records.len(), 3);
        // Persisted collection reloads identically.
        assert_eq!(RecordCollection::load(&output).unwrap(), records);
    }

    #[tokio::test]
    async fn failing_repository_does_not_cancel_siblings() {
        if !git_available().await {
            return;
        }
        let root = tempfile::tempdir().unwrap();
        for name in ["r1", "r2", "r4", "r5"] {
            let repo = root.path().join(name);
            tokio::fs::create_dir(&repo).await.unwrap();
            commit_file(&repo, "lib.rs", "pub fn f() {}\n").await;
        }
        // Repository #3: a .git marker that is not a usable repository.
        tokio::fs::create_dir_all(root.path().join("r3/.git"))
            .await
            .unwrap();

        let harvest = harvest(&[root.path().to_path_buf()], &[]).await.unwrap();

        // The four healthy repositories all delivered their slices.
        assert_eq!(harvest.records.len(), 4);
        assert_eq!(harvest.errors.len(), 1);
        assert!(harvest.errors[0].contains("r3"), "{:?}", harvest.errors);

        // And generate() folds the failure into one aggregate error.
        let report = Report::new(
            vec![root.path().to_path_buf()],
            Vec::new(),
            root.path().join("report.json"),
        );
        let err = report.generate().await.unwrap_err();
        assert!(matches!(err, ReportError::Repos { .. }));
        assert!(err.to_string().contains("1 repository failed"));
        assert!(err.to_string().contains("r3"));
    }

    #[tokio::test]
    async fn empty_roots_save_an_empty_report() {
        if !git_available().await {
            return;
        }
        let root = tempfile::tempdir().unwrap();
        let output = root.path().join("report.json");

        let report = Report::new(vec![root.path().to_path_buf()], Vec::new(), output.clone());
        let records = report.generate().await.unwrap();
        assert!(records.is_empty());
        assert!(output.exists());
    }

    #[tokio::test]
    async fn missing_root_fails_with_locate_error() {
        if !git_available().await {
            return;
        }
        let report = Report::new(
            vec![PathBuf::from("/nonexistent-root-xyz")],
            Vec::new(),
            PathBuf::from("/tmp/unused-report.json"),
        );
        let err = report.generate().await.unwrap_err();
        assert!(matches!(err, ReportError::Locate(_)));
    }
}
