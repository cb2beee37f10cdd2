//! On-disk settings, loaded from `~/.config/prodstats/config.toml`.
//!
//! Every value has a default, so a missing file is not an error. Settings are
//! plain values handed to the components that need them; nothing reads a
//! process-wide singleton.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level settings file.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub report: ReportSettings,
    pub plot: PlotSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReportSettings {
    /// Root directories scanned for repositories.
    pub dirs: Vec<PathBuf>,
    /// Pathspec patterns excluded from line stats.
    pub exclude: Vec<String>,
    /// Where the persisted report lands.
    pub output: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PlotSettings {
    /// Output template; `<chart>`, `<authors>`, `<start_date>`, `<end_date>`
    /// and `<timestamp>` placeholders are resolved per run.
    pub output: String,
    /// Default author tokens when none are given on the command line.
    pub authors: Vec<String>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            dirs: vec![PathBuf::from(".")],
            exclude: default_exclude(),
            output: default_report_path(),
        }
    }
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            output: "<chart>_<authors>_<start_date>_<end_date>.json".to_string(),
            authors: Vec::new(),
        }
    }
}

/// Directory holding the settings file and the default report.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("prodstats"))
}

/// `config.toml` inside [`default_config_dir`], falling back to the working
/// directory when no home is known.
pub fn default_settings_path() -> PathBuf {
    default_config_dir()
        .map(|d| d.join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn default_report_path() -> PathBuf {
    default_config_dir()
        .map(|d| d.join("report.json"))
        .unwrap_or_else(|| PathBuf::from("report.json"))
}

/// Patterns for files that inflate line stats without reflecting work:
/// lockfiles, vendored and generated trees, binary assets.
fn default_exclude() -> Vec<String> {
    [
        "**node_modules/*",
        "**vendor/*",
        "**target/*",
        "**go.sum",
        "**go.mod",
        "**Cargo.lock",
        "**yarn.lock",
        "**package-lock.json",
        "**pnpm-lock.yaml",
        "**requirements.txt",
        "**venv/*",
        "**dist/*",
        "**build/*",
        "**.git/*",
        "**.idea/*",
        "**.vscode/*",
        "**.pytest_cache/*",
        "**.next/*",
        "**.cache/*",
        "**__pycache__/*",
        "**coverage.xml",
        "**coverage.html",
        "**coverage.lcov",
        "**LICENSE.md",
        "**.DS_Store",
        "**Thumbs.db",
        "*.csv",
        "*.pdf",
        "*.json",
        "*.png",
        "*.jpg",
        "*.jpeg",
        "*.gif",
        "*.svg",
        "*.ico",
        "*.woff",
        "*.woff2",
        "*.ttf",
        "*.eot",
        "*.txt",
        "*.log",
        "*.bak",
        "*.swp",
        "*.tmp",
        "*.o",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Encode { source: toml::ser::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "settings file {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "settings file {} is invalid: {}", path.display(), source)
            }
            ConfigError::Encode { source } => write!(f, "encoding settings failed: {}", source),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Encode { source } => Some(source),
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let encoded =
            toml::to_string_pretty(self).map_err(|source| ConfigError::Encode { source })?;
        std::fs::write(path, encoded).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(s, Settings::default());
        assert!(s.report.exclude.iter().any(|p| p.contains("node_modules")));
        assert_eq!(s.report.dirs, vec![PathBuf::from(".")]);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[plot]\nauthors = [\"alice\"]\n\n[report]\noutput = \"/tmp/r.json\"\n",
        )
        .unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.plot.authors, vec!["alice"]);
        assert_eq!(s.report.output, PathBuf::from("/tmp/r.json"));
        // Unspecified sections/fields fall back to defaults.
        assert_eq!(s.plot.output, PlotSettings::default().output);
        assert!(!s.report.exclude.is_empty());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "report = not-a-table").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut s = Settings::default();
        s.plot.authors = vec!["alice".into(), "bob".into()];
        s.report.dirs = vec![PathBuf::from("/work")];
        s.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), s);
    }
}
