use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_ENV: &str = "GRADEBOOKD_CONFIG";
pub const LOG_ENV: &str = "GRADEBOOKD_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "gradebookd=debug".
    pub log_filter: String,
    /// Per-request cap on assessments.
    pub max_assessments: usize,
    /// Per-request cap on courses.
    pub max_courses: usize,
    pub max_templates: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            max_assessments: 500,
            max_courses: 2000,
            max_templates: 1000,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// File named by `GRADEBOOKD_CONFIG` (defaults otherwise), then the
/// `GRADEBOOKD_LOG` override.
pub fn load() -> anyhow::Result<Config> {
    let mut config = match std::env::var_os(CONFIG_ENV) {
        Some(p) => Config::from_file(Path::new(&p))?,
        None => Config::default(),
    };
    if let Ok(filter) = std::env::var(LOG_ENV) {
        if !filter.trim().is_empty() {
            config.log_filter = filter;
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(f, "max_courses = 10").expect("write");
        let cfg = Config::from_file(f.path()).expect("load");
        assert_eq!(cfg.max_courses, 10);
        assert_eq!(cfg.max_assessments, 500);
        assert_eq!(cfg.max_templates, 1000);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(f, "max_courses = \"many\"").expect("write");
        let err = Config::from_file(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Config::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
