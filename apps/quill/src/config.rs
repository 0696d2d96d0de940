use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::domain::ExportFormat;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "quill.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub doc_type: ExportFormat,
    pub export_dir: PathBuf,
    pub log_filter: String,
    pub token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: 60,
            doc_type: ExportFormat::Docx,
            export_dir: PathBuf::from("."),
            log_filter: "info".into(),
            token: None,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.server_url {
            self.server_url = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file.doc_type {
            self.doc_type = v;
        }
        if let Some(v) = file.export_dir {
            self.export_dir = v;
        }
        if let Some(v) = file.log_filter {
            self.log_filter = v;
        }
    }

    /// Later keys win, so `APP__SERVER_URL` overrides `QUILL_SERVER_URL`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = lookup("QUILL_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("APP__SERVER_URL") {
            self.server_url = v;
        }

        if let Some(v) = lookup("QUILL_TIMEOUT_SECS") {
            self.request_timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("QUILL_TIMEOUT_SECS is not a number: {v}"))?;
        }

        if let Some(v) = lookup("QUILL_EXPORT_DIR") {
            self.export_dir = PathBuf::from(v);
        }

        if let Some(v) = lookup("QUILL_TOKEN") {
            let v = v.trim();
            if !v.is_empty() {
                self.token = Some(v.to_string());
            }
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(v) = &overrides.server_url {
            self.server_url = v.clone();
        }
        if let Some(v) = overrides.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = overrides.doc_type {
            self.doc_type = v;
        }
        if let Some(v) = &overrides.export_dir {
            self.export_dir = v.clone();
        }
        if let Some(v) = &overrides.log_filter {
            self.log_filter = v.clone();
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(self.server_url.trim())
            .with_context(|| format!("invalid server url '{}'", self.server_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("server url must use http or https, got '{}'", url.scheme());
        }
        if self.request_timeout_secs == 0 {
            bail!("request timeout must be at least one second");
        }
        Ok(())
    }
}

/// Command-line values; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub server_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub doc_type: Option<ExportFormat>,
    pub export_dir: Option<PathBuf>,
    pub log_filter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    doc_type: Option<ExportFormat>,
    export_dir: Option<PathBuf>,
    log_filter: Option<String>,
}

/// Defaults, then the first config file found, then the environment, then
/// the command line.
pub fn load_settings(overrides: &Overrides) -> anyhow::Result<Settings> {
    let candidates = match &overrides.config_path {
        Some(path) => vec![path.clone()],
        None => default_config_paths(),
    };
    let lookup = |key: &str| std::env::var(key).ok();
    resolve_settings(&candidates, overrides.config_path.is_some(), lookup, overrides)
}

pub(crate) fn resolve_settings(
    candidates: &[PathBuf],
    require_file: bool,
    lookup: impl Fn(&str) -> Option<String>,
    overrides: &Overrides,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let mut found = false;
    for path in candidates {
        if let Some(file) = read_file_settings(path)? {
            settings.apply_file(file);
            found = true;
            break;
        }
    }
    if require_file && !found {
        bail!("config file not found: {}", display_paths(candidates));
    }

    settings.apply_env(lookup)?;
    settings.apply_overrides(overrides);
    settings.validate()?;
    Ok(settings)
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("quill").join(CONFIG_FILE_NAME));
    }
    paths
}

fn read_file_settings(path: &Path) -> anyhow::Result<Option<FileSettings>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let parsed = toml::from_str::<FileSettings>(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(parsed))
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
