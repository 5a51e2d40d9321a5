use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which documents a run touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One document, looked up in every configured collection.
    Document(String),
    /// Every document in every configured collection.
    All,
    /// Ask for a document id on stdin.
    Prompt,
}

/// Application configuration.
pub struct Config {
    pub target: Target,
    pub collections: Vec<String>,
    pub project_id: String,
    pub access_token: Option<String>,
    pub firestore_url: String,
    pub storage_url: String,
    pub storage_host: String,
    pub timeout: Duration,
    pub dry_run: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("target", &self.target)
            .field("collections", &self.collections)
            .field("project_id", &self.project_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("firestore_url", &self.firestore_url)
            .field("storage_url", &self.storage_url)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

/// The parts of a service account key we care about.
#[derive(Debug, Deserialize)]
struct ServiceKey {
    project_id: String,
}

fn read_project_id(path: &Path) -> anyhow::Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read service key {}", path.display()))?;
    let key: ServiceKey = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid service key {}", path.display()))?;
    if key.project_id.trim().is_empty() {
        anyhow::bail!("Service key {} has an empty project_id", path.display());
    }
    Ok(key.project_id)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        let project_id = match cli.project_id.filter(|p| !p.trim().is_empty()) {
            Some(project_id) => project_id,
            None => read_project_id(&expand_tilde(&cli.service_key))
                .context("No --project-id given and the service key could not be used")?,
        };

        let target = match cli.document_id {
            Some(id) if !id.trim().is_empty() => Target::Document(id.trim().to_string()),
            Some(_) => anyhow::bail!("Document ID is required"),
            None if cli.all => Target::All,
            None => Target::Prompt,
        };

        if cli.collections.iter().any(|c| c.trim().is_empty()) {
            anyhow::bail!("Collection names must not be empty");
        }

        Ok(Self {
            target,
            collections: cli.collections,
            project_id,
            access_token: cli.access_token.filter(|t| !t.is_empty()),
            firestore_url: cli.firestore_url,
            storage_url: cli.storage_url,
            storage_host: cli.storage_host,
            timeout: Duration::from_secs(cli.timeout),
            dry_run: cli.dry_run,
        })
    }

    /// Bucket that malformed URLs and generated URLs point at.
    pub fn canonical_bucket(&self) -> String {
        format!("{}.firebasestorage.app", self.project_id)
    }
}
