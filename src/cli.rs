use clap::Parser;
use crate::types::*;

#[derive(Parser, Debug)]
#[command(
    name = "cloudurl-repair",
    about = "Repair Firebase Storage download URLs stored in Firestore documents"
)]
pub struct Cli {
    /// Document to repair (if neither this nor --all is given, will prompt)
    #[arg(short = 'd', long, conflicts_with = "all")]
    pub document_id: Option<String>,

    /// Repair every document in each collection
    #[arg(long)]
    pub all: bool,

    /// Collection(s) to process, in order
    #[arg(
        short = 'c',
        long = "collection",
        default_values_t = ["inspections".to_string(), "inspections_data".to_string()]
    )]
    pub collections: Vec<String>,

    /// Firebase project id (default: read from the service key file)
    #[arg(long)]
    pub project_id: Option<String>,

    /// Service account key JSON, read for its project_id
    #[arg(long, default_value = "service-key.json")]
    pub service_key: String,

    /// OAuth2 bearer token for the Google APIs.
    /// Prefer the GOOGLE_OAUTH_ACCESS_TOKEN environment variable; omit for emulators.
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Firestore REST API base URL
    #[arg(long, default_value = crate::firestore::rest::DEFAULT_FIRESTORE_API)]
    pub firestore_url: String,

    /// Cloud Storage JSON API base URL
    #[arg(long, default_value = crate::storage::gcs::DEFAULT_STORAGE_API)]
    pub storage_url: String,

    /// Host that identifies download URLs inside documents
    #[arg(long, default_value = crate::storage::url::DEFAULT_STORAGE_HOST)]
    pub storage_host: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Report what would change without writing documents
    #[arg(long)]
    pub dry_run: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["cloudurl-repair"]).unwrap();
        assert!(cli.document_id.is_none());
        assert!(!cli.all);
        assert_eq!(cli.collections, vec!["inspections", "inspections_data"]);
        assert_eq!(cli.service_key, "service-key.json");
        assert_eq!(cli.storage_host, "firebasestorage.googleapis.com");
        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn test_collections_replace_default() {
        let cli = Cli::try_parse_from([
            "cloudurl-repair",
            "--all",
            "--collection",
            "reports",
            "-c",
            "archive",
        ])
        .unwrap();
        assert!(cli.all);
        assert_eq!(cli.collections, vec!["reports", "archive"]);
    }

    #[test]
    fn test_document_id_conflicts_with_all() {
        let result =
            Cli::try_parse_from(["cloudurl-repair", "--all", "--document-id", "abc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_values() {
        let cli = Cli::try_parse_from(["cloudurl-repair", "--log-level", "warn"]).unwrap();
        assert_eq!(cli.log_level.as_filter(), "warn");
    }
}
