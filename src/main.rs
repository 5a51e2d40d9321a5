//! cloudurl-repair: repairs Firebase Storage download URLs stored in Firestore.
//!
//! Every document is scanned for download URLs and for media entries whose
//! URL is missing. Stale tokens are replaced with the object's current
//! download token, URLs pointing at a malformed bucket are redirected to the
//! project's bucket, and missing URLs are generated for objects that exist at
//! their conventional storage path. Patched documents are written back whole.

#![warn(clippy::all)]

mod cli;
mod config;
mod firestore;
mod http;
mod reconcile;
mod storage;
#[cfg(test)]
mod testing;
mod tree;
mod types;

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::{Config, Target};
use firestore::FirestoreRestStore;
use reconcile::{report, Reconciler};
use storage::{GcsObjectStore, UrlRewriter};
use tree::{RefFields, TreeScanner};

/// Ask for a document id on stdin.
fn prompt_document_id() -> anyhow::Result<String> {
    print!("Document ID: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let id = input.trim();
    if id.is_empty() {
        anyhow::bail!("Document ID is required");
    }
    Ok(id.to_string())
}

/// Reconcile one document in each collection. A collection that does not
/// contain the document is reported and skipped.
async fn run_document(
    reconciler: &Reconciler,
    collections: &[String],
    id: &str,
) -> anyhow::Result<()> {
    for collection in collections {
        tracing::info!(collection = %collection, id, "Processing collection");
        match reconciler.reconcile_by_id(collection, id).await {
            Ok(outcome) => print!("{}", report::render_document(collection, &outcome)),
            Err(e) if e.is_not_found() => {
                println!("[{collection}] {id}: document not found");
            }
            Err(e) => {
                tracing::error!(collection = %collection, id, error = %e, "Reconciliation failed");
                println!("[{collection}] {id}: FAILED: {e}");
            }
        }
    }
    Ok(())
}

/// Reconcile every document of each collection.
async fn run_all(reconciler: &Reconciler, collections: &[String]) -> anyhow::Result<()> {
    for collection in collections {
        tracing::info!(collection = %collection, "Processing collection");
        match reconciler.reconcile_collection(collection).await {
            Ok(collection_report) => {
                print!("{}", report::render_collection(&collection_report));
            }
            Err(e) => {
                tracing::error!(collection = %collection, error = %e, "Could not list collection");
                println!("[{collection}] FAILED: {e}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(cli)?;
    tracing::debug!(?config, "Loaded configuration");
    if config.access_token.is_none() {
        tracing::warn!("No access token configured, requests are unauthenticated");
    }

    let api = http::ApiClient::new(config.access_token.clone(), config.timeout)?;
    let documents = Arc::new(FirestoreRestStore::new(
        api.clone(),
        &config.firestore_url,
        &config.project_id,
    ));
    let objects = Arc::new(GcsObjectStore::new(api, &config.storage_url));

    let canonical_bucket = config.canonical_bucket();
    tracing::info!(
        project = %config.project_id,
        bucket = %canonical_bucket,
        dry_run = config.dry_run,
        "Starting cloudurl-repair"
    );

    let reconciler = Reconciler::new(
        documents,
        objects,
        UrlRewriter::new(config.storage_host.as_str(), canonical_bucket),
        TreeScanner::new(config.storage_host.as_str(), RefFields::default()),
    )
    .with_dry_run(config.dry_run);

    match config.target {
        Target::All => run_all(&reconciler, &config.collections).await,
        Target::Document(id) => run_document(&reconciler, &config.collections, &id).await,
        Target::Prompt => {
            let id = prompt_document_id()?;
            run_document(&reconciler, &config.collections, &id).await
        }
    }
}
