//! Per-document reconciliation pipeline.
//!
//! One document at a time: scan the tree, resolve a token for every storage
//! URL, synthesize URLs for empty media references, build a patch, and write
//! the patched document back. Documents are processed strictly in sequence.
//! A failing field is recorded as a [`SkipReason`] and does not stop the
//! rest of the document; a failing fetch, patch, or write fails the document.

pub mod error;
pub mod report;

pub use error::ReconcileError;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::firestore::{Document, DocumentStore};
use crate::storage::token::media_path;
use crate::storage::{ObjectStore, TokenOutcome, TokenResolver, UrlRewriter};
use crate::tree::{patch, DocPath, EmptyRefFinding, MutationOp, TreeScanner, UrlFinding};

/// What happened to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    TokenRefreshed,
    BucketCorrected,
    Generated { filename: String },
    /// The URL pointed at an object we may not read; the field was dropped.
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::TokenRefreshed => f.write_str("token refreshed"),
            ChangeKind::BucketCorrected => f.write_str("bucket and token corrected"),
            ChangeKind::Generated { filename } => write!(f, "URL generated for {filename}"),
            ChangeKind::Removed => f.write_str("permission denied, URL removed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: DocPath,
    pub kind: ChangeKind,
    pub old_url: Option<String>,
    pub new_url: Option<String>,
}

/// Why a finding produced no mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("unparseable storage URL: {0}")]
    UnparseableUrl(String),

    #[error("could not obtain a token: {0}")]
    TokenUnavailable(String),

    #[error("no object at {storage_path}")]
    ObjectMissing { storage_path: String },

    #[error("permission denied for {storage_path}, field left empty")]
    PermissionDenied { storage_path: String },

    #[error("could not generate URL: {0}")]
    GenerationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub path: DocPath,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub document_id: String,
    pub changes: Vec<Change>,
    pub skipped: Vec<Skipped>,
    /// Whether the patched document was written back.
    pub persisted: bool,
}

impl ReconciliationResult {
    pub fn updated_count(&self) -> usize {
        self.changes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Neither storage URLs nor empty references were found.
    NoFindings { document_id: String },
    Reconciled(ReconciliationResult),
}

/// Results of reconciling every document in a collection.
#[derive(Debug)]
pub struct CollectionReport {
    pub collection: String,
    pub outcomes: Vec<DocumentOutcome>,
    pub failures: Vec<(String, ReconcileError)>,
}

impl CollectionReport {
    pub fn updated_documents(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DocumentOutcome::Reconciled(r) if r.persisted))
            .count()
    }
}

/// Mutations and report entries planned for one document.
#[derive(Default)]
struct Plan {
    ops: Vec<MutationOp>,
    changes: Vec<Change>,
    skipped: Vec<Skipped>,
}

impl Plan {
    fn push(&mut self, op: MutationOp, change: Change) {
        self.ops.push(op);
        self.changes.push(change);
    }
}

pub struct Reconciler {
    documents: Arc<dyn DocumentStore>,
    tokens: TokenResolver,
    rewriter: UrlRewriter,
    scanner: TreeScanner,
    dry_run: bool,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("rewriter", &self.rewriter)
            .field("scanner", &self.scanner)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        rewriter: UrlRewriter,
        scanner: TreeScanner,
    ) -> Self {
        Self {
            documents,
            tokens: TokenResolver::new(objects),
            rewriter,
            scanner,
            dry_run: false,
        }
    }

    /// Plan and report changes without writing anything back.
    ///
    /// Documents are not written and minted tokens are not stored on their
    /// objects, so the URLs reported for tokenless objects are not final.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self.tokens.set_dry_run(dry_run);
        self
    }

    /// Reconcile one document looked up by id.
    pub async fn reconcile_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<DocumentOutcome, ReconcileError> {
        let document = self.documents.get_by_id(collection, id).await?;
        info!(collection, id, "Document found");
        self.reconcile_document(collection, &document).await
    }

    /// Reconcile every document in `collection`.
    ///
    /// Listing the collection is fatal; a failing document is recorded and
    /// the run moves on to the next one.
    pub async fn reconcile_collection(
        &self,
        collection: &str,
    ) -> Result<CollectionReport, ReconcileError> {
        let documents = self.documents.get_all(collection).await?;
        info!(collection, count = documents.len(), "Fetched documents");

        let mut report = CollectionReport {
            collection: collection.to_string(),
            outcomes: Vec::with_capacity(documents.len()),
            failures: Vec::new(),
        };
        for document in &documents {
            match self.reconcile_document(collection, document).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    warn!(collection, id = %document.id, error = %e, "Document failed");
                    report.failures.push((document.id.clone(), e));
                }
            }
        }
        Ok(report)
    }

    /// Scan, plan, patch, and persist a single document.
    pub async fn reconcile_document(
        &self,
        collection: &str,
        document: &Document,
    ) -> Result<DocumentOutcome, ReconcileError> {
        let urls = self.scanner.find_urls(&document.data);
        let empty_refs = self.scanner.find_empty_refs(&document.data, &document.id);
        info!(
            id = %document.id,
            urls = urls.len(),
            empty_refs = empty_refs.len(),
            "Scanned document"
        );
        if urls.is_empty() && empty_refs.is_empty() {
            return Ok(DocumentOutcome::NoFindings {
                document_id: document.id.clone(),
            });
        }

        let mut plan = Plan::default();
        for finding in &urls {
            match self.plan_url(finding).await {
                Ok(Some((op, change))) => plan.push(op, change),
                Ok(None) => debug!(path = %finding.path, "Token already current"),
                Err(reason) => {
                    warn!(path = %finding.path, %reason, "Skipping URL");
                    plan.skipped.push(Skipped {
                        path: finding.path.clone(),
                        reason,
                    });
                }
            }
        }
        for finding in &empty_refs {
            match self.plan_empty_ref(finding).await {
                Ok((op, change)) => plan.push(op, change),
                Err(reason) => {
                    warn!(path = %finding.path, %reason, "Leaving reference empty");
                    plan.skipped.push(Skipped {
                        path: finding.path.clone(),
                        reason,
                    });
                }
            }
        }

        let mut persisted = false;
        if plan.ops.is_empty() {
            info!(id = %document.id, "No URLs needed updating");
        } else {
            let patched = patch::apply(&document.data, &plan.ops)?;
            if self.dry_run {
                info!(id = %document.id, changes = plan.ops.len(), "Dry run, not writing document");
            } else {
                self.documents.put(collection, &document.id, &patched).await?;
                persisted = true;
                info!(id = %document.id, changes = plan.ops.len(), "Document updated");
            }
        }

        Ok(DocumentOutcome::Reconciled(ReconciliationResult {
            document_id: document.id.clone(),
            changes: plan.changes,
            skipped: plan.skipped,
            persisted,
        }))
    }

    /// `Ok(None)` when the URL already carries the current token.
    async fn plan_url(
        &self,
        finding: &UrlFinding,
    ) -> Result<Option<(MutationOp, Change)>, SkipReason> {
        let parsed = self
            .rewriter
            .parse(&finding.url)
            .map_err(|e| SkipReason::UnparseableUrl(e.to_string()))?;
        debug!(
            path = %finding.path,
            bucket = %parsed.bucket,
            object = %parsed.object_path,
            token = ?parsed.token,
            "Processing storage URL"
        );
        if parsed.needs_correction {
            info!(path = %finding.path, bucket = %parsed.bucket, "Correcting malformed bucket");
        }

        let outcome = self
            .tokens
            .resolve(&parsed.bucket, &parsed.object_path)
            .await
            .map_err(|e| SkipReason::TokenUnavailable(e.to_string()))?;

        match outcome {
            TokenOutcome::PermissionDenied => Ok(Some((
                MutationOp::Delete {
                    path: finding.path.clone(),
                },
                Change {
                    path: finding.path.clone(),
                    kind: ChangeKind::Removed,
                    old_url: Some(finding.url.clone()),
                    new_url: None,
                },
            ))),
            TokenOutcome::Token(token) => {
                if !parsed.needs_correction && parsed.token.as_deref() == Some(token.as_str()) {
                    return Ok(None);
                }
                let new_url = self.rewriter.build(&parsed.bucket, &parsed.object_path, &token);
                let kind = if parsed.needs_correction {
                    ChangeKind::BucketCorrected
                } else {
                    ChangeKind::TokenRefreshed
                };
                Ok(Some((
                    MutationOp::Set {
                        path: finding.path.clone(),
                        value: new_url.clone().into(),
                    },
                    Change {
                        path: finding.path.clone(),
                        kind,
                        old_url: Some(finding.url.clone()),
                        new_url: Some(new_url),
                    },
                )))
            }
        }
    }

    async fn plan_empty_ref(
        &self,
        finding: &EmptyRefFinding,
    ) -> Result<(MutationOp, Change), SkipReason> {
        let bucket = self.rewriter.canonical_bucket();
        let storage_path = media_path(&finding.doc_id, &finding.media_type, &finding.filename);
        debug!(
            path = %finding.path,
            storage_path = %storage_path,
            mime_type = ?finding.mime_type,
            is_uploaded = ?finding.is_uploaded,
            "Generating URL"
        );

        let token = match self.tokens.generate(bucket, &storage_path).await {
            Ok(Some(TokenOutcome::Token(token))) => token,
            Ok(Some(TokenOutcome::PermissionDenied)) => {
                return Err(SkipReason::PermissionDenied { storage_path })
            }
            Ok(None) => return Err(SkipReason::ObjectMissing { storage_path }),
            Err(e) => return Err(SkipReason::GenerationFailed(e.to_string())),
        };

        let new_url = self.rewriter.build(bucket, &storage_path, &token);
        Ok((
            MutationOp::Set {
                path: finding.path.clone(),
                value: new_url.clone().into(),
            },
            Change {
                path: finding.path.clone(),
                kind: ChangeKind::Generated {
                    filename: finding.filename.clone(),
                },
                old_url: None,
                new_url: Some(new_url),
            },
        ))
    }
}
