//! # Reconcile
//!
//! One sync run: list the remote prefix page by page, bring each object
//! into the configured sink, then prune, publish and notify.
//!
//! Every object of a page is handled by its own unit of work; the next page
//! is only requested once all units of the current one have finished.

use super::filter::{FilterVerdict, KeyFilter};
use super::prune::prune_unlisted;
use super::types::{FailureKind, ObjectFailure, SyncError, SyncReport, UnitOutcome};
use crate::config::{SyncConfig, SyncMode, TuningConfig};
use crate::controller::address::{parse_address, Address};
use crate::controller::fetcher::fetch_to_file;
use crate::controller::integrity::file_matches;
use crate::notifier::{run_action, ChangeNotifier, ShellNotifier};
use crate::observability::metrics;
use crate::provider::{ObjectStore, RemoteObject};
use crate::secrets::material::{absorb, SecretMaterial};
use crate::secrets::publisher::{publish, SecretPublisher};
use futures::future::join_all;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Where the objects of a run end up
enum Sink<'a> {
    Files { destination: &'a Path },
    Secrets { material: &'a Mutex<SecretMaterial> },
}

/// State shared by the units of work of one run
struct RunContext<'a> {
    address: &'a Address,
    sink: Sink<'a>,
    action_required: &'a AtomicBool,
    permits: Option<&'a Semaphore>,
}

pub struct Reconciler {
    config: SyncConfig,
    tuning: TuningConfig,
    store: Arc<dyn ObjectStore>,
    publisher: Option<Arc<dyn SecretPublisher>>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("source", &self.config.source)
            .field("mode", &self.config.mode.as_str())
            .field("publisher", &self.publisher.is_some())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler that runs change actions through the shell
    #[must_use]
    pub fn new(config: SyncConfig, tuning: TuningConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config,
            tuning,
            store,
            publisher: None,
            notifier: Arc::new(ShellNotifier),
        }
    }

    /// Secret store used in secret mode
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn SecretPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one sync and record its metrics.
    ///
    /// # Errors
    ///
    /// Returns an error when the address is invalid, the destination cannot
    /// be used, a listing request fails, or publishing fails. Per-object
    /// failures are reported in [`SyncReport::failures`] instead.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let result = self.sync().await;

        let success = matches!(&result, Ok(report) if report.failures.is_empty());
        metrics::record_run(
            self.config.mode.as_str(),
            success,
            started.elapsed().as_secs_f64(),
        );
        result
    }

    async fn sync(&self) -> Result<SyncReport, SyncError> {
        let address = parse_address(&self.config.source)?;

        let span = info_span!(
            "sync.run",
            source = %address,
            mode = self.config.mode.as_str()
        );
        async move {
            let material = Mutex::new(SecretMaterial::new());
            let sink = match &self.config.mode {
                SyncMode::Files { destination, .. } => {
                    tokio::fs::create_dir_all(destination)
                        .await
                        .map_err(|source| SyncError::Destination {
                            path: destination.clone(),
                            source,
                        })?;
                    Sink::Files { destination }
                }
                SyncMode::Secrets { .. } => {
                    if self.publisher.is_none() {
                        return Err(SyncError::PublisherMissing);
                    }
                    Sink::Secrets {
                        material: &material,
                    }
                }
            };

            let action_required = AtomicBool::new(false);
            let semaphore = self.tuning.fetch_concurrency().map(Semaphore::new);
            let context = RunContext {
                address: &address,
                sink,
                action_required: &action_required,
                permits: semaphore.as_ref(),
            };

            let mut report = SyncReport::default();
            let observed = self.sync_pages(&context, &mut report).await?;

            if let SyncMode::Files {
                destination,
                force: true,
            } = &self.config.mode
            {
                let pruned = prune_unlisted(destination, &observed).await;
                if !pruned.deleted.is_empty() {
                    action_required.store(true, Ordering::SeqCst);
                }
                for _ in &pruned.deleted {
                    metrics::increment_objects_deleted();
                }
                for _ in &pruned.failures {
                    metrics::increment_object_errors(FailureKind::Delete.as_str());
                }
                report.deleted = pruned.deleted;
                report.failures.extend(pruned.failures);
            }

            if let Some(publisher) = self.publisher.as_deref() {
                if matches!(self.config.mode, SyncMode::Secrets { .. }) {
                    let material = material
                        .into_inner()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    report.published = Some(publish(publisher, &material).await?);
                }
            }

            report.action_required = action_required.load(Ordering::SeqCst);
            report.notified = self.notify(report.action_required).await;

            info!(
                "Sync finished: {} listed, {} fetched, {} absorbed, {} unchanged, {} deleted, {} failures",
                report.listed,
                report.fetched,
                report.absorbed,
                report.unchanged,
                report.deleted.len(),
                report.failures.len()
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Walk every listing page, returning the base names of all kept objects
    async fn sync_pages(
        &self,
        context: &RunContext<'_>,
        report: &mut SyncReport,
    ) -> Result<HashSet<String>, SyncError> {
        let filter = KeyFilter::new(
            self.config.include_pattern.as_deref(),
            self.config.exclude_pattern.as_deref(),
        );
        let mut observed = HashSet::new();
        let mut continuation = None;

        loop {
            let page_number = report.pages + 1;
            debug!("Listing page {} of {}", page_number, context.address);
            let page = self
                .store
                .list_page(
                    &context.address.bucket,
                    &context.address.prefix,
                    continuation.take(),
                )
                .await
                .map_err(|source| SyncError::Listing {
                    page: page_number,
                    source,
                })?;
            report.pages = page_number;

            let mut units = Vec::with_capacity(page.objects.len());
            for object in &page.objects {
                if object.key.ends_with('/') || object.base_name().is_empty() {
                    debug!("Skipping directory marker {}", object.key);
                    continue;
                }
                match filter.verdict(&object.key) {
                    FilterVerdict::Keep => {}
                    verdict @ (FilterVerdict::NotIncluded | FilterVerdict::Excluded) => {
                        debug!("Skipping {} ({:?})", object.key, verdict);
                        report.filtered_out += 1;
                        continue;
                    }
                }

                report.listed += 1;
                metrics::increment_objects_listed();
                observed.insert(object.base_name().to_string());
                units.push(self.process_object(context, object));
            }

            for result in join_all(units).await {
                match result {
                    Ok(outcome) => report.record(outcome),
                    Err(failure) => {
                        metrics::increment_object_errors(failure.kind.as_str());
                        report.failures.push(failure);
                    }
                }
            }

            match page.next_continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(observed)
    }

    /// One unit of work: decide what the object needs and do it
    async fn process_object(
        &self,
        context: &RunContext<'_>,
        object: &RemoteObject,
    ) -> Result<UnitOutcome, ObjectFailure> {
        let _permit = match context.permits {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };
        let bucket = context.address.bucket.as_str();
        let timeout = self.tuning.fetch_timeout();
        let filename = object.base_name();

        match &context.sink {
            Sink::Files { destination } => {
                let path = destination.join(filename);
                match file_matches(&path, &object.e_tag).await {
                    Ok(true) => {
                        debug!("File {} is up to date", filename);
                        return Ok(UnitOutcome::Unchanged);
                    }
                    Ok(false) => info!("File {} has changed", filename),
                    Err(e) if e.is_not_found() => info!("File {} does not exist", filename),
                    Err(e) => warn!("Could not verify {}: {}, fetching again", filename, e),
                }

                context.action_required.store(true, Ordering::SeqCst);
                match fetch_to_file(self.store.as_ref(), bucket, object, &path, timeout).await {
                    Ok(()) => {
                        metrics::increment_objects_fetched();
                        Ok(UnitOutcome::Fetched)
                    }
                    Err(e) => {
                        error!("Could not fetch {}: {}", object.key, e);
                        Err(ObjectFailure {
                            key: object.key.clone(),
                            kind: FailureKind::Fetch,
                            message: e.to_string(),
                        })
                    }
                }
            }
            Sink::Secrets { material } => {
                match absorb(self.store.as_ref(), bucket, object, filename, material, timeout).await
                {
                    Ok(true) => {
                        metrics::increment_objects_fetched();
                        Ok(UnitOutcome::Absorbed)
                    }
                    Ok(false) => Ok(UnitOutcome::Ignored),
                    Err(e) => {
                        error!("Could not fetch {}: {}", object.key, e);
                        Err(ObjectFailure {
                            key: object.key.clone(),
                            kind: FailureKind::Absorb,
                            message: e.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Run the change action once when something changed
    async fn notify(&self, action_required: bool) -> Option<bool> {
        if !action_required {
            debug!("Nothing changed, no action required");
            return None;
        }
        match self.config.on_change.as_deref() {
            Some(action) if !action.trim().is_empty() => {
                info!("Executing {:?}", action);
                Some(run_action(self.notifier.as_ref(), action).await)
            }
            _ => {
                debug!("Files changed but no change action is configured");
                None
            }
        }
    }
}
