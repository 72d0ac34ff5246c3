//! Parallel mapping applier
//!
//! Every class of every class bundle of a resource becomes one task on the
//! applier's own worker pool. Workers only compute: each sends its outcome
//! back over a channel, and the calling thread collects outcomes into a
//! [`MappingResults`]. The call returns once every task has finished.

use super::remap::{ClassRemapper, StructuralRemapper};
use super::results::{MappingResults, RewriteFailure};
use super::Mappings;
use crate::class::ClassInfo;
use crate::config::BytegraphConfig;
use crate::resource::{BundleKey, Resource};
use crate::ui::progress_message::{ProgressMessage, ProgressPhase};
use crate::{Error, Result};
use crossbeam::channel::{self, Sender};
use serde::Serialize;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Summary of a committed mapping pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// Pre-mapping names of renamed classes
    pub renamed: BTreeSet<String>,
    /// Classes left untouched because their rewrite failed
    pub failures: Vec<RewriteFailure>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Outcome {
    Changed {
        bundle: BundleKey,
        pre: Arc<ClassInfo>,
        post: ClassInfo,
    },
    Unchanged,
    Failed(RewriteFailure),
}

/// Applies mappings to resources on a bounded worker pool.
pub struct MappingApplier {
    pool: rayon::ThreadPool,
    remapper: Arc<dyn ClassRemapper>,
    progress: Option<Sender<ProgressMessage>>,
}

impl std::fmt::Debug for MappingApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingApplier")
            .field("workers", &self.workers())
            .finish()
    }
}

impl MappingApplier {
    /// Create an applier with its own pool of `workers` threads (at least one)
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("bytegraph-remap-{}", i))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        Ok(Self {
            pool,
            remapper: Arc::new(StructuralRemapper),
            progress: None,
        })
    }

    pub fn from_config(config: &BytegraphConfig) -> Result<Self> {
        Self::new(config.worker_count())
    }

    pub fn with_remapper(mut self, remapper: impl ClassRemapper + 'static) -> Self {
        self.remapper = Arc::new(remapper);
        self
    }

    pub fn with_progress(mut self, progress: Sender<ProgressMessage>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Rewrite every class of `resource` without committing anything.
    ///
    /// Classes whose rewrite fails are recorded as failures and otherwise
    /// left out. A batch that would lose a class on commit is rejected
    /// with [`Error::MappingConflict`].
    pub fn compute(&self, mappings: &dyn Mappings, resource: &Arc<Resource>) -> Result<MappingResults> {
        let tasks: Vec<(BundleKey, Arc<ClassInfo>)> = resource
            .class_bundles()
            .flat_map(|(key, bundle)| bundle.values().into_iter().map(move |class| (key, class)))
            .collect();
        let total = tasks.len();
        tracing::debug!(
            "Remapping {} classes of {} on {} workers",
            total,
            resource.name(),
            self.workers()
        );
        self.report(ProgressMessage::Started {
            phase: ProgressPhase::Remapping,
            total,
        });

        let mut results = MappingResults::new(resource.clone());
        let (tx, rx) = channel::unbounded::<Outcome>();

        self.pool.in_place_scope(|scope| {
            for (bundle, class) in tasks {
                let tx = tx.clone();
                let remapper = self.remapper.clone();
                let resource_name = resource.name();
                scope.spawn(move |_| {
                    let outcome = remap_one(remapper.as_ref(), mappings, resource_name, bundle, class);
                    // The receiver outlives the scope
                    tx.send(outcome).ok();
                });
            }
            drop(tx);

            for (current, outcome) in rx.iter().enumerate() {
                let class = match outcome {
                    Outcome::Changed { bundle, pre, post } => {
                        let name = pre.name().to_string();
                        results.add_mapped(bundle, pre, post);
                        Some(name)
                    }
                    Outcome::Unchanged => None,
                    Outcome::Failed(failure) => {
                        tracing::warn!("Rewrite failed: {}", failure);
                        self.report(ProgressMessage::ClassFailed(failure.class.clone()));
                        results.add_failure(failure);
                        None
                    }
                };
                self.report(ProgressMessage::Progress {
                    phase: ProgressPhase::Remapping,
                    current: current + 1,
                    class,
                });
            }
        });

        self.report(ProgressMessage::Finished {
            phase: ProgressPhase::Remapping,
        });
        results.check_conflicts()?;
        Ok(results)
    }

    /// Commit computed results, reporting the commit phase to the progress channel
    pub fn commit(&self, results: &MappingResults) -> Result<BTreeSet<String>> {
        self.report(ProgressMessage::Started {
            phase: ProgressPhase::Committing,
            total: results.len(),
        });
        let renamed = results.apply()?;
        self.report(ProgressMessage::Finished {
            phase: ProgressPhase::Committing,
        });
        Ok(renamed)
    }

    /// Compute then commit
    pub fn apply(&self, mappings: &dyn Mappings, resource: &Arc<Resource>) -> Result<ApplyReport> {
        let results = self.compute(mappings, resource)?;
        let renamed = self.commit(&results)?;

        Ok(ApplyReport {
            renamed,
            failures: results.failures().to_vec(),
        })
    }

    fn report(&self, message: ProgressMessage) {
        if let Some(progress) = &self.progress {
            progress.send(message).ok();
        }
    }
}

fn remap_one(
    remapper: &dyn ClassRemapper,
    mappings: &dyn Mappings,
    resource: &str,
    bundle: BundleKey,
    class: Arc<ClassInfo>,
) -> Outcome {
    let failure = |message: String| {
        Outcome::Failed(RewriteFailure {
            resource: resource.to_string(),
            bundle,
            class: class.name().to_string(),
            message,
        })
    };

    match panic::catch_unwind(AssertUnwindSafe(|| remapper.remap(&class, mappings))) {
        Ok(Ok(post)) if post == *class => Outcome::Unchanged,
        Ok(Ok(post)) => Outcome::Changed {
            bundle,
            pre: class.clone(),
            post,
        },
        Ok(Err(e)) => failure(e.to_string()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "remapper panicked".to_string());
            failure(format!("panic: {}", message))
        }
    }
}
