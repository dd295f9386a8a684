use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::catalog::{Product, RemoteId};
use crate::database_ops::CatalogWriter;
use crate::shopify::{CatalogSource, FetchError};

/// Where a run currently is. Runs always start at `Fetching` and never go back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncPhase {
    Fetching,
    Writing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductFailure {
    pub product_id: RemoteId,
    pub title: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub succeeded: usize,
    pub failures: Vec<ProductFailure>,
    pub products_inserted: usize,
    pub products_skipped: usize,
    pub variants_inserted: usize,
    pub variants_skipped: usize,
    pub elapsed: Duration,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched {} products: {} written, {} failed (products +{} ={}, variants +{} ={}) in {:.2}s",
            self.fetched,
            self.succeeded,
            self.failed(),
            self.products_inserted,
            self.products_skipped,
            self.variants_inserted,
            self.variants_skipped,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Drives one fetch-then-write pass: fetch the full catalog once, then convert and
/// write it product by product. A fetch failure ends the run; a record that cannot
/// be converted or written only skips the product it belongs to.
pub struct SyncOrchestrator<S, W> {
    source: S,
    writer: W,
    phase: SyncPhase,
}

impl<S, W> SyncOrchestrator<S, W>
where
    S: CatalogSource,
    W: CatalogWriter,
{
    pub fn new(source: S, writer: W) -> Self {
        Self {
            source,
            writer,
            phase: SyncPhase::Fetching,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn enter(&mut self, phase: SyncPhase) {
        info!(from = ?self.phase, to = ?phase, "sync phase");
        self.phase = phase;
    }

    pub async fn run(&mut self) -> Result<SyncReport, FetchError> {
        let started = Instant::now();
        if self.phase != SyncPhase::Fetching {
            self.enter(SyncPhase::Fetching);
        }

        let payloads = match self.source.fetch_catalog().await {
            Ok(payloads) => payloads,
            Err(err) => {
                error!(error = %err, "catalog fetch failed; nothing written");
                self.enter(SyncPhase::Done);
                return Err(err);
            }
        };

        self.enter(SyncPhase::Writing);
        let mut report = SyncReport {
            fetched: payloads.len(),
            ..SyncReport::default()
        };

        for payload in payloads {
            let label = payload.label();
            let product = match Product::try_from(payload) {
                Ok(product) => product,
                Err(err) => {
                    warn!(
                        product_id = err.product_id(),
                        title = %label,
                        error = %err,
                        "product record rejected; continuing"
                    );
                    report.failures.push(ProductFailure {
                        product_id: err.product_id(),
                        title: label,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            match self.writer.write_product(&product).await {
                Ok(outcome) => {
                    report.succeeded += 1;
                    if outcome.product_inserted {
                        report.products_inserted += 1;
                    } else {
                        report.products_skipped += 1;
                    }
                    report.variants_inserted += outcome.variants_inserted;
                    report.variants_skipped += outcome.variants_skipped;
                }
                Err(err) => {
                    warn!(
                        product_id = product.remote_id,
                        title = %label,
                        error = %err,
                        "product write failed; continuing"
                    );
                    report.failures.push(ProductFailure {
                        product_id: product.remote_id,
                        title: label,
                        error: err.to_string(),
                    });
                }
            }
        }

        report.elapsed = started.elapsed();
        self.enter(SyncPhase::Done);
        info!(
            fetched = report.fetched,
            succeeded = report.succeeded,
            failed = report.failed(),
            "sync finished"
        );
        Ok(report)
    }
}
