use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::engine::Ingestor;
use crate::storage::DatabaseError;

/// Totals for one pass over every stored source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub sources: usize,
    pub failed: usize,
    pub new_entries: usize,
}

impl Ingestor {
    /// Ingest every stored source once.
    ///
    /// Per-source failures are logged and counted, not returned; only failing
    /// to list the sources fails the cycle.
    pub async fn run_cycle(&self) -> Result<CycleSummary, DatabaseError> {
        let sources = self.database().list_sources().await?;
        let results = self.ingest_all(&sources).await;

        let summary = CycleSummary {
            sources: results.len(),
            failed: results.iter().filter(|r| r.result.is_err()).count(),
            new_entries: results
                .iter()
                .filter_map(|r| r.result.as_ref().ok())
                .map(|report| report.new_entries)
                .sum(),
        };
        tracing::info!(
            sources = summary.sources,
            failed = summary.failed,
            new_entries = summary.new_entries,
            "Ingestion cycle complete"
        );
        Ok(summary)
    }

    /// Run a cycle every `period` until `shutdown` resolves.
    ///
    /// `shutdown` is polled while a cycle is running too. A cycle cut short
    /// drops its in-flight work; uncommitted batches roll back with their
    /// transactions.
    pub async fn run_until<F>(&self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutting down");
                    return;
                }
                _ = ticker.tick() => {}
            }

            tokio::select! {
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Ingestion cycle failed");
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down, abandoning the running cycle");
                    return;
                }
            }
        }
    }
}
