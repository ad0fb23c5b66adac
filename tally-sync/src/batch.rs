//! Concurrent extraction over many documents.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::extract::{AmountExtractor, DocumentLocation, ExtractionResult};

/// Extract every location with at most `max_concurrency` in flight.
///
/// Results are index-aligned with the input regardless of completion
/// order, and every slot is populated: one document's failure never
/// disturbs the others.
pub async fn batch_extract<E: AmountExtractor>(
    extractor: &E,
    locations: &[DocumentLocation],
    max_concurrency: usize,
) -> Vec<ExtractionResult> {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));

    let futures = locations.iter().enumerate().map(|(index, location)| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return ExtractionResult::failure("extraction pool closed"),
            };
            let result = extractor.extract(location).await;
            debug!(index, success = result.success, amount = result.amount, "extracted");
            result
        }
    });

    join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Finishes later items first to prove output stays input-ordered.
    struct ReversedDelays;

    #[async_trait]
    impl AmountExtractor for ReversedDelays {
        async fn extract(&self, location: &DocumentLocation) -> ExtractionResult {
            let DocumentLocation::Url(url) = location else {
                return ExtractionResult::failure("unexpected location");
            };
            let index: u64 = url.trim_start_matches("https://pdf/").parse().unwrap();
            tokio::time::sleep(Duration::from_millis(40 - 10 * index)).await;
            ExtractionResult {
                raw_text: String::new(),
                amount: index as f64,
                success: true,
                error: None,
            }
        }
    }

    fn urls(n: u64) -> Vec<DocumentLocation> {
        (0..n)
            .map(|i| DocumentLocation::Url(format!("https://pdf/{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_results_are_index_aligned() {
        let results = batch_extract(&ReversedDelays, &urls(4), 4).await;
        let amounts: Vec<f64> = results.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![0.0, 1.0, 2.0, 3.0]);
    }

    struct FailSecond;

    #[async_trait]
    impl AmountExtractor for FailSecond {
        async fn extract(&self, location: &DocumentLocation) -> ExtractionResult {
            if location.file_name() == "1" {
                ExtractionResult::failure("boom")
            } else {
                ExtractionResult {
                    raw_text: String::new(),
                    amount: 10.0,
                    success: true,
                    error: None,
                }
            }
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_lose_other_slots() {
        let results = batch_extract(&FailSecond, &urls(3), 2).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_deref(), Some("boom"));
        assert!(results[2].success);
    }

    struct ConcurrencyProbe {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl AmountExtractor for ConcurrencyProbe {
        async fn extract(&self, _location: &DocumentLocation) -> ExtractionResult {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            ExtractionResult::default()
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let probe = ConcurrencyProbe {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        batch_extract(&probe, &urls(12), 3).await;
        assert!(probe.peak.load(Ordering::SeqCst) <= 3);
    }
}
