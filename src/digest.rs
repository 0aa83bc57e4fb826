//! Aggregating every target into one [`DigestResult`].
//!
//! A failing site contributes zero pairs and bumps `sites_failed`; it never
//! aborts the run. With `concurrency > 1` sites are extracted in parallel
//! through `buffered`, which still yields results in target order.

use crate::models::{DigestResult, TargetRecord};
use crate::scrapers::fetch::PageFetcher;
use crate::scrapers::rules::RuleEngine;
use crate::scrapers::site::SiteExtractor;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{info, instrument, warn};

#[instrument(level = "info", skip_all, fields(targets = records.len(), concurrency = concurrency))]
pub async fn aggregate<F, E>(
    extractor: &SiteExtractor<F, E>,
    records: &[TargetRecord],
    concurrency: usize,
) -> DigestResult
where
    F: PageFetcher + Sync,
    E: RuleEngine + Sync,
{
    let t0 = Instant::now();
    let results: Vec<_> = stream::iter(records)
        .map(|record| async move { (record, extractor.extract(record).await) })
        .boxed()
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut digest = DigestResult {
        sites_attempted: records.len(),
        ..DigestResult::default()
    };
    for (record, result) in results {
        match result {
            Ok(pairs) => digest.pairs.extend(pairs),
            Err(e) => {
                warn!(site = %record.site_url, error = %e, "Site extraction failed; skipping");
                digest.sites_failed += 1;
            }
        }
    }

    info!(
        attempted = digest.sites_attempted,
        succeeded = digest.sites_succeeded(),
        failed = digest.sites_failed,
        pairs = digest.pairs.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Aggregated digest"
    );
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedPair;
    use crate::scrapers::site::testing::{FakeFetcher, listing};

    const A: &str = "https://a.example.com/";
    const B: &str = "https://b.example.com/";
    const C: &str = "https://c.example.com/";

    fn fetcher() -> FakeFetcher {
        FakeFetcher::default()
            .with_page(A, &listing(&[("A1", "/1"), ("A2", "/2")]))
            .with_page(B, &listing(&[("B1", "/1")]))
            .with_page(C, &listing(&[("C1", "/1"), ("C2", "/2"), ("C3", "/3")]))
    }

    fn titles(result: &DigestResult) -> Vec<&str> {
        result.pairs.iter().map(|p| p.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_pairs_follow_target_then_extraction_order() {
        let extractor = SiteExtractor::new(fetcher());
        let records = vec![TargetRecord::new(A, "A2", "/2"), TargetRecord::new(B, "B1", "/1")];

        let result = aggregate(&extractor, &records, 1).await;
        assert_eq!(titles(&result), ["A1", "A2", "B1"]);
        assert_eq!(result.pairs[2], ExtractedPair::new("B1", "https://b.example.com/1"));
        assert_eq!(result.sites_attempted, 2);
        assert_eq!(result.sites_failed, 0);
    }

    #[tokio::test]
    async fn test_failing_site_is_isolated() {
        let extractor = SiteExtractor::new(fetcher());
        let records = vec![
            TargetRecord::new(A, "A1", "/1"),
            TargetRecord::new(B, "not on the page", "/1"),
            TargetRecord::new(C, "C1", "/1"),
        ];

        let result = aggregate(&extractor, &records, 1).await;
        assert_eq!(titles(&result), ["A1", "A2", "C1", "C2", "C3"]);
        assert_eq!(result.sites_failed, 1);
        assert_eq!(result.sites_succeeded(), 2);
    }

    #[tokio::test]
    async fn test_all_sites_failing_still_returns_result() {
        let extractor = SiteExtractor::new(FakeFetcher::default());
        let records = vec![TargetRecord::new(A, "A1", "/1"), TargetRecord::new(B, "B1", "/1")];

        let result = aggregate(&extractor, &records, 1).await;
        assert!(result.pairs.is_empty());
        assert_eq!(result.sites_failed, result.sites_attempted);
    }

    #[tokio::test]
    async fn test_empty_target_list() {
        let extractor = SiteExtractor::new(fetcher());
        let result = aggregate(&extractor, &[], 1).await;
        assert_eq!(result, DigestResult::default());
    }

    #[tokio::test]
    async fn test_concurrent_extraction_preserves_order() {
        let extractor = SiteExtractor::new(fetcher());
        let records = vec![
            TargetRecord::new(C, "C1", "/1"),
            TargetRecord::new(A, "A1", "/1"),
            TargetRecord::new(B, "B1", "/1"),
        ];

        let result = aggregate(&extractor, &records, 3).await;
        assert_eq!(titles(&result), ["C1", "C2", "C3", "A1", "A2", "B1"]);
    }

    #[tokio::test]
    async fn test_duplicate_targets_are_not_deduplicated() {
        let extractor = SiteExtractor::new(fetcher());
        let records = vec![TargetRecord::new(B, "B1", "/1"), TargetRecord::new(B, "B1", "/1")];

        let result = aggregate(&extractor, &records, 1).await;
        assert_eq!(titles(&result), ["B1", "B1"]);
    }

    #[tokio::test]
    async fn test_pair_count_is_sum_of_shorter_lists() {
        let fetcher = fetcher().with_page(
            "https://d.example.com/",
            r#"<html><body>
                <h2 class="t">D1</h2><h2 class="t">D2</h2><h2 class="t">D3</h2>
                <a class="l" href="/only">more</a>
            </body></html>"#,
        );
        let extractor = SiteExtractor::new(fetcher);
        let records = vec![
            TargetRecord::new("https://d.example.com/", "D1", "/only"),
            TargetRecord::new(A, "A1", "/1"),
        ];

        let result = aggregate(&extractor, &records, 1).await;
        // min(3, 1) + min(2, 2)
        assert_eq!(result.pairs.len(), 3);
        assert_eq!(result.pairs[0], ExtractedPair::new("D1", "https://d.example.com/only"));
    }

    #[tokio::test]
    async fn test_strict_pairing_mismatch_fails_only_that_site() {
        let fetcher = fetcher().with_page(
            "https://d.example.com/",
            r#"<html><body>
                <h2 class="t">D1</h2><h2 class="t">D2</h2>
                <a class="l" href="/only">more</a>
            </body></html>"#,
        );
        let extractor = SiteExtractor::new(fetcher).strict_pairing(true);
        let records = vec![
            TargetRecord::new(A, "A1", "/1"),
            TargetRecord::new("https://d.example.com/", "D1", "/only"),
            TargetRecord::new(B, "B1", "/1"),
        ];

        let result = aggregate(&extractor, &records, 2).await;
        assert_eq!(titles(&result), ["A1", "A2", "B1"]);
        assert_eq!(result.sites_attempted, 3);
        assert_eq!(result.sites_failed, 1);
    }
}
