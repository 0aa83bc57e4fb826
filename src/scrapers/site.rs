//! Turning one target record into `(title, link)` pairs.

use crate::errors::{ExtractionError, FetchError};
use crate::models::{ExtractedPair, TargetRecord};
use crate::scrapers::fetch::PageFetcher;
use crate::scrapers::rules::{Page, RuleEngine, StructuralRuleEngine};
use tracing::{info, instrument, warn};
use url::Url;

/// Extracts pairs for a single site.
///
/// The title and link cycles each fetch the page, learn a rule from their
/// sample and apply it to that same page. A failure in either cycle fails
/// the site; there is no retry here.
#[derive(Debug, Clone)]
pub struct SiteExtractor<F, E = StructuralRuleEngine> {
    fetcher: F,
    engine: E,
    strict_pairing: bool,
}

impl<F> SiteExtractor<F, StructuralRuleEngine>
where
    F: PageFetcher,
{
    pub fn new(fetcher: F) -> Self {
        Self::with_engine(fetcher, StructuralRuleEngine)
    }
}

impl<F, E> SiteExtractor<F, E>
where
    F: PageFetcher,
    E: RuleEngine,
{
    pub fn with_engine(fetcher: F, engine: E) -> Self {
        Self {
            fetcher,
            engine,
            strict_pairing: false,
        }
    }

    /// Fail on title/link count mismatch instead of truncating.
    pub fn strict_pairing(mut self, strict: bool) -> Self {
        self.strict_pairing = strict;
        self
    }

    #[instrument(level = "info", skip_all, fields(site = %record.site_url))]
    pub async fn extract(&self, record: &TargetRecord) -> Result<Vec<ExtractedPair>, ExtractionError> {
        let url = Url::parse(&record.site_url).map_err(|source| FetchError::InvalidUrl {
            url: record.site_url.clone(),
            source,
        })?;

        let titles = self.extract_values(&url, &record.title_sample).await?;
        let links = self.extract_values(&url, &record.link_sample).await?;

        if titles.len() != links.len() {
            warn!(
                titles = titles.len(),
                links = links.len(),
                strict = self.strict_pairing,
                "Title and link counts differ"
            );
        }
        let pairs = pair_by_position(titles, links, self.strict_pairing)?;
        info!(pairs = pairs.len(), "Extracted site");
        Ok(pairs)
    }

    /// One fetch, learn, apply cycle.
    async fn extract_values(&self, url: &Url, sample: &str) -> Result<Vec<String>, ExtractionError> {
        let html = self.fetcher.fetch(url).await?;
        let page = Page::parse(url.clone(), &html);
        let rule = self.engine.learn(&page, sample)?;
        Ok(self.engine.apply(&rule, &page))
    }
}

/// Zip titles and links by index.
///
/// Lenient mode stops at the shorter list and drops the excess. Strict mode
/// rejects lists of different lengths.
pub fn pair_by_position(
    titles: Vec<String>,
    links: Vec<String>,
    strict: bool,
) -> Result<Vec<ExtractedPair>, ExtractionError> {
    if strict && titles.len() != links.len() {
        return Err(ExtractionError::LengthMismatch {
            titles: titles.len(),
            links: links.len(),
        });
    }
    Ok(titles
        .into_iter()
        .zip(links)
        .map(|(title, weblink)| ExtractedPair::new(title, weblink))
        .collect())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned pages by URL and counts requests.
    #[derive(Debug, Clone, Default)]
    pub struct FakeFetcher {
        pages: HashMap<String, String>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FakeFetcher {
        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    url: url.to_string(),
                    status: reqwest::StatusCode::NOT_FOUND,
                })
        }
    }

    /// A listing page with one `<li>` per `(title, href)`.
    pub fn listing(items: &[(&str, &str)]) -> String {
        let rows: String = items
            .iter()
            .map(|(title, href)| {
                format!(r#"<li class="item"><a class="headline" href="{href}">{title}</a></li>"#)
            })
            .collect();
        format!(r#"<html><body><ul class="news">{rows}</ul></body></html>"#)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeFetcher, listing};
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pairing_truncates_to_shorter_list() {
        let pairs = pair_by_position(strings(&["t1", "t2", "t3"]), strings(&["l1"]), false).unwrap();
        assert_eq!(pairs, vec![ExtractedPair::new("t1", "l1")]);
    }

    #[test]
    fn test_pairing_keeps_extraction_order() {
        let pairs = pair_by_position(strings(&["t1", "t2"]), strings(&["l1", "l2", "l3"]), false).unwrap();
        assert_eq!(
            pairs,
            vec![ExtractedPair::new("t1", "l1"), ExtractedPair::new("t2", "l2")]
        );
    }

    #[test]
    fn test_strict_pairing_rejects_mismatch() {
        let err = pair_by_position(strings(&["t1", "t2"]), strings(&["l1"]), true).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::LengthMismatch { titles: 2, links: 1 }
        ));
    }

    #[test]
    fn test_strict_pairing_accepts_equal_lengths() {
        let pairs = pair_by_position(strings(&["t1"]), strings(&["l1"]), true).unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_pairs_titles_with_links() {
        let url = "https://news.example.com/";
        let fetcher = FakeFetcher::default().with_page(
            url,
            &listing(&[("Alpha", "/a"), ("Beta", "/b"), ("Gamma", "/c")]),
        );
        let extractor = SiteExtractor::new(fetcher.clone());
        let record = TargetRecord::new(url, "Beta", "/b");

        let pairs = extractor.extract(&record).await.unwrap();
        assert_eq!(
            pairs,
            vec![
                ExtractedPair::new("Alpha", "https://news.example.com/a"),
                ExtractedPair::new("Beta", "https://news.example.com/b"),
                ExtractedPair::new("Gamma", "https://news.example.com/c"),
            ]
        );
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_extract_fails_when_sample_missing() {
        let url = "https://news.example.com/";
        let fetcher = FakeFetcher::default().with_page(url, &listing(&[("Alpha", "/a")]));
        let record = TargetRecord::new(url, "Gone from the page", "/a");

        let err = SiteExtractor::new(fetcher).extract(&record).await.unwrap_err();
        assert!(matches!(err, ExtractionError::SampleNotFound { .. }));
    }

    #[tokio::test]
    async fn test_extract_surfaces_fetch_failure() {
        let record = TargetRecord::new("https://down.example.com/", "Alpha", "/a");
        let err = SiteExtractor::new(FakeFetcher::default())
            .extract(&record)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Fetch(FetchError::Status { .. })));
    }

    #[tokio::test]
    async fn test_extract_rejects_invalid_url_without_fetching() {
        let fetcher = FakeFetcher::default();
        let record = TargetRecord::new("not a url", "Alpha", "/a");
        let err = SiteExtractor::new(fetcher.clone()).extract(&record).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Fetch(FetchError::InvalidUrl { .. })));
        assert_eq!(fetcher.calls(), 0);
    }
}
