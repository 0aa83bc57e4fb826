//! Learning extraction rules from a single sample value.
//!
//! A rule is the structural address of the element that held the sample:
//! the chain of `(tag, classes)` steps from the document root down to it,
//! plus where the value was read from (the element text or a link
//! attribute). Applying a rule returns the value of every element with the
//! same address, in document order.
//!
//! ```text
//! html > body > ul.news > li.item > a.headline   (text)
//! html > body > ul.news > li.item > a.headline   (@href)
//! ```
//!
//! Because lists of headlines repeat the same markup for every item, one
//! sample is enough to recover the whole list.

use crate::errors::ExtractionError;
use crate::utils::normalize_whitespace;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

static ANY_ELEMENT: Lazy<Selector> = Lazy::new(|| Selector::parse("*").unwrap());

/// Attributes that can hold a link sample, in lookup order.
const LINK_ATTRS: [&str; 2] = ["href", "src"];

/// A parsed page together with the URL it was fetched from.
///
/// Relative links are resolved against `url`.
pub struct Page {
    url: Url,
    document: Html,
}

impl Page {
    pub fn parse(url: Url, html: &str) -> Self {
        Self {
            url,
            document: Html::parse_document(html),
        }
    }

    fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.document.select(&ANY_ELEMENT)
    }
}

/// Where a rule reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ValueSource {
    Text,
    Attribute(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PathStep {
    tag: String,
    classes: Vec<String>,
}

impl PathStep {
    fn of(element: ElementRef<'_>) -> Self {
        let value = element.value();
        Self {
            tag: value.name().to_string(),
            classes: value.classes().map(str::to_string).sorted().collect(),
        }
    }
}

/// A learned rule. Only meaningful for pages of the site it was learned on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRule {
    path: Vec<PathStep>,
    source: ValueSource,
}

impl ExtractionRule {
    fn from_element(element: ElementRef<'_>, source: ValueSource) -> Self {
        Self {
            path: path_of(element),
            source,
        }
    }

    fn value_of(&self, element: ElementRef<'_>, base: &Url) -> Option<String> {
        let value = match self.source {
            ValueSource::Text => text_of(element),
            ValueSource::Attribute(name) => {
                let raw = element.value().attr(name)?.trim();
                if raw.is_empty() {
                    return None;
                }
                base.join(raw)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| raw.to_string())
            }
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Learns rules from samples and applies them to pages.
pub trait RuleEngine {
    fn learn(&self, page: &Page, sample: &str) -> Result<ExtractionRule, ExtractionError>;
    fn apply(&self, rule: &ExtractionRule, page: &Page) -> Vec<String>;
}

/// Rule engine matching elements by their root-to-element tag/class path.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralRuleEngine;

impl RuleEngine for StructuralRuleEngine {
    #[instrument(level = "debug", skip(self, page), fields(url = %page.url))]
    fn learn(&self, page: &Page, sample: &str) -> Result<ExtractionRule, ExtractionError> {
        let wanted = normalize_whitespace(sample);
        if wanted.is_empty() {
            return Err(ExtractionError::EmptySample);
        }

        if let Some(element) = find_by_text(page, &wanted) {
            let rule = ExtractionRule::from_element(element, ValueSource::Text);
            debug!(depth = rule.path.len(), "Learned text rule");
            return Ok(rule);
        }

        let wanted_url = page.url.join(&wanted).ok();
        for element in page.elements() {
            for name in LINK_ATTRS {
                let Some(raw) = element.value().attr(name) else {
                    continue;
                };
                let raw = raw.trim();
                let resolved_matches =
                    wanted_url.is_some() && page.url.join(raw).ok() == wanted_url;
                if raw == wanted || resolved_matches {
                    let rule = ExtractionRule::from_element(element, ValueSource::Attribute(name));
                    debug!(depth = rule.path.len(), attr = name, "Learned attribute rule");
                    return Ok(rule);
                }
            }
        }

        Err(ExtractionError::SampleNotFound { sample: wanted })
    }

    fn apply(&self, rule: &ExtractionRule, page: &Page) -> Vec<String> {
        page.elements()
            .filter(|element| path_of(*element) == rule.path)
            .filter_map(|element| rule.value_of(element, &page.url))
            .collect()
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn child_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap)
}

/// First element whose text equals `wanted`, narrowed to the innermost
/// descendant that still carries the whole text.
fn find_by_text<'a>(page: &'a Page, wanted: &str) -> Option<ElementRef<'a>> {
    let mut found = page.elements().find(|element| text_of(*element) == wanted)?;
    while let Some(child) = child_elements(found).find(|child| text_of(*child) == wanted) {
        found = child;
    }
    Some(found)
}

fn path_of(element: ElementRef<'_>) -> Vec<PathStep> {
    let mut steps: Vec<PathStep> = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .map(PathStep::of)
        .collect();
    steps.reverse();
    steps.push(PathStep::of(element));
    steps
}
