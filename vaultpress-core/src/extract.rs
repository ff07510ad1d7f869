//! Turn tagged documents into publishable items.

use crate::frontmatter::{strip_frontmatter, Metadata};
use crate::models::{DocumentId, PublishItem};
use crate::slug::{is_valid_slug, slug_or_empty, slugify_with, PinyinTransliterator, Transliterator};
use crate::store::{has_tag, DocumentStore, StoreError};
use crate::text::{create_snippet, markdown_to_text};
use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use vaultpress_types::Diagnostic;

/// Metadata key holding a compact `YYMM` month
pub const MONTH_KEY: &str = "month";
/// Metadata key holding a `YYYY-MM` / `YYYY-MM-DD` date
pub const DATE_KEY: &str = "date";
/// Metadata key holding the stored identifier
pub const SLUG_KEY: &str = "slug";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateError {
    #[error("'{0}' is not a recognized month or date (expected YYMM, YYYY-MM or YYYY-MM-DD)")]
    Shape(String),

    #[error("'{0}' has an out-of-range month or day")]
    Range(String),
}

/// Normalize a month-or-date value to `YYYY-MM` or `YYYY-MM-DD`
///
/// Accepted shapes: `YYMM` (century 2000), `YYYYMM`, `YYYY-MM`, `YYYY-M`,
/// `YYYY-MM-DD`. A three-digit value is a `YYMM` that lost its leading zero
/// to numeric YAML parsing.
///
/// ```
/// use vaultpress_core::extract::normalize_date;
///
/// assert_eq!(normalize_date("2401").unwrap(), "2024-01");
/// assert_eq!(normalize_date("2024-01-15").unwrap(), "2024-01-15");
/// assert!(normalize_date("January").is_err());
/// ```
pub fn normalize_date(raw: &str) -> Result<String, DateError> {
    let value = raw.trim();
    let shape_err = || DateError::Shape(value.to_string());
    let all_digits = !value.is_empty() && value.chars().all(|c| c.is_ascii_digit());

    if all_digits {
        let (year, month) = match value.len() {
            3 | 4 => {
                let padded = format!("{:0>4}", value);
                (2000 + parse_num(&padded[..2])?, parse_num(&padded[2..])?)
            }
            6 => (parse_num(&value[..4])?, parse_num(&value[4..])?),
            _ => return Err(shape_err()),
        };
        return year_month(value, year, month);
    }

    let parts: Vec<&str> = value.split('-').collect();
    match parts.as_slice() {
        [year, month] if year.len() == 4 && (1..=2).contains(&month.len()) => {
            year_month(value, parse_num(year)?, parse_num(month)?)
        }
        [year, month, day] if year.len() == 4 && month.len() == 2 && day.len() == 2 => {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.format("%Y-%m-%d").to_string())
                .map_err(|_| DateError::Range(value.to_string()))
        }
        _ => Err(shape_err()),
    }
}

fn parse_num(digits: &str) -> Result<u32, DateError> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DateError::Shape(digits.to_string()));
    }
    digits
        .parse()
        .map_err(|_| DateError::Shape(digits.to_string()))
}

fn year_month(raw: &str, year: u32, month: u32) -> Result<String, DateError> {
    if (1..=12).contains(&month) {
        Ok(format!("{:04}-{:02}", year, month))
    } else {
        Err(DateError::Range(raw.to_string()))
    }
}

/// Settings for one extraction pass
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Tag a document must carry to be published
    pub tag: String,
    /// Date used to impute the current period for undated documents
    pub today: NaiveDate,
    /// Maximum excerpt length in characters
    pub excerpt_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            tag: "blog".to_string(),
            today: chrono::Local::now().date_naive(),
            excerpt_chars: 200,
        }
    }
}

/// A metadata patch that must be written back to a source document
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub id: DocumentId,
    pub patch: Metadata,
}

/// Output of an extraction pass
#[derive(Debug, Default)]
pub struct Extraction {
    /// Valid items, in extraction order
    pub items: Vec<PublishItem>,
    /// Documents whose metadata needs persisting (identifier and/or date)
    pub pending: Vec<PendingWrite>,
    /// Why documents were excluded
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads tagged documents from a store and builds [`PublishItem`]s
pub struct ItemExtractor<'a> {
    store: &'a dyn DocumentStore,
    options: ExtractOptions,
    transliterator: &'a dyn Transliterator,
}

impl<'a> ItemExtractor<'a> {
    pub fn new(store: &'a dyn DocumentStore, options: ExtractOptions) -> Self {
        Self {
            store,
            options,
            transliterator: &PinyinTransliterator,
        }
    }

    pub fn with_transliterator(mut self, transliterator: &'a dyn Transliterator) -> Self {
        self.transliterator = transliterator;
        self
    }

    /// Extract every publishable item
    ///
    /// Only failing to enumerate the store is fatal; per-document problems
    /// become diagnostics and the document is skipped.
    pub fn extract(&self) -> Result<Extraction, StoreError> {
        let ids = self.store.list_tagged(&self.options.tag)?;
        tracing::info!("Found {} documents tagged '{}'", ids.len(), self.options.tag);

        let mut extraction = Extraction::default();
        for id in ids {
            match self.extract_one(&id) {
                Ok(Some((item, patch))) => {
                    tracing::debug!(document = %id, slug = %item.slug, "Extracted item");
                    if !patch.is_empty() {
                        extraction.pending.push(PendingWrite {
                            id: id.clone(),
                            patch,
                        });
                    }
                    extraction.items.push(item);
                }
                Ok(None) => tracing::debug!(document = %id, "Not tagged for publishing"),
                Err(diag) => {
                    tracing::warn!(document = %id, "{}", diag.message);
                    extraction.diagnostics.push(diag);
                }
            }
        }

        tracing::info!(
            items = extraction.items.len(),
            pending = extraction.pending.len(),
            skipped = extraction.diagnostics.len(),
            "Extraction finished"
        );
        Ok(extraction)
    }

    fn extract_one(&self, id: &DocumentId) -> Result<Option<(PublishItem, Metadata)>, Diagnostic> {
        let source = id.to_string();
        let metadata = self.store.read_metadata(id).map_err(|err| {
            let code = match err {
                StoreError::Frontmatter { .. } => "frontmatter.invalid",
                _ => "document.unreadable",
            };
            Diagnostic::warning(code, err.to_string()).with_source(source.as_str())
        })?;

        if !has_tag(&metadata, &self.options.tag) {
            return Ok(None);
        }

        let text = self.store.read(id).map_err(|err| {
            Diagnostic::warning("document.unreadable", err.to_string()).with_source(source.as_str())
        })?;

        let title = id.title().to_string();
        let mut patch = Metadata::new();

        let date = match raw_date(&metadata) {
            Some(raw) => normalize_date(&raw).map_err(|err| {
                Diagnostic::warning(
                    "date.malformed",
                    format!("Skipped \"{}\": {}", title, err),
                )
                .with_source(source.as_str())
            })?,
            None => {
                let (key, value, period) = imputed_period(self.options.today);
                match value {
                    ImputedValue::Month(yymm) => patch.insert(key, yymm),
                    ImputedValue::Date(date) => patch.insert(key, date.as_str()),
                }
                period
            }
        };

        let slug = match metadata.get_scalar(SLUG_KEY).map(|s| s.trim().to_string()) {
            Some(stored) if is_valid_slug(&stored) => stored,
            Some(stored) if !stored.is_empty() => {
                let normalized = slug_or_empty(&stored, self.transliterator);
                if !normalized.is_empty() {
                    patch.insert(SLUG_KEY, normalized.as_str());
                }
                normalized
            }
            _ => {
                let derived = slugify_with(&title, self.transliterator);
                patch.insert(SLUG_KEY, derived.as_str());
                derived
            }
        };

        if slug.is_empty() {
            return Err(Diagnostic::warning(
                "slug.empty",
                format!("Skipped \"{}\": identifier is empty", title),
            )
            .with_source(source.as_str()));
        }

        let content = strip_frontmatter(&text).to_string();
        let search_text = markdown_to_text(&content);
        let excerpt = create_snippet(&search_text, self.options.excerpt_chars);

        Ok(Some((
            PublishItem {
                slug,
                title,
                date,
                source: id.clone(),
                content,
                content_html: String::new(),
                excerpt,
                search_text,
            },
            patch,
        )))
    }
}

enum ImputedValue {
    Month(u64),
    Date(String),
}

/// The current period as a metadata entry that reads back to the same month
///
/// The compact `month: YYMM` form is used while it round-trips through
/// [`normalize_date`]; from 2100 on (or in 2000-01..09) it is `date: YYYY-MM`.
fn imputed_period(today: NaiveDate) -> (&'static str, ImputedValue, String) {
    let period = format!("{:04}-{:02}", today.year(), today.month());
    let yymm = (today.year().rem_euclid(100) as u64) * 100 + u64::from(today.month());
    if normalize_date(&yymm.to_string()).as_deref() == Ok(period.as_str()) {
        (MONTH_KEY, ImputedValue::Month(yymm), period)
    } else {
        (DATE_KEY, ImputedValue::Date(period.clone()), period)
    }
}

/// Month wins over date when both are present
fn raw_date(metadata: &Metadata) -> Option<String> {
    metadata
        .get_scalar(MONTH_KEY)
        .or_else(|| metadata.get_scalar(DATE_KEY))
        .filter(|s| !s.trim().is_empty())
}
