//! Forward-table construction by exhaustive, paginated category search.

use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, info, warn};

use crate::error::MappingError;
use crate::mapping::normalize::{find_external_id, normalize_knowledge_base_id};
use crate::mapping::{Category, ForwardEntry, ForwardTable};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 500;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_PAGE_RETRIES: u32 = 3;
pub const MAX_PAGE_RETRIES: u32 = 10;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// One search hit as the builder sees it; any field may be missing upstream.
#[derive(Debug, Clone, Default)]
pub struct CategoryRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub xrefs: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPage {
    pub total: Option<usize>,
    pub records: Vec<CategoryRecord>,
}

/// Paginated category search, addressable at any offset.
///
/// Implementations must return an error for failed requests and reserve
/// short or empty pages for the real end of results.
#[async_trait::async_trait]
pub trait CategoryPageSource: Send + Sync {
    async fn fetch_page(
        &self,
        category: Category,
        offset: usize,
        limit: usize,
    ) -> Result<CategoryPage, MappingError>;
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub categories: Vec<Category>,
    pub page_size: usize,
    pub concurrency: usize,
    pub max_page_retries: u32,
    pub retry_base_delay: Duration,
}

impl BuildOptions {
    /// Disease is always built; genes and phenotypes are opt-in.
    pub fn new(genes: bool, phenotypes: bool) -> Self {
        let mut categories = vec![Category::Disease];
        if genes {
            categories.push(Category::Gene);
        }
        if phenotypes {
            categories.push(Category::Phenotype);
        }
        Self {
            categories,
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            max_page_retries: DEFAULT_PAGE_RETRIES,
            retry_base_delay: Duration::from_millis(500),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn with_retries(mut self, max_page_retries: u32, base_delay: Duration) -> Self {
        self.max_page_retries = max_page_retries.min(MAX_PAGE_RETRIES);
        self.retry_base_delay = base_delay;
        self
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new(false, false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CategoryStats {
    pub category: Category,
    pub pages: usize,
    pub records: usize,
    pub mapped: usize,
    /// Records with no OMIM cross-reference.
    pub unmapped: usize,
    /// Records missing an ID or outside the category's namespace.
    pub malformed: usize,
}

impl CategoryStats {
    fn new(category: Category) -> Self {
        Self {
            category,
            pages: 0,
            records: 0,
            mapped: 0,
            unmapped: 0,
            malformed: 0,
        }
    }
}

/// A category that aborted, with what it fetched before the failing offset.
#[derive(Debug)]
pub struct CategoryFailure {
    pub stats: CategoryStats,
    pub error: MappingError,
}

#[derive(Debug)]
pub struct BuildReport {
    pub table: ForwardTable,
    pub completed: Vec<CategoryStats>,
    pub failures: Vec<CategoryFailure>,
}

impl BuildReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ForwardBuilder<S> {
    source: S,
    options: BuildOptions,
}

impl<S: CategoryPageSource> ForwardBuilder<S> {
    pub fn new(source: S, options: BuildOptions) -> Self {
        let options = BuildOptions {
            page_size: options.page_size.clamp(1, MAX_PAGE_SIZE),
            concurrency: options.concurrency.clamp(1, MAX_CONCURRENCY),
            max_page_retries: options.max_page_retries.min(MAX_PAGE_RETRIES),
            ..options
        };
        Self { source, options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Builds every selected category in order into one table.
    ///
    /// A failed category is recorded in `failures` and the remaining
    /// categories still run; mappings from successful pages are never dropped.
    pub async fn build(&self) -> BuildReport {
        let mut table = ForwardTable::new();
        let mut completed = Vec::new();
        let mut failures = Vec::new();

        for &category in &self.options.categories {
            info!(category = %category, "Fetching {} records", category.biolink());
            let mut stats = CategoryStats::new(category);
            match self.walk_category(category, 0, &mut table, &mut stats).await {
                Ok(()) => {
                    info!(
                        category = %category,
                        records = stats.records,
                        mapped = stats.mapped,
                        "Category complete"
                    );
                    completed.push(stats);
                }
                Err(error) => {
                    warn!(
                        category = %category,
                        pages = stats.pages,
                        "Category build aborted: {error}"
                    );
                    failures.push(CategoryFailure { stats, error });
                }
            }
        }

        BuildReport {
            table,
            completed,
            failures,
        }
    }

    pub async fn build_category(
        &self,
        category: Category,
        table: &mut ForwardTable,
    ) -> Result<CategoryStats, MappingError> {
        self.build_category_from(category, 0, table).await
    }

    /// Paginates `category` starting at `start_offset`, folding pages into `table`.
    ///
    /// Pages are fetched in windows of up to `concurrency` offsets once the
    /// upstream total is known, and folded strictly in offset order. The first
    /// failing offset (after retries) aborts the category; everything folded
    /// before it stays in `table`.
    pub async fn build_category_from(
        &self,
        category: Category,
        start_offset: usize,
        table: &mut ForwardTable,
    ) -> Result<CategoryStats, MappingError> {
        let mut stats = CategoryStats::new(category);
        self.walk_category(category, start_offset, table, &mut stats).await?;
        Ok(stats)
    }

    async fn walk_category(
        &self,
        category: Category,
        start_offset: usize,
        table: &mut ForwardTable,
        stats: &mut CategoryStats,
    ) -> Result<(), MappingError> {
        let page_size = self.options.page_size;
        let mut offset = start_offset;
        let mut total: Option<usize> = None;

        loop {
            let window = page_window(offset, total, page_size, self.options.concurrency);
            if window.is_empty() {
                break;
            }

            let mut pages = stream::iter(window)
                .map(|page_offset| async move {
                    let result = self.fetch_with_retry(category, page_offset).await;
                    (page_offset, result)
                })
                .buffered(self.options.concurrency);

            let mut finished = false;
            while let Some((page_offset, result)) = pages.next().await {
                let page = result.map_err(|source| MappingError::CategoryFailed {
                    category: category.label().to_string(),
                    offset: page_offset,
                    retained: table.len(),
                    source: Box::new(source),
                })?;

                if total.is_none() {
                    total = page.total;
                }
                stats.pages += 1;
                let short = page.records.len() < page_size;
                fold_page(category, page.records, table, stats);
                offset = page_offset + page_size;

                info!(
                    category = %category,
                    offset,
                    total = ?total,
                    "Retrieved {} {} records so far",
                    stats.records,
                    category
                );

                if short || total.is_some_and(|t| offset >= t) {
                    finished = true;
                    break;
                }
            }

            if finished {
                break;
            }
        }

        Ok(())
    }

    async fn fetch_with_retry(
        &self,
        category: Category,
        offset: usize,
    ) -> Result<CategoryPage, MappingError> {
        let mut attempt = 0;
        loop {
            match self
                .source
                .fetch_page(category, offset, self.options.page_size)
                .await
            {
                Ok(page) => return Ok(page),
                Err(err) if err.is_transient() && attempt < self.options.max_page_retries => {
                    let delay = retry_sleep_duration(self.options.retry_base_delay, attempt);
                    warn!(
                        category = %category,
                        offset,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Page fetch failed, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Offsets to fetch next. Until the first page reports a total only one
/// offset is requested, so an unknown-size category is walked serially.
fn page_window(
    offset: usize,
    total: Option<usize>,
    page_size: usize,
    concurrency: usize,
) -> Vec<usize> {
    match total {
        None => vec![offset],
        Some(total) => (offset..total)
            .step_by(page_size)
            .take(concurrency)
            .collect(),
    }
}

fn retry_sleep_duration(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt)).min(MAX_RETRY_DELAY)
}

fn fold_page(
    category: Category,
    records: Vec<CategoryRecord>,
    table: &mut ForwardTable,
    stats: &mut CategoryStats,
) {
    stats.records += records.len();
    for record in records {
        let Some(kb_id) = record.id.as_deref().and_then(normalize_knowledge_base_id) else {
            debug!(category = %category, "Skipping record without an ID");
            stats.malformed += 1;
            continue;
        };
        if !kb_id.starts_with(category.expected_prefix()) {
            debug!(category = %category, id = %kb_id, "Skipping record outside category namespace");
            stats.malformed += 1;
            continue;
        }
        let Some(external_id) = find_external_id(&record.xrefs) else {
            stats.unmapped += 1;
            continue;
        };

        let name = record
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        table.insert(
            kb_id,
            ForwardEntry {
                external_id,
                name,
                category: Some(category),
            },
        );
        stats.mapped += 1;
    }
}
