//! View helpers for browsing the catalog: filtering, paging, and summaries.

use std::fmt;

use shopflow_core::Item;

/// Items revealed per "view more" step.
pub const PAGE_STEP: usize = 8;

/// Search text and category selection applied to a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// Free-text query matched against title and description
    pub search: String,
    /// Exact category label, `None` for all categories
    pub category: Option<String>,
}

impl CatalogFilter {
    #[must_use]
    pub fn new(search: impl Into<String>, category: Option<String>) -> Self {
        Self {
            search: search.into(),
            category,
        }
    }

    /// Whether `item` passes the filter.
    ///
    /// Search is case-insensitive; an empty or blank search matches everything.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        if self
            .category
            .as_ref()
            .is_some_and(|category| item.category != *category)
        {
            return false;
        }

        let query = self.search.trim().to_lowercase();
        query.is_empty()
            || item.title.to_lowercase().contains(&query)
            || item.description.to_lowercase().contains(&query)
    }

    /// Items passing the filter, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
        items.iter().filter(|item| self.matches(item)).collect()
    }

    /// Whether neither a search nor a category is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.category.is_none()
    }
}

/// Incremental "view more / view less" paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    display_count: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new()
    }
}

impl Pager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            display_count: PAGE_STEP,
        }
    }

    /// How many items are currently shown at most.
    #[must_use]
    pub const fn display_count(&self) -> usize {
        self.display_count
    }

    pub const fn show_more(&mut self) {
        self.display_count = self.display_count.saturating_add(PAGE_STEP);
    }

    /// Hide one step, never going below the first page.
    pub fn show_less(&mut self) {
        self.display_count = self.display_count.saturating_sub(PAGE_STEP).max(PAGE_STEP);
    }

    /// Back to the first page, e.g. after the filter changed.
    pub const fn reset(&mut self) {
        self.display_count = PAGE_STEP;
    }

    /// The visible prefix of `items`.
    #[must_use]
    pub fn page<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let (visible, _) = items.split_at(items.len().min(self.display_count));
        visible
    }

    #[must_use]
    pub const fn has_more(&self, total: usize) -> bool {
        total > self.display_count
    }

    #[must_use]
    pub const fn can_show_less(&self) -> bool {
        self.display_count > PAGE_STEP
    }
}

/// "Showing X of Y products" line under a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSummary<'a> {
    pub shown: usize,
    pub total: usize,
    pub filter: &'a CatalogFilter,
}

impl<'a> ListingSummary<'a> {
    /// Summary for `total` matching items paged by `pager`.
    #[must_use]
    pub fn new(pager: &Pager, total: usize, filter: &'a CatalogFilter) -> Self {
        Self {
            shown: total.min(pager.display_count()),
            total,
            filter,
        }
    }
}

impl fmt::Display for ListingSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Showing {} of {} products", self.shown, self.total)?;
        if let Some(category) = &self.filter.category {
            write!(f, " in {category}")?;
        }
        let query = self.filter.search.trim();
        if !query.is_empty() {
            write!(f, " matching \"{query}\"")?;
        }
        Ok(())
    }
}
