use std::{collections::BTreeMap, fmt};

/// Value of one list filter. `All` means the filter is left out of the query
/// entirely, not sent as the literal string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterValue {
    #[default]
    All,
    Value(String),
}

impl FilterValue {
    pub const ALL_SENTINEL: &'static str = "all";

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::ALL_SENTINEL) {
            FilterValue::All
        } else {
            FilterValue::Value(trimmed.to_string())
        }
    }

    pub fn query_value(&self) -> Option<&str> {
        match self {
            FilterValue::All => None,
            FilterValue::Value(value) => Some(value),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for FilterValue {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Value(value.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Value(value.to_string())
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value().unwrap_or(Self::ALL_SENTINEL))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    size: u32,
}

impl Pagination {
    /// Both values are clamped to at least 1.
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size: size.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn first_page(self) -> Self {
        Self { page: 1, ..self }
    }
}

/// Everything one list screen shows and the query that produced it.
#[derive(Debug, Clone)]
pub struct ListQueryState<E> {
    pub keyword: String,
    pub filters: BTreeMap<String, FilterValue>,
    pub pagination: Pagination,
    pub total: u64,
    pub rows: Vec<E>,
    pub is_loading: bool,
}

impl<E> ListQueryState<E> {
    pub fn new(page_size: u32) -> Self {
        Self {
            keyword: String::new(),
            filters: BTreeMap::new(),
            pagination: Pagination::new(1, page_size),
            total: 0,
            rows: Vec::new(),
            is_loading: false,
        }
    }

    /// Outbound parameters: keyword when non-blank, paging, then every filter
    /// not set to `all`.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(3 + self.filters.len());
        let keyword = self.keyword.trim();
        if !keyword.is_empty() {
            pairs.push(("keyword".to_string(), keyword.to_string()));
        }
        pairs.push(("page".to_string(), self.pagination.page().to_string()));
        pairs.push(("size".to_string(), self.pagination.size().to_string()));
        for (name, value) in &self.filters {
            if let Some(value) = value.query_value() {
                pairs.push((name.clone(), value.to_string()));
            }
        }
        pairs
    }
}
