use serde::Serialize;

/// Every required bit is present. An empty requirement matches anything.
pub fn matches_all(subject: Option<i32>, required: i32) -> bool {
    subject.unwrap_or(0) & required == required
}

/// At least one of the bits is present. An empty set of bits matches anything.
pub fn matches_any(subject: Option<i32>, bits: i32) -> bool {
    bits == 0 || subject.unwrap_or(0) & bits != 0
}

/// None of the bits is present.
pub fn matches_none(subject: Option<i32>, bits: i32) -> bool {
    subject.unwrap_or(0) & bits == 0
}

/// One page of an application-side filtered listing.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredPage<T> {
    pub items: Vec<T>,
    /// Number of rows that passed the filter, not the page length.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    /// The candidate fetch hit the cap, so `total` may undercount.
    pub truncated: bool,
}

/// Filter a bounded candidate set, then slice out `page` (1-based).
///
/// `cap` is the limit the candidates were fetched with; reaching it marks the
/// result as truncated.
pub fn paginate_filtered<T, F>(candidates: Vec<T>, cap: usize, page: usize, page_size: usize, keep: F) -> FilteredPage<T>
where
    F: Fn(&T) -> bool,
{
    let truncated = candidates.len() >= cap;
    let page = page.max(1);
    let page_size = page_size.max(1);

    let filtered: Vec<T> = candidates.into_iter().take(cap).filter(|row| keep(row)).collect();
    let total = filtered.len();
    let items = filtered.into_iter().skip((page - 1).saturating_mul(page_size)).take(page_size).collect();

    FilteredPage { items, total, page, page_size, truncated }
}
