//! View helpers shared by templates and controllers.

use std::ops::RangeInclusive;

use serde::Serialize;

/// Finite, restartable inclusive integer sequence.
///
/// Iterating borrows the bounds only, so the same `Seq` can be walked any
/// number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seq {
    start: i64,
    end: i64,
}

impl Seq {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn iter(&self) -> RangeInclusive<i64> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            usize::try_from(self.end.abs_diff(self.start))
                .unwrap_or(usize::MAX)
                .saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for Seq {
    type Item = i64;
    type IntoIter = RangeInclusive<i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &Seq {
    type Item = i64;
    type IntoIter = RangeInclusive<i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Previous/next navigation for a paged listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pager {
    pub page: u64,
    pub total_pages: u64,
    /// `None` when already on the first page.
    pub prev: Option<String>,
    /// `None` when already on the last page.
    pub next: Option<String>,
    #[serde(skip)]
    page_size: u64,
    #[serde(skip)]
    count: u64,
}

impl Pager {
    /// Returns `None` for an empty listing. Out-of-range pages are clamped.
    pub fn new(url_base: &str, page: u64, page_size: u64, count: u64) -> Option<Self> {
        if count == 0 || page_size == 0 {
            return None;
        }
        let total_pages = count.div_ceil(page_size);
        let page = page.clamp(1, total_pages);
        let sep = if url_base.contains('?') { '&' } else { '?' };
        let link = |p: u64| format!("{url_base}{sep}page={p}");

        Some(Self {
            page,
            total_pages,
            prev: (page > 1).then(|| link(page - 1)),
            next: (page < total_pages).then(|| link(page + 1)),
            page_size,
            count,
        })
    }

    /// Every page number, for numbered navigation.
    pub fn pages(&self) -> Seq {
        Seq::new(1, self.total_pages as i64)
    }

    /// Zero-based indexes of the items on the current page.
    pub fn items(&self) -> Seq {
        let first = (self.page - 1) * self.page_size;
        let last = (first + self.page_size).min(self.count) - 1;
        Seq::new(first as i64, last as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_restartable() {
        let seq = Seq::new(1, 3);
        let first: Vec<i64> = seq.iter().collect();
        let second: Vec<i64> = (&seq).into_iter().collect();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(first, second);
        assert_eq!(seq.len(), 3);
        assert!(Seq::new(5, 4).is_empty());
    }

    #[test]
    fn test_seq_len_spans_the_whole_range() {
        assert_eq!(Seq::new(-2, 2).len(), 5);
        assert_eq!(Seq::new(i64::MIN, i64::MIN).len(), 1);
        assert_eq!(Seq::new(i64::MIN, i64::MAX).len(), usize::MAX);
    }

    #[test]
    fn test_pager_links() {
        let pager = Pager::new("/note", 2, 10, 35).unwrap();
        assert_eq!(pager.total_pages, 4);
        assert_eq!(pager.prev.as_deref(), Some("/note?page=1"));
        assert_eq!(pager.next.as_deref(), Some("/note?page=3"));
        assert_eq!(pager.pages().into_iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_pager_edges() {
        assert!(Pager::new("/note", 1, 10, 0).is_none());
        let only = Pager::new("/note", 1, 10, 5).unwrap();
        assert_eq!(only.prev, None);
        assert_eq!(only.next, None);
        let last = Pager::new("/note", 4, 10, 35).unwrap();
        assert_eq!(last.next, None);
    }

    #[test]
    fn test_pager_items_and_clamping() {
        let pager = Pager::new("/note", 4, 10, 35).unwrap();
        assert_eq!(pager.items().into_iter().collect::<Vec<_>>(), (30..=34).collect::<Vec<_>>());

        let past_end = Pager::new("/note?pageSize=10", 9, 10, 35).unwrap();
        assert_eq!(past_end.page, 4);
        assert_eq!(past_end.prev.as_deref(), Some("/note?pageSize=10&page=3"));

        let json = serde_json::to_value(&pager).unwrap();
        assert_eq!(json["TotalPages"], 4);
        assert!(json.get("count").is_none());
    }
}
