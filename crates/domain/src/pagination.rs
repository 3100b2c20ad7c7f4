use serde::Serialize;
use staffhub_core::{AppError, AppResult};

use crate::DocumentId;

/// Page size used by paged lists unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// One page of an ordered id list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    page_number: usize,
    page_size: usize,
    total_items: usize,
    total_pages: usize,
    ids: Vec<DocumentId>,
    redirected: bool,
    focus: Option<DocumentId>,
}

impl Page {
    /// Returns the 1-based page number actually served.
    #[must_use]
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Returns page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of ids across all pages.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.total_items
    }

    /// Returns the number of pages; zero for an empty list.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Returns ids on this page.
    #[must_use]
    pub fn ids(&self) -> &[DocumentId] {
        self.ids.as_slice()
    }

    /// Returns whether the requested page was out of range and page 1 was served.
    #[must_use]
    pub fn redirected(&self) -> bool {
        self.redirected
    }

    /// Returns the id the view should scroll to, for direct links.
    #[must_use]
    pub fn focus(&self) -> Option<&DocumentId> {
        self.focus.as_ref()
    }
}

/// Returns `ceil(total / page_size)`.
#[must_use]
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }

    total_items.div_ceil(page_size)
}

/// Slices page `page_number` (1-based) out of `ids`.
///
/// Out-of-range page numbers, including any page of an empty list other than
/// 1, serve page 1 with `redirected` set.
pub fn page_of(ids: &[DocumentId], page_number: usize, page_size: usize) -> AppResult<Page> {
    if page_size == 0 {
        return Err(AppError::Validation(
            "page size must be greater than zero".to_owned(),
        ));
    }

    let pages = total_pages(ids.len(), page_size);
    let in_range = page_number >= 1 && page_number <= pages.max(1);
    let served = if in_range { page_number } else { 1 };
    let start = (served - 1) * page_size;
    let end = (start + page_size).min(ids.len());

    Ok(Page {
        page_number: served,
        page_size,
        total_items: ids.len(),
        total_pages: pages,
        ids: ids.get(start..end).map(<[DocumentId]>::to_vec).unwrap_or_default(),
        redirected: !in_range,
        focus: None,
    })
}

/// Serves the page containing `id` and marks it as the focus.
///
/// Unknown ids serve page 1 with `redirected` set.
pub fn page_containing(ids: &[DocumentId], id: &DocumentId, page_size: usize) -> AppResult<Page> {
    if page_size == 0 {
        return Err(AppError::Validation(
            "page size must be greater than zero".to_owned(),
        ));
    }

    let Some(index) = ids.iter().position(|candidate| candidate == id) else {
        let mut page = page_of(ids, 1, page_size)?;
        page.redirected = true;
        return Ok(page);
    };

    let mut page = page_of(ids, index / page_size + 1, page_size)?;
    page.focus = Some(id.clone());
    Ok(page)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{page_containing, page_of, total_pages};
    use crate::DocumentId;

    fn ids(count: usize) -> Vec<DocumentId> {
        (0..count)
            .map(|index| DocumentId::new(format!("doc-{index}")).unwrap_or_else(|_| unreachable!()))
            .collect()
    }

    #[test]
    fn twelve_items_make_three_pages() {
        let ids = ids(12);
        let page = page_of(&ids, 3, 5).unwrap_or_else(|_| unreachable!());
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.ids().len(), 2);
        assert!(!page.redirected());
    }

    #[test]
    fn out_of_range_page_redirects_to_first() {
        let ids = ids(12);
        for requested in [0, 4, 99] {
            let page = page_of(&ids, requested, 5).unwrap_or_else(|_| unreachable!());
            assert_eq!(page.page_number(), 1);
            assert!(page.redirected());
        }
    }

    #[test]
    fn empty_list_serves_empty_first_page() {
        let page = page_of(&[], 1, 5).unwrap_or_else(|_| unreachable!());
        assert_eq!(page.page_number(), 1);
        assert_eq!(page.total_pages(), 0);
        assert!(page.ids().is_empty());
        assert!(!page.redirected());

        let page = page_of(&[], 2, 5).unwrap_or_else(|_| unreachable!());
        assert!(page.redirected());
    }

    #[test]
    fn direct_link_lands_on_containing_page() {
        let ids = ids(12);
        let page = page_containing(&ids, &ids[7], 5).unwrap_or_else(|_| unreachable!());
        assert_eq!(page.page_number(), 2);
        assert_eq!(page.focus(), Some(&ids[7]));
        assert!(page.ids().contains(&ids[7]));
    }

    #[test]
    fn unknown_direct_link_redirects() {
        let ids = ids(3);
        let missing = DocumentId::new("gone").unwrap_or_else(|_| unreachable!());
        let page = page_containing(&ids, &missing, 5).unwrap_or_else(|_| unreachable!());
        assert!(page.redirected());
        assert!(page.focus().is_none());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(page_of(&ids(2), 1, 0).is_err());
        assert_eq!(total_pages(2, 0), 0);
    }

    proptest! {
        #[test]
        fn pages_partition_the_list(count in 0usize..60, page_size in 1usize..9) {
            let ids = ids(count);
            let pages = total_pages(count, page_size);
            let mut seen = Vec::new();
            for number in 1..=pages {
                let page = page_of(&ids, number, page_size).unwrap_or_else(|_| unreachable!());
                prop_assert!(!page.redirected());
                prop_assert!(!page.ids().is_empty());
                prop_assert!(page.ids().len() <= page_size);
                seen.extend(page.ids().iter().cloned());
            }
            prop_assert_eq!(seen, ids);
        }

        #[test]
        fn every_id_is_located_on_its_page(count in 1usize..60, page_size in 1usize..9, pick in 0usize..60) {
            let ids = ids(count);
            let target = &ids[pick % count];
            let page = page_containing(&ids, target, page_size).unwrap_or_else(|_| unreachable!());
            prop_assert!(page.ids().contains(target));
            prop_assert_eq!(page.page_number(), (pick % count) / page_size + 1);
        }
    }
}
