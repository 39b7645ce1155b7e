/// Where a logical offset lands in the remote pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePosition {
    /// Remote page number that holds the item at the offset.
    pub page: u64,
    /// Leading items of that page that come before the offset.
    pub drop: u64,
}

/// Map a logical item offset to the page that contains it.
///
/// Pages are always fetched whole, so the first `drop` results of `page`
/// are discarded to land exactly on `offset`.
pub fn translate(offset: u64, page_size: u64, first_page: u64) -> PagePosition {
    debug_assert!(page_size > 0, "page size must be positive");
    let index = offset / page_size;
    PagePosition {
        page: index + first_page,
        drop: offset - index * page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_mid_page_drops_leading_items() {
        assert_eq!(translate(25, 20, 1), PagePosition { page: 2, drop: 5 });
    }

    #[test]
    fn offset_on_page_boundary_drops_nothing() {
        assert_eq!(translate(0, 20, 1), PagePosition { page: 1, drop: 0 });
        assert_eq!(translate(40, 20, 1), PagePosition { page: 3, drop: 0 });
    }

    #[test]
    fn zero_based_pagination() {
        assert_eq!(translate(19, 20, 0), PagePosition { page: 0, drop: 19 });
    }

    #[test]
    fn position_always_reconstructs_the_offset() {
        for page_size in 1..=25u64 {
            for first_page in 0..=1u64 {
                for offset in 0..200u64 {
                    let pos = translate(offset, page_size, first_page);
                    assert!(pos.drop < page_size);
                    assert_eq!((pos.page - first_page) * page_size + pos.drop, offset);
                }
            }
        }
    }
}
