// crates/trackd-gateway/src/pagination.rs

/// Default page size when the caller sends none or an out-of-range one.
pub const PER_PAGE: i64 = 10;
/// Largest accepted page size.
pub const MAX_PER_PAGE: i64 = 100;
/// Smallest accepted page size.
pub const MIN_PER_PAGE: i64 = 1;

/// Return the offset and limit for a list request, substituting the
/// default limit when the requested one is absent or out of range.
pub fn offset_and_limit(offset: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let offset = offset.unwrap_or(0).max(0);
    let limit = match limit {
        Some(l) if (MIN_PER_PAGE..=MAX_PER_PAGE).contains(&l) => l,
        _ => PER_PAGE,
    };
    (offset, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        assert_eq!(offset_and_limit(None, None), (0, PER_PAGE));
    }

    #[test]
    fn test_in_range_limit_is_kept() {
        assert_eq!(offset_and_limit(Some(20), Some(50)), (20, 50));
    }

    #[test]
    fn test_out_of_range_limit_falls_back() {
        assert_eq!(offset_and_limit(Some(0), Some(0)), (0, PER_PAGE));
        assert_eq!(offset_and_limit(Some(0), Some(1000)), (0, PER_PAGE));
        assert_eq!(offset_and_limit(Some(-5), Some(-1)), (0, PER_PAGE));
    }
}
