//! UUID helpers.

use uuid::Uuid;

/// Generate a time-ordered UUIDv7.
///
/// New rows use v7 so primary keys sort by creation time, which keeps
/// btree inserts append-mostly and makes ids useful in log correlation.
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_v7_is_version_7() {
        assert_eq!(new_v7().get_version_num(), 7);
    }

    #[test]
    fn test_new_v7_sorts_by_creation() {
        let a = new_v7();
        let b = new_v7();
        assert!(a <= b);
    }
}
