//! Database-backed integration tests.
//!
//! These run against a live PostgreSQL (DATABASE_URL or the default test
//! URL in `test_fixtures`) and are `#[ignore]`d by default:
//!
//! ```sh
//! cargo test -p clipmark-db -- --ignored
//! ```

mod search_facet_tests;
mod segment_lifecycle_tests;
