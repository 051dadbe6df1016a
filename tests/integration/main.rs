//! End-to-end tests running the mirror against mock HTTP servers

mod crawl_tests;
