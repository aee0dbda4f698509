//! Integration tests for the crawl agent
//!
//! These tests use wiremock to stand in for the coordinator and the metadata
//! sources and drive the agent end-to-end through its public API.

mod crawl_tests;
