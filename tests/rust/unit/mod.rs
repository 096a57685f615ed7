//! Unit-level integration tests for the public catalog and planner API.
//!
//! None of these need a running ClickHouse instance; live metadata is
//! replaced by mocks of `MetadataSource`.

mod catalog_config_tests;
mod common;
mod table_descriptor_tests;
mod translation_tests;
