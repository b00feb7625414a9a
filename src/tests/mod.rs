//! # End-to-End Tests
//!
//! Scenario tests that drive the whole pipeline through the library's public
//! API, plus tests for the binary's argument parsing.

mod cli_tests;
mod pipeline_tests;
