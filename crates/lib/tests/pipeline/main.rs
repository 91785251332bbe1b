//! Pipeline integration tests against fake toolchain scripts.
#![cfg(unix)]

mod common;

mod build_tests;
mod clean_tests;
mod test_runner_tests;
