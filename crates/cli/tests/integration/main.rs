//! CLI integration tests driving the `cfbuild` binary against fake tools.

#![cfg(unix)]

mod clean_tests;
