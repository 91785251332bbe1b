use std::fs;
use std::path::PathBuf;

use cfbuild_lib::exec::CommandSpec;
use cfbuild_lib::stage::StageKind;
use cfbuild_lib::testing::{SearchPath, run_tests};

use super::common::Fixture;

fn add_test_file(fixture: &Fixture) {
  let dir = fixture.root.join("test");
  fs::create_dir_all(&dir).unwrap();
  fs::write(dir.join("test_obj.py"), "import unittest\n").unwrap();
}

fn site_path() -> SearchPath {
  let mut path = SearchPath::new();
  path.push("/opt/site");
  path
}

#[tokio::test]
async fn passing_suite_restores_search_path() {
  let fixture = Fixture::new();
  add_test_file(&fixture);
  let mut pipeline = fixture.pipeline_with_search_path(site_path());

  let result = pipeline.test().await;

  assert!(result.is_success(), "test failed: {:?}", result.failed);
  let summary = result.test_summary().unwrap();
  assert_eq!(summary.ran, 1);
  assert!(summary.passed());
  assert_eq!(result.exit_code(), 0);
  assert_eq!(pipeline.search_path(), &site_path());

  let seen = fs::read_to_string(fixture.seen_search_path()).unwrap();
  let lib_dir = fixture.host().lib_dir(&fixture.layout());
  let expected = std::env::join_paths([PathBuf::from("/opt/site"), lib_dir]).unwrap();
  assert_eq!(seen.trim(), expected.to_string_lossy());
}

#[tokio::test]
async fn failing_suite_exits_one_and_restores_search_path() {
  let fixture = Fixture::new();
  add_test_file(&fixture);
  fs::write(fixture.test_fail_flag(), "").unwrap();
  let mut pipeline = fixture.pipeline_with_search_path(site_path());

  let result = pipeline.test().await;

  assert!(result.failed.is_none());
  let summary = result.test_summary().unwrap();
  assert_eq!(summary.failures, 1);
  assert_eq!(result.exit_code(), 1);
  assert_eq!(pipeline.search_path(), &site_path());
}

#[tokio::test]
async fn failed_build_does_not_run_tests() {
  let fixture = Fixture::new();
  add_test_file(&fixture);
  fs::write(fixture.make_fail_flag(), "").unwrap();
  let mut pipeline = fixture.pipeline_with_search_path(site_path());

  let result = pipeline.test().await;

  assert!(result.is_skipped(StageKind::Test));
  assert_eq!(fixture.count_logged("python"), 0);
  assert_eq!(pipeline.search_path(), &site_path());
}

#[tokio::test]
async fn empty_suite_does_not_start_interpreter() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();

  let result = pipeline.test().await;

  assert!(result.is_success());
  assert_eq!(result.test_summary().map(|s| s.ran), Some(0));
  assert_eq!(fixture.count_logged("python"), 0);
}

#[tokio::test]
async fn suite_is_discovered_from_test_dir() {
  let fixture = Fixture::new();
  add_test_file(&fixture);
  let mut pipeline = fixture.pipeline();

  let result = pipeline.test().await;

  assert_eq!(result.exit_code(), 0);
  let runs: Vec<String> = fixture
    .log_lines()
    .into_iter()
    .filter(|line| line.starts_with("python"))
    .collect();
  assert_eq!(runs, vec!["python -m unittest discover -s test -t test -p test*.py".to_string()]);
}

fn has_python3() -> bool {
  std::process::Command::new("python3")
    .arg("--version")
    .output()
    .is_ok_and(|out| out.status.success())
}

#[tokio::test]
async fn real_interpreter_imports_modules_from_test_dir() {
  if !has_python3() {
    eprintln!("python3 not available, skipping");
    return;
  }
  let fixture = Fixture::new();
  let dir = fixture.root.join("test");
  fs::create_dir_all(&dir).unwrap();
  fs::write(
    dir.join("test_obj.py"),
    "import unittest\n\nclass TestObj(unittest.TestCase):\n    def test_nothing(self):\n        pass\n",
  )
  .unwrap();
  let layout = fixture.layout();
  let mut path = SearchPath::new();

  let summary = run_tests(&CommandSpec::new("python3"), &layout, &fixture.root.join("build"), &mut path)
    .await
    .unwrap();

  assert_eq!(summary.ran, 1, "runner output: {}", summary.output);
  assert_eq!(summary.errors, 0, "runner output: {}", summary.output);
  assert!(summary.passed());
}
