//! Rendering of pipeline results, shared by every build verb.

use anyhow::Result;
use serde::Serialize;

use cfbuild_lib::stage::{PipelineResult, StageKind, StageStatus};
use cfbuild_lib::testing::TestSummary;

use crate::output::{
  OutputFormat, format_duration, print_error, print_json, print_stage, print_stat, print_success, print_warning,
};

#[derive(Serialize)]
struct ResultJson<'a> {
  goal: StageKind,
  success: bool,
  exit_code: i32,
  completed: Vec<CompletedJson>,
  failed: Option<FailedJson>,
  skipped: Vec<SkippedJson>,
  tests: Option<&'a TestSummary>,
  duration_ms: u64,
}

#[derive(Serialize)]
struct CompletedJson {
  stage: StageKind,
  status: &'static str,
  duration_ms: u64,
}

#[derive(Serialize)]
struct FailedJson {
  stage: StageKind,
  error: String,
}

#[derive(Serialize)]
struct SkippedJson {
  stage: StageKind,
  after: StageKind,
}

fn to_json(goal: StageKind, result: &PipelineResult) -> ResultJson<'_> {
  let exit_code = result.exit_code();
  ResultJson {
    goal,
    success: exit_code == 0,
    exit_code,
    completed: result
      .completed
      .iter()
      .map(|r| CompletedJson {
        stage: r.kind,
        status: r.status.label(),
        duration_ms: r.duration.as_millis() as u64,
      })
      .collect(),
    failed: result.failed.as_ref().map(|(stage, err)| FailedJson {
      stage: *stage,
      error: err.to_string(),
    }),
    skipped: result
      .skipped
      .iter()
      .map(|s| SkippedJson {
        stage: s.kind,
        after: s.after,
      })
      .collect(),
    tests: result.test_summary(),
    duration_ms: result.total_duration().as_millis() as u64,
  }
}

fn print_test_summary(summary: &TestSummary) {
  eprint!("{}", summary.output);
  println!();
  print_stat("Tests run", &summary.ran.to_string());
  print_stat("Failures", &summary.failures.to_string());
  print_stat("Errors", &summary.errors.to_string());
  if summary.skipped > 0 {
    print_stat("Skipped", &summary.skipped.to_string());
  }
}

/// Print `result` and return the process exit code it maps to.
pub fn print_result(goal: StageKind, result: &PipelineResult, output: OutputFormat, done: &str) -> Result<i32> {
  let exit_code = result.exit_code();

  if output.is_json() {
    print_json(&to_json(goal, result))?;
    return Ok(exit_code);
  }

  for report in &result.completed {
    let passed = !matches!(&report.status, StageStatus::Tested(summary) if !summary.passed());
    print_stage(
      report.kind.name(),
      &format!("{}, {}", report.status.label(), format_duration(report.duration)),
      passed,
    );
  }
  if let Some((stage, err)) = &result.failed {
    print_error(&format!("{} failed: {}", stage, err));
  }
  for skipped in &result.skipped {
    print_warning(&format!("{} skipped after {}", skipped.kind, skipped.after));
  }
  if let Some(summary) = result.test_summary() {
    print_test_summary(summary);
  }

  if exit_code == 0 {
    println!();
    print_success(done);
    print_stat("Duration", &format_duration(result.total_duration()));
  }
  Ok(exit_code)
}
