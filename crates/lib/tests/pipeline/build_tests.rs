use std::fs;
use std::time::{Duration, SystemTime};

use cfbuild_lib::codegen::CodegenError;
use cfbuild_lib::stage::{StageError, StageKind, StageStatus};

use super::common::{Fixture, mtime, set_mtime};

#[tokio::test]
async fn fresh_build_runs_every_stage_in_order() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();

  let result = pipeline.build().await;

  assert!(result.is_success(), "build failed: {:?}", result.failed);
  let kinds: Vec<StageKind> = result.completed.iter().map(|r| r.kind).collect();
  assert_eq!(kinds, StageKind::all()[..7].to_vec());

  let layout = fixture.layout();
  assert!(layout.charmony_h().is_file());
  assert!(layout.makefile().is_file());
  assert!(fixture.root.join("libclownfish.a").is_file());
  assert!(fixture.module_path().is_file());
  assert!(
    fixture
      .host()
      .lib_dir(&layout)
      .join("clownfish")
      .join("__init__.py")
      .is_file()
  );

  let tools: Vec<String> = fixture
    .log_lines()
    .iter()
    .map(|line| line.split_whitespace().next().unwrap_or_default().to_string())
    .collect();
  assert_eq!(tools, vec!["cc", "charmonizer", "make", "cc", "cc"]);
}

#[tokio::test]
async fn probe_arguments_reach_charmonizer() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();

  assert!(pipeline.charmony().await.is_success());

  let line = fixture
    .log_lines()
    .into_iter()
    .find(|line| line.starts_with("charmonizer"))
    .unwrap();
  assert!(line.contains("--enable-c --enable-python --host=python --enable-makefile --"));
  assert!(line.contains(&format!("-O2 -I{}", fixture.base.join("include").display())));
}

#[tokio::test]
async fn charmony_runs_probe_only() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();

  let result = pipeline.charmony().await;

  assert!(result.is_success());
  assert_eq!(result.completed.len(), 1);
  assert_eq!(fixture.count_logged("make"), 0);
  assert_eq!(pipeline.generator().core_calls, 0);
}

#[tokio::test]
async fn libclownfish_stops_after_archive() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();

  let result = pipeline.libclownfish().await;

  assert!(result.is_success());
  assert_eq!(result.completed.last().map(|r| r.kind), Some(StageKind::Archive));
  assert!(fixture.root.join("libclownfish.a").is_file());
  assert!(!fixture.module_path().exists());
}

#[tokio::test]
async fn second_build_reuses_probe_and_module() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();
  assert!(pipeline.build().await.is_success());

  pipeline.generator_mut().changed = false;
  let result = pipeline.build().await;

  assert!(result.is_success());
  assert_eq!(result.status(StageKind::Probe), Some(&StageStatus::UpToDate));
  assert_eq!(result.status(StageKind::Link), Some(&StageStatus::UpToDate));
  assert_eq!(fixture.count_logged("charmonizer"), 1);
  assert_eq!(fixture.count_logged("cc -o"), 1);
}

#[tokio::test]
async fn newer_probe_source_recompiles_and_reruns() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();
  assert!(pipeline.charmony().await.is_success());

  let layout = fixture.layout();
  set_mtime(&layout.charmonizer_c, SystemTime::now() + Duration::from_secs(60));

  let result = pipeline.charmony().await;

  assert_eq!(result.status(StageKind::Probe), Some(&StageStatus::Ran));
  assert_eq!(fixture.count_logged("cc -o"), 2);
  assert_eq!(fixture.count_logged("charmonizer"), 2);
}

#[tokio::test]
async fn unchanged_core_does_not_rebind_host() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();
  assert!(pipeline.libclownfish().await.is_success());

  let glue = fixture.layout().binding_file;
  let old = SystemTime::now() - Duration::from_secs(3600);
  set_mtime(&glue, old);

  pipeline.generator_mut().changed = false;
  let result = pipeline.libclownfish().await;

  assert!(result.is_success());
  assert_eq!(result.status(StageKind::CoreBind), Some(&StageStatus::UpToDate));
  assert_eq!(result.status(StageKind::HostBind), Some(&StageStatus::NotNeeded));
  assert_eq!(pipeline.generator().host_calls, 1);
  assert_eq!(mtime(&glue), old);
}

#[tokio::test]
async fn changed_core_rebinds_host_and_logs_hierarchy() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();
  assert!(pipeline.libclownfish().await.is_success());
  assert!(pipeline.libclownfish().await.is_success());

  assert_eq!(pipeline.generator().host_calls, 2);
  let log = fixture.layout().autogen_dir.join("hierarchy.json");
  let content = fs::read_to_string(log).unwrap();
  assert!(content.contains("Obj.cfh"));
}

#[tokio::test]
async fn make_failure_aborts_before_link() {
  let fixture = Fixture::new();
  fs::write(fixture.make_fail_flag(), "").unwrap();
  let mut pipeline = fixture.pipeline();

  let result = pipeline.build().await;

  assert!(!result.is_success());
  let (kind, err) = result.failed.as_ref().unwrap();
  assert_eq!(*kind, StageKind::Archive);
  assert!(matches!(err, StageError::Exec(_)));
  assert!(result.is_skipped(StageKind::Package));
  assert!(result.is_skipped(StageKind::Link));
  assert_eq!(result.exit_code(), 2);
  assert!(!fixture.module_path().exists());
  assert_eq!(fixture.count_logged("cc -shared"), 0);
}

#[tokio::test]
async fn missing_core_sources_fail_hierarchy() {
  let fixture = Fixture::new();
  fs::remove_dir_all(fixture.base.join("runtime").join("core")).unwrap();
  let mut pipeline = fixture.pipeline();

  let result = pipeline.build().await;

  let (kind, err) = result.failed.as_ref().unwrap();
  assert_eq!(*kind, StageKind::Hierarchy);
  assert!(matches!(err, StageError::Codegen(CodegenError::MissingSourceDir(_))));
  assert_eq!(result.skipped.len(), 5);
  assert_eq!(result.exit_code(), 1);
}
