use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn clean_after_build_removes_artifacts() {
  let env = TestEnv::new();
  env.cfbuild_cmd().arg("build").assert().success();

  env
    .cfbuild_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Clean complete"));

  for gone in ["charmonizer", "charmony.h", "Makefile", "libclownfish.a", "_clownfish.c"] {
    assert!(!env.root.join(gone).exists(), "{} should be removed", gone);
  }
  assert_eq!(env.count_logged("make distclean"), 1);
  assert!(env.module_path().exists(), "plain clean keeps build/lib.*");
}

#[test]
fn clean_all_removes_build_output() {
  let env = TestEnv::new();
  env.cfbuild_cmd().arg("build").assert().success();

  env.cfbuild_cmd().args(["clean", "--all"]).assert().success();

  assert!(!env.module_path().exists());
  assert!(!env.root.join("build").join("cfc-staging").exists());
  assert!(env.root.join("src").join("clownfish").join("__init__.py").exists());
}

#[test]
fn second_clean_is_a_no_op() {
  let env = TestEnv::new();
  env.cfbuild_cmd().arg("build").assert().success();
  env.cfbuild_cmd().arg("clean").assert().success();

  env
    .cfbuild_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to clean"));
}

#[test]
fn rebuild_after_clean_reruns_probe() {
  let env = TestEnv::new();
  env.cfbuild_cmd().arg("build").assert().success();
  env.cfbuild_cmd().arg("clean").assert().success();
  env.cfbuild_cmd().arg("build").assert().success();

  assert_eq!(env.count_logged("charmonizer"), 2);
  assert_eq!(env.count_logged("cfc host"), 2);
  assert!(env.module_path().is_file());
}

#[test]
fn clean_json_lists_removed_paths() {
  let env = TestEnv::new();
  env.cfbuild_cmd().arg("charmony").assert().success();

  env
    .cfbuild_cmd()
    .args(["-o", "json", "clean"])
    .assert()
    .success()
    .stdout(predicate::str::contains("removed"))
    .stdout(predicate::str::contains("charmony.h"))
    .stdout(predicate::str::contains("\"distclean_ran\": true"));
}
