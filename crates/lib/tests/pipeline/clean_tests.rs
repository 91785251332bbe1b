use cfbuild_lib::clean::clean;

use super::common::Fixture;

#[tokio::test]
async fn clean_after_build_removes_generated_artifacts() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();
  assert!(pipeline.build().await.is_success());

  let layout = fixture.layout();
  let result = clean(&layout, &fixture.toolchain(), true).await.unwrap();

  assert!(result.distclean_ran);
  for gone in ["charmonizer", "charmony.h", "_clownfish.c", "Makefile", "libclownfish.a"] {
    assert!(!fixture.root.join(gone).exists(), "{} should be gone", gone);
  }
  assert!(!fixture.host().lib_dir(&layout).exists());
  assert!(fixture.root.join("src").join("clownfish").join("__init__.py").is_file());
}

#[tokio::test]
async fn cleaning_twice_is_a_no_op() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();
  assert!(pipeline.build().await.is_success());

  let layout = fixture.layout();
  clean(&layout, &fixture.toolchain(), true).await.unwrap();
  let second = clean(&layout, &fixture.toolchain(), true).await.unwrap();

  assert!(second.removed.is_empty());
  assert!(!second.distclean_ran);
}

#[tokio::test]
async fn rebuild_after_clean_starts_from_scratch() {
  let fixture = Fixture::new();
  let mut pipeline = fixture.pipeline();
  assert!(pipeline.build().await.is_success());
  clean(&fixture.layout(), &fixture.toolchain(), false).await.unwrap();

  pipeline.generator_mut().changed = false;
  let result = pipeline.build().await;

  assert!(result.is_success(), "rebuild failed: {:?}", result.failed);
  assert_eq!(fixture.count_logged("charmonizer"), 2);
  // The glue file was cleaned, so it is regenerated even without core changes.
  assert_eq!(pipeline.generator().host_calls, 2);
}
