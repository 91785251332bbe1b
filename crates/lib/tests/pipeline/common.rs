//! Shared fixtures for pipeline integration tests.
//!
//! A [`Fixture`] lays out a runtime source tree in a temp directory with fake
//! `cc`, `make` and `python` scripts. Every fake tool appends its invocation to
//! a shared log so tests can assert what ran and in which order.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use cfbuild_lib::codegen::{CodegenError, Generator, Hierarchy, HostBinding};
use cfbuild_lib::config::{BuildEnv, ProjectLayout};
use cfbuild_lib::exec::CommandSpec;
use cfbuild_lib::host::HostConfig;
use cfbuild_lib::pipeline::Pipeline;
use cfbuild_lib::platform::Toolchain;
use cfbuild_lib::platform::os::Os;
use cfbuild_lib::testing::SearchPath;
use tempfile::TempDir;

pub struct Fixture {
  _temp: TempDir,
  pub base: PathBuf,
  pub root: PathBuf,
  pub log: PathBuf,
}

pub fn write_script(path: &Path, body: &str) {
  fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn set_mtime(path: &Path, time: SystemTime) {
  fs::File::options()
    .write(true)
    .open(path)
    .unwrap()
    .set_modified(time)
    .unwrap();
}

pub fn mtime(path: &Path) -> SystemTime {
  fs::metadata(path).unwrap().modified().unwrap()
}

impl Fixture {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let base = temp.path().to_path_buf();
    let runtime = base.join("runtime");
    let root = runtime.join("python");
    let log = base.join("tools.log");

    fs::create_dir_all(runtime.join("common")).unwrap();
    fs::write(runtime.join("common").join("charmonizer.c"), "int main(void) { return 0; }\n").unwrap();
    fs::create_dir_all(runtime.join("core").join("Clownfish")).unwrap();
    fs::write(
      runtime.join("core").join("Clownfish").join("Obj.cfh"),
      "public class Clownfish::Obj {}\n",
    )
    .unwrap();
    fs::create_dir_all(root.join("src").join("clownfish")).unwrap();
    fs::write(
      root.join("src").join("clownfish").join("__init__.py"),
      "from ._clownfish import *\n",
    )
    .unwrap();
    fs::create_dir_all(base.join("bin")).unwrap();
    fs::create_dir_all(base.join("include")).unwrap();

    let fixture = Self {
      _temp: temp,
      base,
      root,
      log,
    };
    fixture.write_tools();
    fixture
  }

  fn bin(&self, name: &str) -> PathBuf {
    self.base.join("bin").join(name)
  }

  /// Marker file that makes the fake `make` fail its `static` target.
  pub fn make_fail_flag(&self) -> PathBuf {
    self.base.join("make-fails")
  }

  /// Marker file that makes the fake interpreter report a failing test.
  pub fn test_fail_flag(&self) -> PathBuf {
    self.base.join("tests-fail")
  }

  /// Where the fake interpreter records the `PYTHONPATH` it saw.
  pub fn seen_search_path(&self) -> PathBuf {
    self.base.join("pythonpath.txt")
  }

  fn write_tools(&self) {
    let log = self.log.display();

    write_script(
      &self.bin("cc"),
      &format!(
        r##"echo "cc $*" >> {log}
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
case "$out" in
  *charmonizer)
    cat > "$out" <<'PROBE'
#!/bin/sh
echo "charmonizer $*" >> {log}
echo "#define CHY_HAS_STDINT_H" > charmony.h
echo "static:" > Makefile
PROBE
    chmod 755 "$out" ;;
  *) : > "$out" ;;
esac"##
      ),
    );

    write_script(
      &self.bin("make"),
      &format!(
        r#"echo "make $*" >> {log}
for arg in "$@"; do
  case "$arg" in
    static)
      if [ -f {fail} ]; then exit 2; fi
      [ -f libclownfish.a ] || : > libclownfish.a ;;
    distclean) rm -f Makefile libclownfish.a ;;
  esac
done"#,
        fail = self.make_fail_flag().display()
      ),
    );

    write_script(
      &self.bin("python"),
      &format!(
        r#"echo "python $*" >> {log}
echo "$PYTHONPATH" > {seen}
if [ "$3" != "discover" ]; then
  echo "ModuleNotFoundError: No module named 'test.test_obj'" >&2
  echo "FAILED (errors=1)" >&2
  exit 1
fi
echo "Ran 1 test in 0.001s" >&2
if [ -f {fail} ]; then
  echo "FAILED (failures=1)" >&2
  exit 1
fi
echo "OK" >&2"#,
        seen = self.seen_search_path().display(),
        fail = self.test_fail_flag().display()
      ),
    );
  }

  pub fn layout(&self) -> ProjectLayout {
    ProjectLayout::new(&self.root)
  }

  pub fn env(&self) -> BuildEnv {
    BuildEnv {
      cc: Some(self.bin("cc").to_string_lossy().into_owned()),
      make: Some(self.bin("make").to_string_lossy().into_owned()),
      python: Some(self.bin("python").to_string_lossy().into_owned()),
      ..BuildEnv::default()
    }
  }

  pub fn toolchain(&self) -> Toolchain {
    let mut toolchain = Toolchain::for_os(Os::current().unwrap(), &self.env());
    toolchain.jobs = 2;
    toolchain
  }

  pub fn host(&self) -> HostConfig {
    HostConfig {
      python: CommandSpec::new(self.bin("python").to_string_lossy()),
      platform: "linux-x86_64".to_string(),
      major: 3,
      minor: 12,
      include_dir: self.base.join("include"),
      ext_suffix: ".so".to_string(),
      cflags: vec!["-O2".to_string()],
    }
  }

  pub fn pipeline(&self) -> Pipeline<FakeGenerator> {
    Pipeline::new(self.layout(), self.toolchain(), self.host(), FakeGenerator::new())
  }

  pub fn pipeline_with<G: Generator>(&self, generator: G) -> Pipeline<G> {
    Pipeline::new(self.layout(), self.toolchain(), self.host(), generator)
  }

  pub fn pipeline_with_search_path(&self, search_path: SearchPath) -> Pipeline<FakeGenerator> {
    self.pipeline().with_search_path(search_path)
  }

  pub fn log_lines(&self) -> Vec<String> {
    fs::read_to_string(&self.log)
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  pub fn count_logged(&self, prefix: &str) -> usize {
    self.log_lines().iter().filter(|line| line.starts_with(prefix)).count()
  }

  pub fn module_path(&self) -> PathBuf {
    self.host().module_path(&self.layout())
  }
}

/// In-process stand-in for the code generator.
#[derive(Debug)]
pub struct FakeGenerator {
  /// Value reported by the next core bind.
  pub changed: bool,
  pub core_calls: usize,
  pub host_calls: usize,
}

impl FakeGenerator {
  pub fn new() -> Self {
    Self {
      changed: true,
      core_calls: 0,
      host_calls: 0,
    }
  }
}

impl Generator for FakeGenerator {
  async fn bind_core(&mut self, hierarchy: &Hierarchy, header: &str) -> Result<bool, CodegenError> {
    self.core_calls += 1;
    let parcel = hierarchy.include_dir().join("parcel.h");
    if self.changed || !parcel.exists() {
      fs::write(&parcel, format!("/* {} */\n", header)).map_err(|e| CodegenError::io(&parcel, e))?;
    }
    Ok(self.changed)
  }

  async fn bind_host(&mut self, _hierarchy: &Hierarchy, binding: &HostBinding) -> Result<(), CodegenError> {
    self.host_calls += 1;
    let glue = binding.dest.join("_clownfish.c");
    fs::write(&glue, format!("/* {} */\n", binding.header)).map_err(|e| CodegenError::io(&glue, e))
  }
}
