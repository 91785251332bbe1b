use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use cfbuild_lib::config::{BuildEnv, ProjectLayout};
use cfbuild_lib::host::HostConfig;
use cfbuild_lib::platform::{Platform, Toolchain};

use crate::output::{OutputFormat, print_json, print_stat, print_warning};

#[derive(Serialize)]
struct Info {
  platform: Option<Platform>,
  toolchain: Option<Toolchain>,
  host: Option<HostConfig>,
  layout: ProjectLayout,
}

/// Print what a build would use. Missing tools are reported, not fatal.
pub async fn cmd_info(root: &Path, output: OutputFormat) -> Result<i32> {
  let env = BuildEnv::from_env();
  let layout = ProjectLayout::new(root);
  let toolchain = Toolchain::detect(&env).ok();
  let host = match HostConfig::probe(&env.python_command(), root).await {
    Ok(host) => Some(host),
    Err(err) => {
      if !output.is_json() {
        print_warning(&format!("Could not query interpreter: {}", err));
      }
      None
    }
  };

  let info = Info {
    platform: Platform::current(),
    toolchain,
    host,
    layout,
  };

  if output.is_json() {
    print_json(&info)?;
    return Ok(0);
  }

  println!("System:");
  match &info.platform {
    Some(platform) => print_stat("Platform", &platform.triple()),
    None => print_stat("Platform", "unknown"),
  }
  if let Some(tc) = &info.toolchain {
    print_stat("Compiler", &tc.compiler_line());
    print_stat("Build tool", &tc.make.command_line());
    print_stat("Jobs", &tc.jobs.to_string());
  }

  println!("Interpreter:");
  match &info.host {
    Some(host) => {
      print_stat("Command", &host.python.command_line());
      print_stat("Version", &host.version());
      print_stat("Build tag", &host.build_tag());
      print_stat("Include", &host.include_dir.display().to_string());
      print_stat("Module", &host.module_path(&info.layout).display().to_string());
    }
    None => print_stat("Command", &env.python_command().command_line()),
  }

  println!("Project:");
  print_stat("Root", &info.layout.root.display().to_string());
  print_stat("Core sources", &info.layout.core_source_dir.display().to_string());
  print_stat("Probe source", &info.layout.charmonizer_c.display().to_string());
  print_stat("Build dir", &info.layout.build_dir.display().to_string());

  Ok(0)
}
