// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/model/launcher.rs - 子进程启动
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  io,
  path::{Path, PathBuf},
  process::{Command, Stdio},
};

use tracing::debug;

/// 一次进程执行捕获到的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
  /// 退出码，被信号终止时为 `None`
  pub code: Option<i32>,
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
}

impl Captured {
  pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
    Self {
      code: Some(code),
      success: code == 0,
      stdout: stdout.into(),
      stderr: stderr.into(),
    }
  }
}

pub trait Launcher {
  /// 同步运行程序直到退出，参数按数组原样传递，不经过 shell
  fn launch(&self, program: &Path, args: &[&str]) -> io::Result<Captured>;
}

impl<L: Launcher + ?Sized> Launcher for &L {
  fn launch(&self, program: &Path, args: &[&str]) -> io::Result<Captured> {
    (**self).launch(program, args)
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
  fn launch(&self, program: &Path, args: &[&str]) -> io::Result<Captured> {
    let program = runnable_path(program);
    debug!("启动进程: {}", program.display());

    let output = Command::new(&program)
      .args(args)
      .stdin(Stdio::null())
      .output()?;

    Ok(Captured {
      code: output.status.code(),
      success: output.status.success(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }
}

// 单独的文件名会被当作 PATH 中的命令查找，这里固定为相对当前目录
fn runnable_path(program: &Path) -> PathBuf {
  if program.is_relative() && program.components().count() == 1 {
    Path::new(".").join(program)
  } else {
    program.to_path_buf()
  }
}
