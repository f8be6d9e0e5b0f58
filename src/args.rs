// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/args.rs - 公共参数配置
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

use std::path::PathBuf;

use clap::Args;
use url::Url;

use crate::{
  FromUrl,
  input::{Preset, Selection},
  locate::{DEFAULT_EXECUTABLE_NAME, Locator, resolve_executable},
  output::{OutputError, OutputWrapper},
  session::Session,
};

/// 各个程序共用的参数
#[derive(Args, Debug, Clone)]
pub struct ReasonerArgs {
  /// 推理程序路径，不指定时在常见构建目录中自动探测
  #[arg(long, env = "REASONER_EXECUTABLE", value_name = "FILE")]
  pub executable: Option<PathBuf>,

  /// 自动探测时查找的程序名
  #[arg(long, default_value = DEFAULT_EXECUTABLE_NAME, value_name = "NAME")]
  pub name: String,

  /// 自动探测的搜索根目录
  #[arg(long, default_value = ".", value_name = "DIR")]
  pub search_root: PathBuf,

  /// 预置的检测场景
  #[arg(long, value_enum, default_value_t = Preset::TireBulge)]
  pub scenario: Preset,

  /// 自定义 JSON 输入，指定后忽略 --scenario
  #[arg(long, value_name = "JSON")]
  pub custom: Option<String>,

  /// 输出方式
  /// 支持格式:
  /// - 终端双栏: console: 或 console:?width=120
  /// - JSON: json: 或 json:?pretty
  #[arg(long, default_value = "console:", value_name = "OUTPUT")]
  pub output: Url,
}

impl ReasonerArgs {
  pub fn executable(&self) -> PathBuf {
    let locator = Locator::new(&self.search_root, &self.name);
    resolve_executable(self.executable.as_deref(), &locator)
  }

  pub fn selection(&self) -> Selection {
    match &self.custom {
      Some(text) => Selection::Custom(text.clone()),
      None => Selection::Preset(self.scenario),
    }
  }

  pub fn session(&self) -> Session {
    Session::new(self.executable()).with_selection(self.selection())
  }

  pub fn output(&self) -> Result<OutputWrapper, OutputError> {
    OutputWrapper::from_url(&self.output)
  }
}
