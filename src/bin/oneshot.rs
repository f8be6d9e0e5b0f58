// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/bin/oneshot.rs - 单次推理
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use reasoner::{
  args::ReasonerArgs,
  model::Reasoner,
  task::{OneShotTask, Task},
  utils::init_tracing,
};

/// 运行一次推理并输出结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub reasoner: ReasonerArgs,
}

fn main() -> Result<()> {
  init_tracing();

  let args = Args::parse();

  let mut session = args.reasoner.session();
  let output = args.reasoner.output()?;

  info!("推理程序路径: {}", session.executable().display());
  info!("输入场景: {}", session.selection().key());
  info!("输出方式: {}", args.reasoner.output);

  OneShotTask.run_task(&mut session, &Reasoner::new(), &output)
}
