// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/main.rs - 交互式前端主程序
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
  io::{BufRead, IsTerminal, Write},
  thread,
  time::Duration,
};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use reasoner::{
  args::ReasonerArgs,
  model::Reasoner,
  task::{Action, InteractiveTask, Task},
  utils::init_tracing,
};

/// Semantic Reasoner 交互式前端
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub reasoner: ReasonerArgs,

  /// 启动后立即运行一次推理
  #[arg(long)]
  pub run: bool,
}

const PROMPT: &str = "reasoner> ";

fn read_actions() -> impl Iterator<Item = Action> {
  let stdin = std::io::stdin();
  let interactive = stdin.is_terminal();
  let mut lines = stdin.lock().lines();

  std::iter::from_fn(move || {
    if interactive {
      let mut stderr = std::io::stderr();
      let _ = write!(stderr, "{}", PROMPT);
      let _ = stderr.flush();
    }
    Action::from_line(lines.next()?)
  })
}

fn main() -> Result<()> {
  init_tracing();

  let args = Args::parse();

  let mut session = args.reasoner.session();
  let output = args.reasoner.output()?;
  let model = Reasoner::new();

  info!("推理程序路径: {}", session.executable().display());
  info!("输入场景: {}", session.selection().key());
  info!("输出方式: {}", args.reasoner.output);

  let (tx, rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(2));
      warn!("强制退出程序");
      std::process::exit(130);
    });
  })?;

  let startup = args.run.then_some(Action::Run);
  let actions = startup.into_iter().chain(read_actions());

  InteractiveTask::new(actions)
    .with_interrupt(rx)
    .run_task(&mut session, &model, &output)
}
