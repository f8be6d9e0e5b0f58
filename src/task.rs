// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/task.rs - 任务驱动
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
  path::PathBuf,
  sync::mpsc::Receiver,
  time::{Duration, Instant},
};

use tracing::{error, info, warn};

use crate::{
  input::{DetectionInput, Preset},
  model::{InferenceResult, InvokeError, Model},
  output::Render,
  session::Session,
};

pub trait Task<M, O>: Sized {
  type Error;
  fn run_task(self, session: &mut Session, model: &M, output: &O) -> Result<(), Self::Error>;
}

/// 运行一次并渲染结果
pub struct OneShotTask;

impl<RE, M, O> Task<M, O> for OneShotTask
where
  RE: std::error::Error + Sync + Send + 'static,
  M: Model<Input = DetectionInput, Output = InferenceResult, Error = InvokeError>,
  O: Render<Session, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, session: &mut Session, model: &M, output: &O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let now = Instant::now();
    let succeeded = session.run(model).is_ok();
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    output.render_result(session)?;

    if !succeeded && let Some(failure) = session.last_failure() {
      anyhow::bail!("运行失败: {}", failure);
    }
    Ok(())
  }
}

/// 用同一输入重复运行，统计平均延迟
pub struct RepeatShotTask {
  times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { times: 10 }
  }
}

impl RepeatShotTask {
  pub fn with_times(times: usize) -> Self {
    Self {
      times: times.max(1),
    }
  }
}

impl<RE, M, O> Task<M, O> for RepeatShotTask
where
  RE: std::error::Error + Sync + Send + 'static,
  M: Model<Input = DetectionInput, Output = InferenceResult, Error = InvokeError>,
  O: Render<Session, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, session: &mut Session, model: &M, output: &O) -> Result<(), Self::Error> {
    info!("开始任务，重复 {} 次...", self.times);
    let mut results: Vec<InferenceResult> = Vec::with_capacity(self.times);
    let mut elapsed = Vec::with_capacity(self.times);

    for i in 0..self.times {
      let now = Instant::now();
      match session.run(model) {
        Ok(result) => {
          info!(
            "({})推理完成，TTFT: {:.2} ms，TPS: {:.2} t/s，耗时: {:.2?}",
            i,
            result.ttft_ms,
            result.tps,
            now.elapsed()
          );
          results.push(result.clone());
        }
        Err(failure) => {
          let message = failure.to_string();
          output.render_result(session)?;
          anyhow::bail!("第 {} 次运行失败: {}", i + 1, message);
        }
      }
      elapsed.push(now.elapsed());
    }

    output.render_result(session)?;

    let count = results.len() as f64;
    warn!(
      "平均 TTFT: {:.2} ms，平均 TPS: {:.2} t/s，平均耗时: {:.2?}",
      results.iter().map(|r| r.ttft_ms).sum::<f64>() / count,
      results.iter().map(|r| r.tps).sum::<f64>() / count,
      elapsed.iter().sum::<Duration>() / elapsed.len() as u32
    );
    if results.windows(2).any(|pair| pair[0].summary != pair[1].summary) {
      warn!("多次运行得到的摘要不一致");
    }

    Ok(())
  }
}

pub const HELP: &str = "\
Commands:
  list              list the preset scenarios
  select <key>      select a preset, or `custom` for the custom JSON
  custom <json>     set the custom JSON input and select it
  path <file>       set the path to the reasoner executable
  run               run inference with the current input
  show              show the current state
  help              show this message
  quit              leave the session";

/// 交互会话中的一条指令
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
  List,
  Select(String),
  Custom(String),
  Path(PathBuf),
  Run,
  Show,
  Help,
  Quit,
  Empty,
  Unknown(String),
}

impl From<&str> for Action {
  fn from(line: &str) -> Self {
    let line = line.trim();
    if line.is_empty() {
      return Action::Empty;
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
      Some((command, rest)) => (command, rest.trim()),
      None => (line, ""),
    };

    match (command.to_ascii_lowercase().as_str(), rest.is_empty()) {
      ("list" | "ls", true) => Action::List,
      ("run" | "r", true) => Action::Run,
      ("show", true) => Action::Show,
      ("help" | "?", true) => Action::Help,
      ("quit" | "exit" | "q", true) => Action::Quit,
      ("select" | "use", false) => Action::Select(rest.to_string()),
      ("custom", true) => Action::Select("custom".to_string()),
      ("custom", false) => Action::Custom(rest.to_string()),
      ("path", false) => Action::Path(PathBuf::from(rest)),
      _ => Action::Unknown(line.to_string()),
    }
  }
}

impl Action {
  /// 读取到的一行输入；非 UTF-8 的行跳过，其他读取错误结束会话
  pub fn from_line(line: io::Result<String>) -> Option<Action> {
    match line {
      Ok(line) => Some(Action::from(line.as_str())),
      Err(err) if err.kind() == io::ErrorKind::InvalidData => {
        warn!("输入行不是有效的 UTF-8，已忽略: {}", err);
        Some(Action::Empty)
      }
      Err(err) => {
        error!("读取输入失败: {}", err);
        None
      }
    }
  }
}

fn preset_list() -> String {
  let mut text = String::from("Scenarios:");
  for preset in Preset::ALL {
    text.push_str(&format!(
      "\n  {:<18} {} - {}",
      preset.key(),
      preset.title(),
      preset.description()
    ));
  }
  text.push_str("\n  custom             Custom JSON input");
  text
}

/// 逐条执行指令的交互会话，收到中断信号或 `quit` 时退出
pub struct InteractiveTask<A> {
  actions: A,
  interrupt: Option<Receiver<()>>,
}

impl<A: Iterator<Item = Action>> InteractiveTask<A> {
  pub fn new(actions: A) -> Self {
    Self {
      actions,
      interrupt: None,
    }
  }

  pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  fn interrupted(&self) -> bool {
    self
      .interrupt
      .as_ref()
      .map(|rx| rx.try_recv().is_ok())
      .unwrap_or(false)
  }
}

impl<A, RE, M, O> Task<M, O> for InteractiveTask<A>
where
  A: Iterator<Item = Action>,
  RE: std::error::Error + Sync + Send + 'static,
  M: Model<Input = DetectionInput, Output = InferenceResult, Error = InvokeError>,
  O: Render<Session, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(mut self, session: &mut Session, model: &M, output: &O) -> Result<(), Self::Error> {
    info!("开始交互会话...");
    output.render_notice(HELP)?;
    output.render_result(session)?;

    let mut runs = 0usize;
    while let Some(action) = self.actions.next() {
      if self.interrupted() {
        warn!("中断信号接收，退出会话");
        break;
      }

      match action {
        Action::Empty => {}
        Action::Help => output.render_notice(HELP)?,
        Action::List => output.render_notice(&preset_list())?,
        Action::Show => output.render_result(session)?,
        Action::Select(key) => match session.select_key(&key) {
          Ok(()) => output.render_result(session)?,
          Err(err) => output.render_notice(&format!("Unknown scenario `{}`, try `list`.", err.0))?,
        },
        Action::Custom(text) => {
          session.set_custom_text(text);
          output.render_result(session)?;
        }
        Action::Path(path) => {
          session.set_executable(path);
          output.render_result(session)?;
        }
        Action::Run => {
          runs += 1;
          let now = Instant::now();
          let _ = session.run(model);
          info!("({})运行结束，耗时: {:.2?}", runs, now.elapsed());
          output.render_result(session)?;
        }
        Action::Quit => break,
        Action::Unknown(line) => {
          output.render_notice(&format!("Unknown command `{}`, type `help` for commands.", line))?
        }
      }
    }

    info!("会话结束，共运行 {} 次", runs);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, convert::Infallible, sync::mpsc};

  use tempfile::NamedTempFile;

  use super::*;
  use crate::model::{Captured, Reasoner, stub::StubLauncher};

  const OUTPUT: &str = "loading...\n{\"summary\":\"ok\",\"ttft_ms\":1.5,\"tps\":9.0}";

  #[derive(Default)]
  struct RecordingOutput {
    screens: RefCell<Vec<(String, bool, Option<&'static str>)>>,
    notices: RefCell<Vec<String>>,
  }

  impl Render<Session> for RecordingOutput {
    type Error = Infallible;

    fn render_result(&self, state: &Session) -> Result<(), Self::Error> {
      self.screens.borrow_mut().push((
        state.selection().key().to_string(),
        state.last_result().is_some(),
        state.last_failure().map(|f| f.kind()),
      ));
      Ok(())
    }

    fn render_notice(&self, message: &str) -> Result<(), Self::Error> {
      self.notices.borrow_mut().push(message.to_string());
      Ok(())
    }
  }

  #[test]
  fn unreadable_lines_are_skipped() {
    let reader = io::Cursor::new(b"list\n\xff\xfe\nrun\n".to_vec());
    let actions: Vec<_> = io::BufRead::lines(reader).map_while(Action::from_line).collect();
    assert_eq!(actions, vec![Action::List, Action::Empty, Action::Run]);
  }

  #[test]
  fn read_failures_end_the_session() {
    let err = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
    assert_eq!(Action::from_line(Err(err)), None);
  }

  #[test]
  fn parses_actions() {
    assert_eq!(Action::from("  run "), Action::Run);
    assert_eq!(Action::from("LIST"), Action::List);
    assert_eq!(Action::from(""), Action::Empty);
    assert_eq!(
      Action::from("select paint-scratch"),
      Action::Select("paint-scratch".to_string())
    );
    assert_eq!(Action::from("custom"), Action::Select("custom".to_string()));
    assert_eq!(
      Action::from(r#"custom {"a": 1, "b": "two words"}"#),
      Action::Custom(r#"{"a": 1, "b": "two words"}"#.to_string())
    );
    assert_eq!(
      Action::from("path build/Release/SemanticReasoner.exe"),
      Action::Path(PathBuf::from("build/Release/SemanticReasoner.exe"))
    );
    assert_eq!(Action::from("select"), Action::Unknown("select".to_string()));
    assert_eq!(Action::from("run now"), Action::Unknown("run now".to_string()));
  }

  #[test]
  fn oneshot_renders_and_reports_failure() {
    let executable = NamedTempFile::new().unwrap();
    let ok = StubLauncher::replying(Captured::exited(0, OUTPUT, ""));
    let output = RecordingOutput::default();

    let mut session = Session::new(executable.path());
    OneShotTask
      .run_task(&mut session, &Reasoner::with_launcher(&ok), &output)
      .unwrap();
    assert_eq!(output.screens.borrow().len(), 1);

    let broken = StubLauncher::replying(Captured::exited(2, "", "boom"));
    let err = OneShotTask
      .run_task(&mut session, &Reasoner::with_launcher(&broken), &output)
      .unwrap_err();
    assert!(err.to_string().contains("Execution failed with code 2"));
    assert_eq!(output.screens.borrow().len(), 2);
  }

  #[test]
  fn repeatshot_runs_the_requested_times() {
    let executable = NamedTempFile::new().unwrap();
    let launcher = StubLauncher::replying(Captured::exited(0, OUTPUT, ""));
    let output = RecordingOutput::default();

    let mut session = Session::new(executable.path());
    RepeatShotTask::with_times(3)
      .run_task(&mut session, &Reasoner::with_launcher(&launcher), &output)
      .unwrap();
    assert_eq!(launcher.call_count(), 3);
    assert_eq!(session.last_result().unwrap().result.summary, "ok");
  }

  #[test]
  fn repeatshot_stops_at_first_failure() {
    let launcher = StubLauncher::replying(Captured::exited(0, OUTPUT, ""));
    let output = RecordingOutput::default();

    let mut session = Session::new("/no/such/reasoner");
    let err = RepeatShotTask::with_times(5)
      .run_task(&mut session, &Reasoner::with_launcher(&launcher), &output)
      .unwrap_err();
    assert!(err.to_string().contains("Executable not found"));
    assert_eq!(launcher.call_count(), 0);
  }

  #[test]
  fn interactive_session_follows_actions_until_quit() {
    let executable = NamedTempFile::new().unwrap();
    let launcher = StubLauncher::replying(Captured::exited(0, OUTPUT, ""));
    let output = RecordingOutput::default();
    let actions = vec![
      Action::from("select paint-scratch"),
      Action::from("run"),
      Action::from("custom {bad}"),
      Action::from("run"),
      Action::from("select hubcap"),
      Action::from("dance"),
      Action::from("quit"),
      Action::from("run"),
    ];

    let mut session = Session::new(executable.path());
    InteractiveTask::new(actions.into_iter())
      .run_task(&mut session, &Reasoner::with_launcher(&launcher), &output)
      .unwrap();

    assert_eq!(launcher.call_count(), 1);
    assert!(session.last_result().is_some());
    assert_eq!(session.last_failure().map(|f| f.kind()), Some("invalid_input"));

    let screens = output.screens.borrow();
    assert_eq!(screens[0], ("tire-bulge".to_string(), false, None));
    assert_eq!(screens[2], ("paint-scratch".to_string(), true, None));
    assert_eq!(
      screens.last().unwrap(),
      &("custom".to_string(), true, Some("invalid_input"))
    );

    let notices = output.notices.borrow();
    assert!(notices.iter().any(|n| n.contains("Unknown scenario `hubcap`")));
    assert!(notices.iter().any(|n| n.contains("Unknown command `dance`")));
  }

  #[test]
  fn interactive_session_stops_on_interrupt() {
    let launcher = StubLauncher::replying(Captured::exited(0, OUTPUT, ""));
    let output = RecordingOutput::default();
    let (tx, rx) = mpsc::channel();
    tx.send(()).unwrap();

    let mut session = Session::new("reasoner");
    InteractiveTask::new(vec![Action::Run, Action::Run].into_iter())
      .with_interrupt(rx)
      .run_task(&mut session, &Reasoner::with_launcher(&launcher), &output)
      .unwrap();

    assert_eq!(launcher.call_count(), 0);
    assert!(session.last_failure().is_none());
  }

  #[test]
  fn preset_list_names_every_key() {
    let list = preset_list();
    for preset in Preset::ALL {
      assert!(list.contains(preset.key()));
    }
    assert!(list.contains("custom"));
  }
}
