// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/model.rs - 外部推理程序调用
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

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::input::DetectionInput;

mod extract;
mod launcher;

pub use self::extract::{BalancedObjects, extract_object, json_span};
pub use self::launcher::{Captured, Launcher, SystemLauncher};

/// 推理程序的预测参数
pub const PREDICT_FLAG: &str = "--predict";

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, executable: &Path, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 推理程序返回的结果，缺失或类型不符的字段取空值
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InferenceResult {
  pub summary: String,
  pub ttft_ms: f64,
  pub tps: f64,
}

impl From<&Map<String, Value>> for InferenceResult {
  fn from(map: &Map<String, Value>) -> Self {
    InferenceResult {
      summary: map
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string(),
      ttft_ms: map.get("ttft_ms").and_then(Value::as_f64).unwrap_or_default(),
      tps: map.get("tps").and_then(Value::as_f64).unwrap_or_default(),
    }
  }
}

#[derive(Error, Debug)]
pub enum InvokeError {
  #[error("Executable not found at: {}", path.display())]
  ExecutableNotFound { path: PathBuf },
  #[error("{}", describe_exit(*code))]
  ProcessFailed { code: Option<i32>, stderr: String },
  #[error("Failed to parse output from reasoner backend.")]
  OutputUnparseable { raw: String },
  #[error("无法启动推理程序: {0}")]
  Launch(#[from] std::io::Error),
}

fn describe_exit(code: Option<i32>) -> String {
  match code {
    Some(code) => format!("Execution failed with code {}", code),
    None => "Execution terminated by signal".to_string(),
  }
}

impl InvokeError {
  /// 机器可读的错误类别
  pub fn kind(&self) -> &'static str {
    match self {
      InvokeError::ExecutableNotFound { .. } => "executable_not_found",
      InvokeError::ProcessFailed { .. } => "process_failed",
      InvokeError::OutputUnparseable { .. } => "output_unparseable",
      InvokeError::Launch(_) => "launch_failed",
    }
  }
}

/// 一次调用的结果：成功，或者某一种失败
pub type InvocationOutcome = Result<InferenceResult, InvokeError>;

/// 以一次性子进程的方式运行推理程序
#[derive(Debug, Clone, Default)]
pub struct Reasoner<L = SystemLauncher> {
  launcher: L,
}

impl Reasoner<SystemLauncher> {
  pub fn new() -> Self {
    Self::default()
  }
}

impl<L: Launcher> Reasoner<L> {
  pub fn with_launcher(launcher: L) -> Self {
    Self { launcher }
  }

  pub fn invoke(&self, executable: &Path, input: &DetectionInput) -> InvocationOutcome {
    if !executable.exists() {
      error!("推理程序不存在: {}", executable.display());
      return Err(InvokeError::ExecutableNotFound {
        path: executable.to_path_buf(),
      });
    }

    let argument = input.to_argument();
    info!("调用推理程序: {} {} {}", executable.display(), PREDICT_FLAG, argument);

    let now = std::time::Instant::now();
    let captured = self.launcher.launch(executable, &[PREDICT_FLAG, argument.as_str()])?;
    let elapsed = now.elapsed();
    info!("推理程序退出，退出码: {:?}，耗时: {:.2?}", captured.code, elapsed);

    if !captured.success {
      warn!("推理程序执行失败: {}", captured.stderr.trim_end());
      return Err(InvokeError::ProcessFailed {
        code: captured.code,
        stderr: captured.stderr,
      });
    }

    debug!("推理程序输出: {}", captured.stdout);
    match extract_object(&captured.stdout) {
      Some(map) => Ok(InferenceResult::from(&map)),
      None => {
        warn!("无法从输出中解析 JSON");
        Err(InvokeError::OutputUnparseable {
          raw: captured.stdout,
        })
      }
    }
  }
}

impl<L: Launcher> Model for Reasoner<L> {
  type Input = DetectionInput;
  type Output = InferenceResult;
  type Error = InvokeError;

  fn infer(&self, executable: &Path, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.invoke(executable, input)
  }
}

/// 使用系统进程调用推理程序
pub fn invoke(executable: &Path, input: &DetectionInput) -> InvocationOutcome {
  Reasoner::new().invoke(executable, input)
}


#[cfg(test)]
mod tests {
  use std::io;

  use tempfile::NamedTempFile;

  use super::stub::StubLauncher;
  use super::*;
  use crate::input::Preset;

  const LOGGED_OUTPUT: &str = "init...\n{\"summary\":\"ok\",\"ttft_ms\":12.5,\"tps\":45.2}\ndone";

  fn run(reply: Captured) -> (InvocationOutcome, StubLauncher) {
    let executable = NamedTempFile::new().unwrap();
    let launcher = StubLauncher::replying(reply);
    let outcome = Reasoner::with_launcher(&launcher).invoke(executable.path(), &Preset::TireBulge.record());
    (outcome, launcher)
  }

  #[test]
  fn missing_executable_spawns_nothing() {
    let launcher = StubLauncher::replying(Captured::exited(0, LOGGED_OUTPUT, ""));
    let outcome = Reasoner::with_launcher(&launcher).invoke(
      Path::new("/definitely/not/here/SemanticReasoner"),
      &Preset::TireBulge.record(),
    );

    match outcome {
      Err(InvokeError::ExecutableNotFound { path }) => {
        assert_eq!(path, PathBuf::from("/definitely/not/here/SemanticReasoner"))
      }
      other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(launcher.call_count(), 0);
  }

  #[test]
  fn passes_predict_flag_and_compact_json_as_one_argument() {
    let (_, launcher) = run(Captured::exited(0, LOGGED_OUTPUT, ""));
    let calls = launcher.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(
      calls[0],
      vec![
        "--predict".to_string(),
        r#"{"detected_object":"tire_sidewall","defect":"bulge","confidence":0.95,"severity_score":8}"#
          .to_string(),
      ]
    );
  }

  #[test]
  fn tolerates_log_lines_around_the_result() {
    let (outcome, _) = run(Captured::exited(0, LOGGED_OUTPUT, ""));
    let result = outcome.unwrap();
    assert_eq!(result.summary, "ok");
    assert_eq!(result.ttft_ms, 12.5);
    assert_eq!(result.tps, 45.2);
  }

  #[test]
  fn output_without_json_is_unparseable() {
    let (outcome, _) = run(Captured::exited(0, "no json here", ""));
    match outcome {
      Err(InvokeError::OutputUnparseable { raw }) => assert_eq!(raw, "no json here"),
      other => panic!("unexpected outcome: {other:?}"),
    }
  }

  #[test]
  fn broken_json_is_unparseable_with_raw_text() {
    let (outcome, _) = run(Captured::exited(0, "{\"summary\": }", ""));
    match outcome {
      Err(InvokeError::OutputUnparseable { raw }) => assert_eq!(raw, "{\"summary\": }"),
      other => panic!("unexpected outcome: {other:?}"),
    }
  }

  #[test]
  fn nonzero_exit_ignores_stdout() {
    let (outcome, _) = run(Captured::exited(2, LOGGED_OUTPUT, "boom"));
    let err = outcome.unwrap_err();
    assert_eq!(err.to_string(), "Execution failed with code 2");
    match err {
      InvokeError::ProcessFailed { code, stderr } => {
        assert_eq!(code, Some(2));
        assert_eq!(stderr, "boom");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn signal_termination_has_no_code() {
    let (outcome, _) = run(Captured {
      code: None,
      success: false,
      stdout: String::new(),
      stderr: String::new(),
    });
    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), "process_failed");
    assert_eq!(err.to_string(), "Execution terminated by signal");
  }

  #[test]
  fn launch_errors_are_generic_failures() {
    let executable = NamedTempFile::new().unwrap();
    let launcher = StubLauncher::failing(io::ErrorKind::PermissionDenied);
    let outcome = Reasoner::with_launcher(&launcher).invoke(executable.path(), &Preset::TireBulge.record());
    assert!(matches!(outcome, Err(InvokeError::Launch(_))));
  }

  #[test]
  fn missing_fields_take_neutral_values() {
    let (outcome, _) = run(Captured::exited(0, r#"{"summary": 3, "extra": true}"#, ""));
    assert_eq!(outcome.unwrap(), InferenceResult::default());
  }

  #[test]
  fn repeated_invocations_are_identical() {
    let executable = NamedTempFile::new().unwrap();
    let launcher = StubLauncher::replying(Captured::exited(0, LOGGED_OUTPUT, ""));
    let reasoner = Reasoner::with_launcher(&launcher);
    let input = Preset::WindshieldCrack.record();

    let first = reasoner.infer(executable.path(), &input).unwrap();
    let second = reasoner.infer(executable.path(), &input).unwrap();
    assert_eq!(first, second);
    assert_eq!(launcher.call_count(), 2);
  }
}
