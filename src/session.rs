// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/session.rs - 会话状态
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

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  input::{DEFAULT_CUSTOM_TEXT, DetectionInput, InputParseError, Selection, UnknownSelection, compose},
  model::{InferenceResult, InvokeError, Model},
};

/// 最近一次运行的失败原因
#[derive(Error, Debug)]
pub enum Failure {
  #[error(transparent)]
  Input(#[from] InputParseError),
  #[error(transparent)]
  Invoke(#[from] InvokeError),
}

impl Failure {
  pub fn kind(&self) -> &'static str {
    match self {
      Failure::Input(_) => "invalid_input",
      Failure::Invoke(err) => err.kind(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
  pub result: InferenceResult,
  pub completed_at: DateTime<Local>,
}

/// 调用方持有的会话状态。
///
/// `last_result` 启动时为空，仅在调用成功时整体替换；失败时保留上一次的结果，
/// 由渲染端标注为旧结果。
#[derive(Debug)]
pub struct Session {
  executable: PathBuf,
  selection: Selection,
  custom_text: String,
  last_result: Option<Completed>,
  last_failure: Option<Failure>,
}

impl Session {
  pub fn new(executable: impl Into<PathBuf>) -> Self {
    Self {
      executable: executable.into(),
      selection: Selection::default(),
      custom_text: DEFAULT_CUSTOM_TEXT.to_string(),
      last_result: None,
      last_failure: None,
    }
  }

  pub fn with_selection(mut self, selection: Selection) -> Self {
    self.select(selection);
    self
  }

  pub fn executable(&self) -> &Path {
    &self.executable
  }

  pub fn set_executable(&mut self, executable: impl Into<PathBuf>) {
    self.executable = executable.into();
    info!("推理程序路径更新为: {}", self.executable.display());
  }

  pub fn selection(&self) -> &Selection {
    &self.selection
  }

  pub fn select(&mut self, selection: Selection) {
    if let Selection::Custom(text) = &selection {
      self.custom_text = text.clone();
    }
    self.selection = selection;
  }

  /// 按键选择场景，`custom` 沿用当前的自定义文本
  pub fn select_key(&mut self, key: &str) -> Result<(), UnknownSelection> {
    let selection = Selection::from_key(key, &self.custom_text)?;
    self.select(selection);
    Ok(())
  }

  pub fn custom_text(&self) -> &str {
    &self.custom_text
  }

  pub fn set_custom_text(&mut self, text: impl Into<String>) {
    self.select(Selection::Custom(text.into()));
  }

  /// 当前选择对应的输入，每次重新构造
  pub fn composed(&self) -> Result<DetectionInput, InputParseError> {
    compose(&self.selection)
  }

  pub fn last_result(&self) -> Option<&Completed> {
    self.last_result.as_ref()
  }

  pub fn last_failure(&self) -> Option<&Failure> {
    self.last_failure.as_ref()
  }

  /// 显示的结果是否来自更早的一次运行
  pub fn is_stale(&self) -> bool {
    self.last_result.is_some() && self.last_failure.is_some()
  }

  /// 构造输入并调用一次推理程序；输入无效时不会调用
  pub fn run<M>(&mut self, model: &M) -> Result<&InferenceResult, &Failure>
  where
    M: Model<Input = DetectionInput, Output = InferenceResult, Error = InvokeError>,
  {
    let outcome = match self.composed() {
      Ok(input) => model
        .infer(&self.executable, &input)
        .map_err(Failure::from),
      Err(err) => Err(Failure::from(err)),
    };
    self.record(outcome)
  }

  pub fn record(
    &mut self,
    outcome: Result<InferenceResult, Failure>,
  ) -> Result<&InferenceResult, &Failure> {
    match outcome {
      Ok(result) => {
        info!("分析完成: {}", result.summary);
        self.last_failure = None;
        let completed = self.last_result.insert(Completed {
          result,
          completed_at: Local::now(),
        });
        Ok(&completed.result)
      }
      Err(failure) => {
        warn!("运行失败 ({}): {}", failure.kind(), failure);
        Err(self.last_failure.insert(failure))
      }
    }
  }
}
