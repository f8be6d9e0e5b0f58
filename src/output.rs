// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/output.rs - 输出定义
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, session::Session};

pub trait Render<State>: Sized {
  type Error;
  fn render_result(&self, state: &State) -> Result<(), Self::Error>;
  fn render_notice(&self, message: &str) -> Result<(), Self::Error>;
}

mod console;
pub use self::console::{ConsoleOutput, ConsoleOutputError};

mod json;
pub use self::json::{JsonOutput, JsonOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("终端输出错误: {0}")]
  ConsoleOutputError(#[from] ConsoleOutputError),
  #[error("JSON 输出错误: {0}")]
  JsonOutputError(#[from] JsonOutputError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  Console(ConsoleOutput),
  Json(JsonOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ConsoleOutput::SCHEME => Ok(OutputWrapper::Console(ConsoleOutput::from_url(url)?)),
      JsonOutput::SCHEME => Ok(OutputWrapper::Json(JsonOutput::from_url(url)?)),
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render<Session> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, state: &Session) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Console(output) => output.render_result(state).map_err(OutputError::from),
      OutputWrapper::Json(output) => output.render_result(state).map_err(OutputError::from),
    }
  }

  fn render_notice(&self, message: &str) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Console(output) => output.render_notice(message).map_err(OutputError::from),
      OutputWrapper::Json(output) => output.render_notice(message).map_err(OutputError::from),
    }
  }
}
