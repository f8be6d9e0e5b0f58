// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/output/json.rs - JSON 输出
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

use std::io::Write;

use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::InvokeError,
  output::Render,
  session::{Failure, Session},
};

#[derive(Error, Debug)]
pub enum JsonOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 每次渲染输出一个 JSON 文档，供脚本使用
#[derive(Debug, Clone, Default)]
pub struct JsonOutput {
  pretty: bool,
}

impl FromUrlWithScheme for JsonOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonOutput {
  type Error = JsonOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonOutputError::SchemeMismatch(url.scheme().to_string()));
    }

    let pretty = url.query_pairs().any(|(k, _)| k == "pretty");
    Ok(JsonOutput { pretty })
  }
}

fn failure_document(failure: &Failure) -> Value {
  let mut doc = json!({
    "kind": failure.kind(),
    "message": failure.to_string(),
  });
  match failure {
    Failure::Invoke(InvokeError::ProcessFailed { code, stderr }) => {
      doc["code"] = json!(code);
      doc["stderr"] = json!(stderr);
    }
    Failure::Invoke(InvokeError::OutputUnparseable { raw }) => {
      doc["raw"] = json!(raw);
    }
    Failure::Input(err) => {
      doc["raw"] = json!(err.raw());
    }
    _ => {}
  }
  doc
}

impl JsonOutput {
  pub fn document(&self, session: &Session) -> Value {
    let input = session.composed().ok();
    let result = session.last_result().map(|c| &c.result);
    let completed_at = session.last_result().map(|c| c.completed_at.to_rfc3339());
    let error = session.last_failure().map(failure_document);

    json!({
      "executable": session.executable().display().to_string(),
      "scenario": session.selection().key(),
      "input": input,
      "result": result,
      "completed_at": completed_at,
      "stale": session.is_stale(),
      "error": error,
    })
  }

  fn write(&self, value: &Value) -> Result<(), JsonOutputError> {
    let text = if self.pretty {
      serde_json::to_string_pretty(value)?
    } else {
      serde_json::to_string(value)?
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
  }
}

impl Render<Session> for JsonOutput {
  type Error = JsonOutputError;

  fn render_result(&self, state: &Session) -> Result<(), Self::Error> {
    self.write(&self.document(state))
  }

  fn render_notice(&self, message: &str) -> Result<(), Self::Error> {
    self.write(&json!({ "notice": message }))
  }
}
