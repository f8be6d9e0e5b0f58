// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/output/console.rs - 终端双栏输出
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

use tabled::{
  builder::Builder,
  settings::{Padding, Style, Width, object::Columns},
};
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::InvokeError,
  output::Render,
  session::{Failure, Session},
};

const DEFAULT_WIDTH: usize = 100;
const MIN_WIDTH: usize = 40;
const MAX_WIDTH: usize = 400;
// 两栏之间的 " | "
const SEPARATOR_WIDTH: usize = 3;

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的宽度参数: {0}")]
  InvalidWidth(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 左栏显示输入，右栏显示推理结果，错误信息显示在下方
#[derive(Debug, Clone)]
pub struct ConsoleOutput {
  width: usize,
}

impl Default for ConsoleOutput {
  fn default() -> Self {
    Self {
      width: DEFAULT_WIDTH,
    }
  }
}

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ConsoleOutputError::SchemeMismatch(url.scheme().to_string()));
    }

    let mut output = ConsoleOutput::default();
    for (k, v) in url.query_pairs() {
      if k == "width" {
        output.width = v
          .parse::<usize>()
          .map_err(|_| ConsoleOutputError::InvalidWidth(v.to_string()))?
          .clamp(MIN_WIDTH, MAX_WIDTH);
      }
    }
    Ok(output)
  }
}

impl ConsoleOutput {
  pub fn with_width(width: usize) -> Self {
    Self {
      width: width.clamp(MIN_WIDTH, MAX_WIDTH),
    }
  }

  fn pane_width(&self) -> usize {
    (self.width - SEPARATOR_WIDTH) / 2
  }

  fn input_pane(&self, session: &Session) -> Vec<String> {
    let mut lines = vec![
      "Computer Vision Input".to_string(),
      "Simulated Detector Output".to_string(),
      format!(
        "Scenario: {} ({})",
        session.selection().title(),
        session.selection().key()
      ),
      String::new(),
    ];
    match session.composed() {
      Ok(input) => lines.push(format!("{:#}", input)),
      Err(err) => lines.push(err.to_string()),
    }
    lines
  }

  fn result_pane(&self, session: &Session) -> Vec<String> {
    let mut lines = vec!["Semantic Reasoner Output".to_string(), String::new()];

    let Some(completed) = session.last_result() else {
      lines.push("Waiting for analysis...".to_string());
      return lines;
    };

    let time = completed.completed_at.format("%H:%M:%S");
    if session.is_stale() {
      lines.push(format!("Analysis Complete (previous run at {})", time));
    } else {
      lines.push(format!("Analysis Complete at {}", time));
    }
    lines.push(String::new());

    lines.push("Technician Summary".to_string());
    let summary = if completed.result.summary.is_empty() {
      "No summary provided"
    } else {
      completed.result.summary.as_str()
    };
    lines.push(format!("> {}", summary));
    lines.push(String::new());

    lines.push("Performance Metrics (CPU)".to_string());
    lines.push(format!(
      "Time To First Token: {:.2} ms",
      completed.result.ttft_ms
    ));
    lines.push(format!("Tokens Per Second: {:.2} t/s", completed.result.tps));
    lines
  }

  fn failure_block(&self, session: &Session) -> Vec<String> {
    let Some(failure) = session.last_failure() else {
      return Vec::new();
    };

    let mut lines = vec![format!("[{}]", failure.kind())];
    let err = match failure {
      Failure::Input(err) => {
        lines.push(err.to_string());
        return lines;
      }
      Failure::Invoke(err) => err,
    };

    match err {
      InvokeError::ExecutableNotFound { .. } => {
        lines.push(err.to_string());
        lines.push(
          "Please build the reasoner project first, or set the path with `path <file>`.".to_string(),
        );
      }
      InvokeError::ProcessFailed { stderr, .. } => {
        lines.push(err.to_string());
        lines.push("Stderr:".to_string());
        lines.extend(stderr.lines().map(str::to_string));
      }
      InvokeError::OutputUnparseable { raw } => {
        lines.push(err.to_string());
        lines.push("Raw Output:".to_string());
        lines.extend(raw.lines().map(str::to_string));
      }
      InvokeError::Launch(source) => lines.push(format!("Error: {}", source)),
    }
    lines
  }

  /// 生成整屏文本
  pub fn format_session(&self, session: &Session) -> String {
    let rule = "=".repeat(self.width);
    let pane_width = self.pane_width();
    let mut out = Vec::new();

    out.push(rule.clone());
    out.push("Edge AI Semantic Reasoner".to_string());
    out.push("Powered by bitnet.cpp (1-bit LLM) on CPU".to_string());
    out.push(format!("Executable: {}", session.executable().display()));
    out.push(rule.clone());

    let mut builder = Builder::default();
    builder.push_record([
      self.input_pane(session).join("\n"),
      self.result_pane(session).join("\n"),
    ]);
    let mut panes = builder.build();
    panes
      .with(Style::empty().vertical('|'))
      .modify(Columns::new(..), Width::wrap(pane_width))
      .modify(Columns::single(0), Padding::new(0, 1, 0, 0))
      .modify(Columns::single(1), Padding::new(1, 0, 0, 0));
    out.extend(panes.to_string().lines().map(|l| l.trim_end().to_string()));

    let failure = self.failure_block(session);
    if !failure.is_empty() {
      out.push("-".repeat(self.width));
      out.extend(failure);
    }
    out.push(rule);

    out.join("\n")
  }
}

impl Render<Session> for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn render_result(&self, state: &Session) -> Result<(), Self::Error> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", self.format_session(state))?;
    stdout.flush()?;
    Ok(())
  }

  fn render_notice(&self, message: &str) -> Result<(), Self::Error> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", message)?;
    stdout.flush()?;
    Ok(())
  }
}
