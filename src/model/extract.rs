// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/model/extract.rs - 从标准输出中提取 JSON 对象
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

use serde_json::{Map, Value};
use tracing::debug;

/// 第一个 `{` 到最后一个 `}`（含两端）之间的文本
pub fn json_span(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let end = text.rfind('}')?;
  (end > start).then(|| &text[start..=end])
}

/// 按起始位置遍历所有括号平衡的 `{...}` 片段，字符串内的括号不计入深度
pub struct BalancedObjects<'a> {
  text: &'a str,
  spans: std::vec::IntoIter<(usize, usize)>,
}

impl<'a> BalancedObjects<'a> {
  pub fn new(text: &'a str) -> Self {
    let mut spans = balanced_spans(text.as_bytes());
    spans.sort_unstable_by_key(|&(start, _)| start);
    Self {
      text,
      spans: spans.into_iter(),
    }
  }
}

impl<'a> Iterator for BalancedObjects<'a> {
  type Item = &'a str;

  fn next(&mut self) -> Option<Self::Item> {
    let (start, end) = self.spans.next()?;
    Some(&self.text[start..=end])
  }
}

// 单遍扫描，用栈配对括号。JSON 字符串不能跨行，遇到换行即结束字符串状态
fn balanced_spans(bytes: &[u8]) -> Vec<(usize, usize)> {
  let mut open = Vec::new();
  let mut spans = Vec::new();
  let mut in_string = false;
  let mut escaped = false;

  for (i, &b) in bytes.iter().enumerate() {
    if b == b'\n' {
      in_string = false;
      escaped = false;
      continue;
    }
    if in_string {
      match b {
        _ if escaped => escaped = false,
        b'\\' => escaped = true,
        b'"' => in_string = false,
        _ => {}
      }
      continue;
    }
    match b {
      b'"' => in_string = true,
      b'{' => open.push(i),
      b'}' => {
        if let Some(start) = open.pop() {
          spans.push((start, i));
        }
      }
      _ => {}
    }
  }
  spans
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
  match serde_json::from_str(candidate) {
    Ok(Value::Object(map)) => Some(map),
    _ => None,
  }
}

/// 从带有日志的输出中取出 JSON 对象。
///
/// 先按首尾括号位置截取；截取结果无法解析时，再逐个尝试括号平衡的片段，
/// 以容忍日志行中出现的括号。
pub fn extract_object(text: &str) -> Option<Map<String, Value>> {
  let span = json_span(text)?;
  if let Some(map) = parse_object(span) {
    return Some(map);
  }

  debug!("首尾截取的片段无法解析，尝试平衡括号扫描");
  BalancedObjects::new(text).find_map(parse_object)
}
