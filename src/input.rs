// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/input.rs - 检测输入构造
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

use std::{fmt, str::FromStr};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error};

/// 选择自定义输入时使用的键
pub const CUSTOM_KEY: &str = "custom";

/// 自定义输入的初始文本
pub const DEFAULT_CUSTOM_TEXT: &str =
  r#"{"detected_object": "unknown", "defect": "odd_texture", "severity_score": 5}"#;

#[derive(Error, Debug)]
pub enum InputParseError {
  #[error("Invalid JSON: {source}")]
  Malformed {
    raw: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("Invalid JSON: expected an object, found `{raw}`")]
  NotAnObject { raw: String },
}

impl InputParseError {
  /// 用户输入的原始文本
  pub fn raw(&self) -> &str {
    match self {
      InputParseError::Malformed { raw, .. } => raw,
      InputParseError::NotAnObject { raw } => raw,
    }
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("未知的场景: {0}")]
pub struct UnknownSelection(pub String);

/// 模拟检测器输出的一条记录，键值不做任何约束，由推理程序自行解释
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DetectionInput(Map<String, Value>);

impl DetectionInput {
  pub fn fields(&self) -> &Map<String, Value> {
    &self.0
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// 紧凑的单行 JSON，作为 `--predict` 的参数
  pub fn to_argument(&self) -> String {
    self.to_string()
  }
}

impl From<Map<String, Value>> for DetectionInput {
  fn from(map: Map<String, Value>) -> Self {
    DetectionInput(map)
  }
}

impl fmt::Display for DetectionInput {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = if f.alternate() {
      serde_json::to_string_pretty(&self.0)
    } else {
      serde_json::to_string(&self.0)
    }
    .map_err(|_| fmt::Error)?;
    f.write_str(&text)
  }
}

impl FromStr for DetectionInput {
  type Err = InputParseError;

  fn from_str(text: &str) -> Result<Self, Self::Err> {
    match serde_json::from_str::<Value>(text) {
      Ok(Value::Object(map)) => Ok(DetectionInput(map)),
      Ok(_) => Err(InputParseError::NotAnObject {
        raw: text.to_string(),
      }),
      Err(source) => Err(InputParseError::Malformed {
        raw: text.to_string(),
        source,
      }),
    }
  }
}

/// 预置的检测场景
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Preset {
  TireBulge,
  PaintScratch,
  WindshieldCrack,
  BumperDent,
  MissingComponent,
}

impl Preset {
  pub const ALL: [Preset; 5] = [
    Preset::TireBulge,
    Preset::PaintScratch,
    Preset::WindshieldCrack,
    Preset::BumperDent,
    Preset::MissingComponent,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Preset::TireBulge => "tire-bulge",
      Preset::PaintScratch => "paint-scratch",
      Preset::WindshieldCrack => "windshield-crack",
      Preset::BumperDent => "bumper-dent",
      Preset::MissingComponent => "missing-component",
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      Preset::TireBulge => "Tire Bulge",
      Preset::PaintScratch => "Paint Scratch",
      Preset::WindshieldCrack => "Windshield Crack",
      Preset::BumperDent => "Bumper Dent",
      Preset::MissingComponent => "Missing Component",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      Preset::TireBulge => "Critical tire defect",
      Preset::PaintScratch => "Minor paint scratch",
      Preset::WindshieldCrack => "Cracked windshield",
      Preset::BumperDent => "Dented front bumper",
      Preset::MissingComponent => "Bolt missing from engine mount",
    }
  }

  pub fn record(self) -> DetectionInput {
    match self {
      Preset::TireBulge => literal("tire_sidewall", "bulge", 0.95, 8),
      Preset::PaintScratch => literal("panel_hood", "scratch", 0.88, 2),
      Preset::WindshieldCrack => literal("windshield", "crack", 0.99, 9),
      Preset::BumperDent => literal("bumper_front", "dent", 0.75, 4),
      Preset::MissingComponent => literal("engine_mount", "missing_bolt", 0.92, 10),
    }
  }
}

impl FromStr for Preset {
  type Err = UnknownSelection;

  fn from_str(key: &str) -> Result<Self, Self::Err> {
    let key = key.trim();
    Preset::ALL
      .into_iter()
      .find(|preset| preset.key().eq_ignore_ascii_case(key))
      .ok_or_else(|| UnknownSelection(key.to_string()))
  }
}

fn literal(object: &str, defect: &str, confidence: f64, severity: u64) -> DetectionInput {
  let mut map = Map::new();
  map.insert("detected_object".to_string(), Value::from(object));
  map.insert("defect".to_string(), Value::from(defect));
  map.insert("confidence".to_string(), Value::from(confidence));
  map.insert("severity_score".to_string(), Value::from(severity));
  DetectionInput(map)
}

/// 当前选中的输入来源
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
  Preset(Preset),
  Custom(String),
}

impl Default for Selection {
  fn default() -> Self {
    Selection::Preset(Preset::TireBulge)
  }
}

impl Selection {
  /// 按键选择场景，`custom` 使用给定的自定义文本
  pub fn from_key(key: &str, custom_text: &str) -> Result<Self, UnknownSelection> {
    if key.trim().eq_ignore_ascii_case(CUSTOM_KEY) {
      return Ok(Selection::Custom(custom_text.to_string()));
    }
    key.parse().map(Selection::Preset)
  }

  pub fn key(&self) -> &'static str {
    match self {
      Selection::Preset(preset) => preset.key(),
      Selection::Custom(_) => CUSTOM_KEY,
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      Selection::Preset(preset) => preset.title(),
      Selection::Custom(_) => "Custom",
    }
  }
}

/// 根据选择构造检测输入；自定义文本解析失败时不产生任何输入
pub fn compose(selection: &Selection) -> Result<DetectionInput, InputParseError> {
  match selection {
    Selection::Preset(preset) => {
      debug!("使用预置场景: {}", preset.key());
      Ok(preset.record())
    }
    Selection::Custom(text) => text.parse().inspect_err(|e| {
      error!("自定义输入解析失败: {}", e);
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parsed(text: &str) -> Map<String, Value> {
    match serde_json::from_str(text).unwrap() {
      Value::Object(map) => map,
      other => panic!("not an object: {other}"),
    }
  }

  #[test]
  fn presets_compose_to_their_literals() {
    let expected = [
      (
        Preset::TireBulge,
        r#"{"detected_object":"tire_sidewall","defect":"bulge","confidence":0.95,"severity_score":8}"#,
      ),
      (
        Preset::PaintScratch,
        r#"{"detected_object":"panel_hood","defect":"scratch","confidence":0.88,"severity_score":2}"#,
      ),
      (
        Preset::WindshieldCrack,
        r#"{"detected_object":"windshield","defect":"crack","confidence":0.99,"severity_score":9}"#,
      ),
    ];

    for (preset, text) in expected {
      let input = compose(&Selection::Preset(preset)).unwrap();
      assert_eq!(input.fields(), &parsed(text), "{}", preset.key());
      // 多次选择结果一致
      assert_eq!(input, compose(&Selection::Preset(preset)).unwrap());
    }
  }

  #[test]
  fn tire_preset_serializes_compactly_in_declared_order() {
    let input = Preset::TireBulge.record();
    assert_eq!(
      input.to_argument(),
      r#"{"detected_object":"tire_sidewall","defect":"bulge","confidence":0.95,"severity_score":8}"#
    );
  }

  #[test]
  fn custom_text_is_parsed() {
    let input = compose(&Selection::Custom(r#"{"a":1}"#.to_string())).unwrap();
    assert_eq!(input.fields(), &parsed(r#"{"a":1}"#));
    assert_eq!(input.get("a"), Some(&Value::from(1)));
  }

  #[test]
  fn malformed_custom_text_is_rejected() {
    let err = compose(&Selection::Custom("{bad}".to_string())).unwrap_err();
    assert!(matches!(err, InputParseError::Malformed { .. }));
    assert_eq!(err.raw(), "{bad}");
    assert!(err.to_string().starts_with("Invalid JSON"));
  }

  #[test]
  fn non_object_custom_text_is_rejected() {
    let err = compose(&Selection::Custom("[1, 2]".to_string())).unwrap_err();
    assert!(matches!(err, InputParseError::NotAnObject { .. }));
    assert_eq!(err.raw(), "[1, 2]");
  }

  #[test]
  fn default_custom_text_is_valid() {
    let input: DetectionInput = DEFAULT_CUSTOM_TEXT.parse().unwrap();
    assert_eq!(input.get("defect"), Some(&Value::from("odd_texture")));
  }

  #[test]
  fn selection_keys() {
    assert_eq!(
      Selection::from_key("windshield-crack", "").unwrap(),
      Selection::Preset(Preset::WindshieldCrack)
    );
    assert_eq!(
      Selection::from_key("Custom", "{}").unwrap(),
      Selection::Custom("{}".to_string())
    );
    assert_eq!(
      Selection::from_key("hubcap", ""),
      Err(UnknownSelection("hubcap".to_string()))
    );
    for preset in Preset::ALL {
      assert_eq!(preset.key().parse::<Preset>(), Ok(preset));
    }
  }

  #[test]
  fn pretty_display_spans_lines() {
    let pretty = format!("{:#}", Preset::PaintScratch.record());
    assert!(pretty.lines().count() > 1);
    assert!(pretty.contains(r#""defect": "scratch""#));
  }
}
