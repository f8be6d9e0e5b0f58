// 该文件是 Semantic Reasoner （语义推理器） 项目的一部分。
// src/locate.rs - 推理程序路径探测
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

use tracing::{debug, info, warn};

pub const DEFAULT_EXECUTABLE_NAME: &str = "SemanticReasoner";

/// 所有候选路径都不存在时使用的路径
pub const FALLBACK_EXECUTABLE: &str = "build/Release/SemanticReasoner.exe";

/// 在常见的 CMake 构建目录中查找推理程序
#[derive(Debug, Clone)]
pub struct Locator {
  root: PathBuf,
  name: String,
}

impl Default for Locator {
  fn default() -> Self {
    Self::new(".", DEFAULT_EXECUTABLE_NAME)
  }
}

impl Locator {
  pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
    Self {
      root: root.into(),
      name: name.into(),
    }
  }

  /// 按优先级排列的候选路径（相对于搜索根目录）
  pub fn candidates(&self) -> Vec<PathBuf> {
    let name = &self.name;
    [
      format!("build/Release/{name}.exe"),
      format!("build/Debug/{name}.exe"),
      format!("build/{name}"),
      format!("build/src/{name}"),
      format!("../build/Release/{name}.exe"),
    ]
    .into_iter()
    .map(|candidate| self.root.join(candidate))
    .collect()
  }

  pub fn locate(&self) -> PathBuf {
    for candidate in self.candidates() {
      debug!("检查候选路径: {}", candidate.display());
      if candidate.exists() {
        info!("找到推理程序: {}", candidate.display());
        return candidate;
      }
    }

    warn!("未找到推理程序，使用默认路径: {}", FALLBACK_EXECUTABLE);
    PathBuf::from(FALLBACK_EXECUTABLE)
  }
}

/// 优先使用显式指定的路径，否则自动探测
pub fn resolve_executable(explicit: Option<&Path>, locator: &Locator) -> PathBuf {
  match explicit {
    Some(path) => {
      info!("使用指定的推理程序: {}", path.display());
      path.to_path_buf()
    }
    None => locator.locate(),
  }
}
