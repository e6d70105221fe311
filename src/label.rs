// 该文件是 FOMO Grid 项目的一部分。
// src/label.rs - 类别标签与背景类判定
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

use std::{borrow::Cow, path::Path, str::FromStr};

use thiserror::Error;
use tracing::debug;

/// 按名称判定为背景的标签（不区分大小写）
const BACKGROUND_NAMES: [&str; 2] = ["background", "uncertain"];

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标签文件 {path}: {source}")]
  Io {
    path: String,
    source: std::io::Error,
  },
  #[error("未知的背景类策略: {0}")]
  UnknownPolicy(String),
}

/// 与张量类别轴按下标对齐的类别名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
  names: Box<[String]>,
}

impl LabelSet {
  /// 每行一个标签，去除首尾空白，保持行序
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
      path: path.display().to_string(),
      source,
    })?;

    let labels = Self::from_iter(content.lines().map(str::trim));
    debug!("从 {} 读取 {} 个标签", path.display(), labels.len());
    Ok(labels)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  /// 显示用名称，没有对应标签的类别以 `#<id>` 表示
  pub fn display_name(&self, class_id: usize) -> Cow<'_, str> {
    match self.get(class_id) {
      Some(name) => Cow::Borrowed(name),
      None => Cow::Owned(format!("#{class_id}")),
    }
  }

  fn is_background_name(&self, class_id: usize) -> bool {
    self
      .get(class_id)
      .map(|name| {
        BACKGROUND_NAMES
          .iter()
          .any(|bg| name.eq_ignore_ascii_case(bg))
      })
      .unwrap_or(false)
  }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().map(Into::into).collect(),
    }
  }
}

/// 背景类约定，在会话开始时选定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackgroundPolicy {
  /// 根据标签数与类别数自动选择：相等时按下标 0，标签较少时按名称
  #[default]
  Auto,
  /// 类别 0 为背景，要求标签数等于类别数
  LeadingIndex,
  /// 名称为 background / uncertain 的类别为背景
  ByName,
}

impl FromStr for BackgroundPolicy {
  type Err = LabelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "auto" => Ok(BackgroundPolicy::Auto),
      "index" | "leading-index" => Ok(BackgroundPolicy::LeadingIndex),
      "name" | "by-name" => Ok(BackgroundPolicy::ByName),
      _ => Err(LabelError::UnknownPolicy(s.to_string())),
    }
  }
}

/// 针对具体类别数解析后的背景判定规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundRule {
  LeadingIndex,
  ByName,
}

impl BackgroundPolicy {
  /// 标签数多于类别数时返回 `None`，其余不兼容组合同样返回 `None`
  pub fn resolve(self, labels: usize, classes: usize) -> Option<BackgroundRule> {
    match self {
      _ if labels > classes => None,
      BackgroundPolicy::Auto if labels == classes => Some(BackgroundRule::LeadingIndex),
      BackgroundPolicy::Auto => Some(BackgroundRule::ByName),
      BackgroundPolicy::LeadingIndex if labels == classes => Some(BackgroundRule::LeadingIndex),
      BackgroundPolicy::LeadingIndex => None,
      BackgroundPolicy::ByName => Some(BackgroundRule::ByName),
    }
  }
}

impl BackgroundRule {
  pub fn is_background(self, labels: &LabelSet, class_id: usize) -> bool {
    match self {
      BackgroundRule::LeadingIndex => class_id == 0,
      BackgroundRule::ByName => labels.is_background_name(class_id),
    }
  }
}
