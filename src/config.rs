// 该文件是 FOMO Grid 项目的一部分。
// src/config.rs - 解码器配置
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
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  label::{BackgroundPolicy, LabelError, LabelSet},
  url_file_path,
};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_HORIZONTAL_MARGIN: f64 = 0.1;
pub const DEFAULT_VERTICAL_MARGIN: f64 = 0.05;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("{name} 边距必须位于 [0, 0.5) 区间内, 实际为 {value}")]
  MarginOutOfRange { name: &'static str, value: f64 },
  #[error("置信度阈值必须大于 0, 实际为 {0}")]
  NonPositiveThreshold(f32),
  #[error("标签集合为空")]
  EmptyLabels,
  #[error("缺少标签集合")]
  MissingLabels,
  #[error("参数 {key} 无法解析: {value}")]
  InvalidParameter { key: String, value: String },
  #[error("标签错误: {0}")]
  Label(#[from] LabelError),
}

/// 会话级别的静态配置，构建后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
  labels: LabelSet,
  confidence_threshold: f32,
  horizontal_margin: f64,
  vertical_margin: f64,
  background: BackgroundPolicy,
}

impl DecoderConfig {
  pub fn builder() -> DecoderConfigBuilder {
    DecoderConfigBuilder::default()
  }

  pub fn labels(&self) -> &LabelSet {
    &self.labels
  }

  pub fn confidence_threshold(&self) -> f32 {
    self.confidence_threshold
  }

  pub fn horizontal_margin(&self) -> f64 {
    self.horizontal_margin
  }

  pub fn vertical_margin(&self) -> f64 {
    self.vertical_margin
  }

  pub fn background(&self) -> BackgroundPolicy {
    self.background
  }
}

#[derive(Debug, Clone)]
pub struct DecoderConfigBuilder {
  labels: Option<LabelSet>,
  confidence_threshold: f32,
  horizontal_margin: f64,
  vertical_margin: f64,
  background: BackgroundPolicy,
}

impl Default for DecoderConfigBuilder {
  fn default() -> Self {
    Self {
      labels: None,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      horizontal_margin: DEFAULT_HORIZONTAL_MARGIN,
      vertical_margin: DEFAULT_VERTICAL_MARGIN,
      background: BackgroundPolicy::default(),
    }
  }
}

impl DecoderConfigBuilder {
  pub fn labels(mut self, labels: LabelSet) -> Self {
    self.labels = Some(labels);
    self
  }

  pub fn confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn margins(mut self, horizontal: f64, vertical: f64) -> Self {
    self.horizontal_margin = horizontal;
    self.vertical_margin = vertical;
    self
  }

  pub fn background(mut self, policy: BackgroundPolicy) -> Self {
    self.background = policy;
    self
  }

  pub fn build(self) -> Result<DecoderConfig, ConfigError> {
    check_margin("horizontal", self.horizontal_margin)?;
    check_margin("vertical", self.vertical_margin)?;

    // NaN 同样被拒绝
    if !(self.confidence_threshold > 0.0) {
      error!("置信度阈值无效: {}", self.confidence_threshold);
      return Err(ConfigError::NonPositiveThreshold(self.confidence_threshold));
    }

    let labels = self.labels.ok_or(ConfigError::MissingLabels)?;
    if labels.is_empty() {
      return Err(ConfigError::EmptyLabels);
    }

    Ok(DecoderConfig {
      labels,
      confidence_threshold: self.confidence_threshold,
      horizontal_margin: self.horizontal_margin,
      vertical_margin: self.vertical_margin,
      background: self.background,
    })
  }
}

fn check_margin(name: &'static str, value: f64) -> Result<(), ConfigError> {
  if (0.0..0.5).contains(&value) {
    Ok(())
  } else {
    error!("{} 边距超出范围: {}", name, value);
    Err(ConfigError::MarginOutOfRange { name, value })
  }
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::InvalidParameter {
    key: key.to_string(),
    value: value.to_string(),
  })
}

impl FromUrlWithScheme for DecoderConfig {
  const SCHEME: &'static str = "fomo";
}

/// `fomo:///path/to/labels.txt?threshold=0.5&margin_h=0.1&margin_v=0.05&background=auto`
impl FromUrl for DecoderConfig {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConfigError::SchemeMismatch {
        expected: Self::SCHEME,
        actual: url.scheme().to_string(),
      });
    }

    let label_path = url_file_path(url);
    info!("加载标签文件: {}", label_path.display());
    let mut builder = DecoderConfig::builder().labels(LabelSet::from_file(&label_path)?);

    for (key, value) in url.query_pairs() {
      builder = match key.as_ref() {
        "threshold" => builder.confidence_threshold(parse_param(&key, &value)?),
        "margin_h" => {
          let vertical = builder.vertical_margin;
          builder.margins(parse_param(&key, &value)?, vertical)
        }
        "margin_v" => {
          let horizontal = builder.horizontal_margin;
          builder.margins(horizontal, parse_param(&key, &value)?)
        }
        "background" => builder.background(value.parse()?),
        _ => {
          return Err(ConfigError::InvalidParameter {
            key: key.to_string(),
            value: value.to_string(),
          });
        }
      };
    }

    builder.build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn labels() -> LabelSet {
    ["background", "person"].into_iter().collect()
  }

  #[test]
  fn defaults_are_applied() {
    let config = DecoderConfig::builder().labels(labels()).build().unwrap();
    assert_eq!(config.confidence_threshold(), 0.5);
    assert_eq!(config.horizontal_margin(), 0.1);
    assert_eq!(config.vertical_margin(), 0.05);
    assert_eq!(config.background(), BackgroundPolicy::Auto);
  }

  #[test]
  fn rejects_margin_out_of_range() {
    for (h, v) in [(0.5, 0.0), (0.0, -0.1), (f64::NAN, 0.0)] {
      let err = DecoderConfig::builder()
        .labels(labels())
        .margins(h, v)
        .build()
        .unwrap_err();
      assert!(matches!(err, ConfigError::MarginOutOfRange { .. }));
    }
  }

  #[test]
  fn rejects_non_positive_threshold() {
    for threshold in [0.0, -0.2, f32::NAN] {
      let err = DecoderConfig::builder()
        .labels(labels())
        .confidence_threshold(threshold)
        .build()
        .unwrap_err();
      assert!(matches!(err, ConfigError::NonPositiveThreshold(_)));
    }
  }

  #[test]
  fn rejects_empty_labels() {
    let err = DecoderConfig::builder()
      .labels(LabelSet::from_iter(Vec::<String>::new()))
      .build()
      .unwrap_err();
    assert!(matches!(err, ConfigError::EmptyLabels));

    let err = DecoderConfig::builder().build().unwrap_err();
    assert!(matches!(err, ConfigError::MissingLabels));
  }

  #[test]
  fn parses_url() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "background\ncat\ndog\n").unwrap();

    let url = Url::parse(&format!(
      "fomo://{}?threshold=0.7&margin_h=0.2&margin_v=0&background=name",
      file.path().display()
    ))
    .unwrap();
    let config = DecoderConfig::from_url(&url).unwrap();
    assert_eq!(config.labels().len(), 3);
    assert_eq!(config.confidence_threshold(), 0.7);
    assert_eq!(config.horizontal_margin(), 0.2);
    assert_eq!(config.vertical_margin(), 0.0);
    assert_eq!(config.background(), BackgroundPolicy::ByName);
  }

  #[test]
  fn rejects_unknown_url_parameter() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "person").unwrap();

    let url = Url::parse(&format!("fomo://{}?nms=0.4", file.path().display())).unwrap();
    let err = DecoderConfig::from_url(&url).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidParameter { .. }));

    let url = Url::parse("yolo26:///model.rknn").unwrap();
    let err = DecoderConfig::from_url(&url).unwrap_err();
    assert!(matches!(err, ConfigError::SchemeMismatch { .. }));
  }
}
