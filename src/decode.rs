// 该文件是 FOMO Grid 项目的一部分。
// src/decode.rs - FOMO 网格解码
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
use tracing::{debug, error};

use crate::{config::DecoderConfig, grid::ProbabilityGrid, label::BackgroundRule};

mod geometry;
mod region;
mod summary;

pub use self::geometry::{CellGeometry, FrameSize, MIN_RADIUS, PixelPoint, PixelRect};
pub use self::region::RegionOfInterest;
pub use self::summary::{FrameSummary, InferenceTiming};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("类别数与标签不匹配: 模型输出 {classes} 个类别, 标签 {labels} 个 ({policy})")]
  ShapeMismatch {
    classes: usize,
    labels: usize,
    policy: String,
  },
}

/// 单个满足条件的网格单元
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub class_id: usize,
  pub label: String,
  pub confidence: f32,
  /// 来源网格单元 (x, y)
  pub cell: (usize, usize),
  pub center: PixelPoint,
  pub radius: u32,
}

/// 单帧解码结果
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDecode {
  pub detections: Vec<Detection>,
  pub region: RegionOfInterest,
  pub region_bounds: PixelRect,
  pub summary: FrameSummary,
}

impl FrameDecode {
  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

/// 得分最高的类别，并列时取下标最小者
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
  let mut iter = scores.iter().copied().enumerate();
  let first = iter.next()?;
  Some(iter.fold(first, |best, (idx, score)| {
    if score > best.1 { (idx, score) } else { best }
  }))
}

/// 无状态解码器，只持有不可变配置
///
/// 每次调用 [`FomoDecoder::decode`] 互相独立，可以在任意线程并发调用。
#[derive(Debug, Clone)]
pub struct FomoDecoder {
  config: DecoderConfig,
}

impl FomoDecoder {
  pub fn new(config: DecoderConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &DecoderConfig {
    &self.config
  }

  fn background_rule(&self, classes: usize) -> Result<BackgroundRule, DecodeError> {
    let labels = self.config.labels().len();
    let policy = self.config.background();
    policy.resolve(labels, classes).ok_or_else(|| {
      error!(
        "模型输出 {} 个类别, 标签 {} 个, 背景策略 {:?} 无法匹配",
        classes, labels, policy
      );
      DecodeError::ShapeMismatch {
        classes,
        labels,
        policy: format!("{policy:?}"),
      }
    })
  }

  /// 解码一帧网格输出
  ///
  /// 按行优先（y 外层，x 内层）扫描，检测结果顺序即扫描顺序。
  /// 计时只影响统计信息，不影响检测结果。
  pub fn decode(
    &self,
    grid: &ProbabilityGrid,
    frame: FrameSize,
    timing: InferenceTiming,
  ) -> Result<FrameDecode, DecodeError> {
    let rule = self.background_rule(grid.classes())?;
    let labels = self.config.labels();
    let threshold = self.config.confidence_threshold();

    let geometry = CellGeometry::new(grid.width(), grid.height(), frame);
    let radius = geometry.radius();
    let region = RegionOfInterest::from_margins(
      grid.width(),
      grid.height(),
      self.config.horizontal_margin(),
      self.config.vertical_margin(),
    );
    debug!(
      "网格 {}x{}x{}, 区域 {:?}, 共 {} 个单元",
      grid.height(),
      grid.width(),
      grid.classes(),
      region,
      region.cell_count()
    );

    let mut detections = Vec::new();
    for y in 0..grid.height() {
      for x in 0..grid.width() {
        if !region.contains(x, y) {
          continue;
        }

        let Some((class_id, confidence)) = argmax(grid.cell(x, y)) else {
          continue;
        };
        if rule.is_background(labels, class_id) || !(confidence > threshold) {
          continue;
        }

        detections.push(Detection {
          class_id,
          label: labels.display_name(class_id).into_owned(),
          confidence,
          cell: (x, y),
          center: geometry.centroid(x, y),
          radius,
        });
      }
    }

    let summary = FrameSummary::new(detections.len(), timing);
    debug!("{}", summary);

    Ok(FrameDecode {
      detections,
      region,
      region_bounds: region.pixel_bounds(&geometry),
      summary,
    })
  }
}
