// 该文件是 FOMO Grid 项目的一部分。
// src/grid.rs - 网格概率张量定义
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

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GridError {
  #[error("网格维度必须大于 0: {height}x{width}x{classes}")]
  EmptyDimension {
    height: usize,
    width: usize,
    classes: usize,
  },
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("不支持的张量形状: {0:?}")]
  UnsupportedShape(Vec<usize>),
  #[error("网格尺寸溢出: {height}x{width}x{classes}")]
  TooLarge {
    height: usize,
    width: usize,
    classes: usize,
  },
}

/// 单帧模型输出，形状为 (grid_height, grid_width, num_classes)，行优先存储
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityGrid {
  height: usize,
  width: usize,
  classes: usize,
  data: Box<[f32]>,
}

impl ProbabilityGrid {
  pub fn new(
    height: usize,
    width: usize,
    classes: usize,
    data: Vec<f32>,
  ) -> Result<Self, GridError> {
    if height == 0 || width == 0 || classes == 0 {
      return Err(GridError::EmptyDimension {
        height,
        width,
        classes,
      });
    }

    let expected = height
      .checked_mul(width)
      .and_then(|n| n.checked_mul(classes))
      .ok_or(GridError::TooLarge {
        height,
        width,
        classes,
      })?;
    if data.len() != expected {
      return Err(GridError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      height,
      width,
      classes,
      data: data.into_boxed_slice(),
    })
  }

  /// 接受推理引擎的原始输出形状：`[h, w, c]` 或批大小为 1 的 `[1, h, w, c]`
  pub fn from_shape(shape: &[usize], data: Vec<f32>) -> Result<Self, GridError> {
    match shape {
      &[height, width, classes] | &[1, height, width, classes] => {
        Self::new(height, width, classes, data)
      }
      _ => Err(GridError::UnsupportedShape(shape.to_vec())),
    }
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn classes(&self) -> usize {
    self.classes
  }

  /// 网格单元 (x, y) 的类别得分向量
  ///
  /// 越界访问会 panic，调用方按 `width()` / `height()` 迭代即可。
  pub fn cell(&self, x: usize, y: usize) -> &[f32] {
    assert!(x < self.width && y < self.height, "网格坐标越界: ({x}, {y})");
    let offset = (y * self.width + x) * self.classes;
    &self.data[offset..offset + self.classes]
  }
}
