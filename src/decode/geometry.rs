// 该文件是 FOMO Grid 项目的一部分。
// src/decode/geometry.rs - 网格坐标与像素坐标映射
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

/// 标记半径相对单元尺寸的比例
const RADIUS_SCALE: f64 = 0.75;
/// 标记的最小像素半径
pub const MIN_RADIUS: u32 = 5;

/// 源帧像素尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
  pub width: u32,
  pub height: u32,
}

impl FrameSize {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }
}

/// 像素空间的整数坐标点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelPoint {
  pub x: i32,
  pub y: i32,
}

/// 像素空间矩形，`top_left` 与 `bottom_right` 均为截断后的整数坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
  pub top_left: PixelPoint,
  pub bottom_right: PixelPoint,
}

/// 单个网格单元在源帧中的像素尺寸
///
/// 单元尺寸保持为实数，只在取用坐标时截断，避免误差累积。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGeometry {
  cell_width: f64,
  cell_height: f64,
}

impl CellGeometry {
  pub fn new(grid_width: usize, grid_height: usize, frame: FrameSize) -> Self {
    Self {
      cell_width: frame.width as f64 / grid_width as f64,
      cell_height: frame.height as f64 / grid_height as f64,
    }
  }

  pub fn cell_width(&self) -> f64 {
    self.cell_width
  }

  pub fn cell_height(&self) -> f64 {
    self.cell_height
  }

  /// 单元 (x, y) 的中心像素坐标
  pub fn centroid(&self, x: usize, y: usize) -> PixelPoint {
    PixelPoint {
      x: ((x as f64 + 0.5) * self.cell_width) as i32,
      y: ((y as f64 + 0.5) * self.cell_height) as i32,
    }
  }

  /// 网格交点 (x, y) 的像素坐标，用于区域边界
  pub fn corner(&self, x: usize, y: usize) -> PixelPoint {
    PixelPoint {
      x: (x as f64 * self.cell_width) as i32,
      y: (y as f64 * self.cell_height) as i32,
    }
  }

  pub fn radius(&self) -> u32 {
    let radius = (self.cell_width.min(self.cell_height) * RADIUS_SCALE).round() as u32;
    radius.max(MIN_RADIUS)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn centroid_truncates_at_point_of_use() {
    // 100 / 3 = 33.33..., 中心 (1.5 * 33.33) = 50.0, (2.5 * 33.33) = 83.33
    let geometry = CellGeometry::new(3, 3, FrameSize::new(100, 100));
    assert_eq!(geometry.centroid(1, 1), PixelPoint { x: 50, y: 50 });
    assert_eq!(geometry.centroid(2, 0), PixelPoint { x: 83, y: 16 });
  }

  #[test]
  fn handles_non_square_cells() {
    let geometry = CellGeometry::new(4, 2, FrameSize::new(640, 480));
    assert_eq!(geometry.cell_width(), 160.0);
    assert_eq!(geometry.cell_height(), 240.0);
    assert_eq!(geometry.centroid(3, 1), PixelPoint { x: 560, y: 360 });
    assert_eq!(geometry.radius(), 120);
  }

  #[test]
  fn radius_has_floor() {
    let geometry = CellGeometry::new(1, 1, FrameSize::new(4, 4));
    // 4 * 0.75 = 3
    assert_eq!(geometry.radius(), MIN_RADIUS);
  }

  #[test]
  fn radius_rounds() {
    // 单元 10x10 像素, 10 * 0.75 = 7.5
    let geometry = CellGeometry::new(8, 6, FrameSize::new(80, 60));
    assert_eq!(geometry.radius(), 8);
  }
}
