// 该文件是 FOMO Grid 项目的一部分。
// src/decode/region.rs - 感兴趣区域（边距）过滤
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

use super::geometry::{CellGeometry, PixelRect};

/// 网格单元坐标上的左闭右开矩形 `[x_start, x_end) × [y_start, y_end)`
///
/// 起点不小于终点时区域为空，此时没有任何单元参与检测。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionOfInterest {
  pub x_start: usize,
  pub x_end: usize,
  pub y_start: usize,
  pub y_end: usize,
}

impl RegionOfInterest {
  pub fn from_margins(
    grid_width: usize,
    grid_height: usize,
    horizontal_margin: f64,
    vertical_margin: f64,
  ) -> Self {
    let (x_start, x_end) = span(grid_width, horizontal_margin);
    let (y_start, y_end) = span(grid_height, vertical_margin);
    Self {
      x_start,
      x_end,
      y_start,
      y_end,
    }
  }

  pub fn contains(&self, x: usize, y: usize) -> bool {
    (self.x_start..self.x_end).contains(&x) && (self.y_start..self.y_end).contains(&y)
  }

  pub fn is_empty(&self) -> bool {
    self.x_start >= self.x_end || self.y_start >= self.y_end
  }

  pub fn cell_count(&self) -> usize {
    self.x_end.saturating_sub(self.x_start) * self.y_end.saturating_sub(self.y_start)
  }

  /// 区域在源帧中的像素边界，供渲染方绘制
  pub fn pixel_bounds(&self, geometry: &CellGeometry) -> PixelRect {
    PixelRect {
      top_left: geometry.corner(self.x_start, self.y_start),
      bottom_right: geometry.corner(self.x_end, self.y_end),
    }
  }
}

fn span(extent: usize, margin: f64) -> (usize, usize) {
  let start = (extent as f64 * margin) as usize;
  let end = (extent as f64 * (1.0 - margin)) as usize;
  (start, end)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decode::geometry::{FrameSize, PixelPoint};

  #[test]
  fn truncates_margins() {
    // 10 * 0.1 = 1, 10 * 0.9 = 9; 20 * 0.05 = 1, 20 * 0.95 = 19
    let roi = RegionOfInterest::from_margins(10, 20, 0.1, 0.05);
    assert_eq!(
      roi,
      RegionOfInterest {
        x_start: 1,
        x_end: 9,
        y_start: 1,
        y_end: 19
      }
    );
    assert!(roi.contains(1, 1));
    assert!(!roi.contains(9, 5));
    assert!(!roi.contains(0, 5));
    assert_eq!(roi.cell_count(), 8 * 18);
  }

  #[test]
  fn zero_margin_covers_grid() {
    let roi = RegionOfInterest::from_margins(3, 3, 0.0, 0.0);
    assert_eq!(roi.cell_count(), 9);
    assert!(roi.contains(2, 2));
  }

  #[test]
  fn large_margin_on_small_grid_is_empty() {
    // 3 * 0.49 = 1.47, 3 * 0.51 = 1.53
    let roi = RegionOfInterest::from_margins(3, 3, 0.49, 0.49);
    assert!(roi.is_empty());
    assert_eq!(roi.cell_count(), 0);
    assert!(!roi.contains(1, 1));
  }

  #[test]
  fn pixel_bounds_truncate() {
    let roi = RegionOfInterest::from_margins(10, 20, 0.1, 0.05);
    let geometry = CellGeometry::new(10, 20, FrameSize::new(333, 250));
    let bounds = roi.pixel_bounds(&geometry);
    // 33.3 * 1, 33.3 * 9 = 299.7; 12.5 * 1, 12.5 * 19 = 237.5
    assert_eq!(bounds.top_left, PixelPoint { x: 33, y: 12 });
    assert_eq!(bounds.bottom_right, PixelPoint { x: 299, y: 237 });
  }
}
