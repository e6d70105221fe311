// 该文件是 FOMO Grid 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::decode::{Detection, FrameDecode, PixelRect};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 14.0;
const STATUS_FONT_SIZE: f32 = 18.0;
const LABEL_OFFSET: i32 = 10;
const STATUS_MARGIN: i32 = 10;
const LINE_THICKNESS: i32 = 2;

const REGION_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const DETECTION_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const STATUS_COLOR: [u8; 3] = [255, 255, 255]; // 白色

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件: {0}")]
  Io(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 在帧上绘制区域边界、检测圆与状态栏
///
/// 没有字体时只绘制图形，不绘制文字。
pub struct Draw {
  font: Option<FontVec>,
  label_font_size: f32,
  status_font_size: f32,
  region_color: [u8; 3],
  detection_color: [u8; 3],
  status_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      label_font_size: LABEL_FONT_SIZE,
      status_font_size: STATUS_FONT_SIZE,
      region_color: REGION_COLOR,
      detection_color: DETECTION_COLOR,
      status_color: STATUS_COLOR,
    }
  }
}

impl Draw {
  pub fn with_font_file(path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontVec::try_from_vec(data)?;
    debug!("载入字体: {}", path.as_ref().display());
    Ok(Self {
      font: Some(font),
      ..Self::default()
    })
  }

  /// 按输出 URL 中的 `font` 参数构造，未指定字体时只绘制图形
  pub fn from_font_param(font: Option<&str>) -> Result<Self, DrawError> {
    match font {
      Some(font) => Self::with_font_file(font),
      None => {
        warn!("未指定字体 (font=), 输出帧中不绘制标签与状态栏");
        Ok(Self::default())
      }
    }
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  fn draw_region(&self, image: &mut RgbImage, bounds: &PixelRect) {
    let PixelRect {
      top_left,
      bottom_right,
    } = *bounds;

    // 加粗为 2 像素，向内收缩
    for t in 0..LINE_THICKNESS {
      let width = bottom_right.x - top_left.x - 2 * t;
      let height = bottom_right.y - top_left.y - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(top_left.x + t, top_left.y + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.region_color));
    }
  }

  fn draw_detection(&self, image: &mut RgbImage, detection: &Detection) {
    let center = (detection.center.x, detection.center.y);
    let radius = detection.radius as i32;
    for t in 0..LINE_THICKNESS {
      draw_hollow_circle_mut(image, center, radius - t, Rgb(self.detection_color));
    }

    if let Some(font) = &self.font {
      let caption = format!("{}: {:.2}", detection.label, detection.confidence);
      // 基线位于圆的左上方，imageproc 以文字顶端定位
      let x = center.0 - radius;
      let y = center.1 - radius - LABEL_OFFSET - self.label_font_size as i32;
      draw_text_mut(
        image,
        Rgb(self.detection_color),
        x,
        y,
        PxScale::from(self.label_font_size),
        font,
        &caption,
      );
    }
  }

  fn draw_status(&self, image: &mut RgbImage, result: &FrameDecode) {
    let Some(font) = &self.font else {
      return;
    };
    let y = image.height() as i32 - STATUS_MARGIN - self.status_font_size as i32;
    draw_text_mut(
      image,
      Rgb(self.status_color),
      STATUS_MARGIN,
      y,
      PxScale::from(self.status_font_size),
      font,
      &result.summary.to_string(),
    );
  }
}

pub trait DrawDecodeOnImage {
  fn draw_decode_on_image(&self, image: &mut RgbImage, result: &FrameDecode);

  fn draw_decode(&self, frame: &RgbImage, result: &FrameDecode) -> RgbImage {
    let mut image = frame.clone();
    self.draw_decode_on_image(&mut image, result);
    image
  }
}

impl DrawDecodeOnImage for Draw {
  fn draw_decode_on_image(&self, image: &mut RgbImage, result: &FrameDecode) {
    self.draw_region(image, &result.region_bounds);
    for detection in &result.detections {
      self.draw_detection(image, detection);
    }
    self.draw_status(image, result);
  }
}

/// 文本记录，每行一个检测结果
pub struct Record {
  pub label_with_name: bool,
}

impl Record {
  pub fn format(&self, result: &FrameDecode) -> String {
    result
      .detections
      .iter()
      .map(|item| {
        let name = if self.label_with_name {
          item.label.clone()
        } else {
          item.class_id.to_string()
        };
        format!(
          "{}, {:.4}, {}, {}, {}",
          name, item.confidence, item.center.x, item.center.y, item.radius
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  pub fn record(&self, result: &FrameDecode, path: &Path) -> Result<(), std::io::Error> {
    std::fs::write(path.with_extension("txt"), self.format(result))
  }
}
