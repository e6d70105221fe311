// 该文件是 FOMO Grid 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Datelike, Utc};
use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  decode::FrameDecode,
  output::{
    Render,
    draw::{Draw, DrawDecodeOnImage, DrawError, Record},
  },
  url_file_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
}

/// 按日期分目录保存每帧的检测记录
///
/// `record:///path/to/dir?record=id&draw&always&font=/path/to/font.ttf`
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  record: Record,
  draw: Option<Draw>,
  frame_counter: AtomicU32,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let label_with_name = !uri.query_pairs().any(|(k, v)| k == "record" && v == "id");
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    let draw = if uri.query_pairs().any(|(k, _)| k == "draw") {
      let font = uri.query_pairs().find(|(k, _)| k == "font").map(|(_, v)| v);
      Some(Draw::from_font_param(font.as_deref())?)
    } else {
      None
    };

    Ok(DirectoryRecordOutput {
      directory: url_file_path(uri),
      record: Record { label_with_name },
      draw,
      frame_counter: AtomicU32::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u32 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:06X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn save(
    &self,
    path: &Path,
    frame: &RgbImage,
    result: &FrameDecode,
  ) -> Result<(), DirectoryRecordOutputError> {
    if let Some(draw) = &self.draw {
      draw.draw_decode(frame, result).save(path)?;
    }
    self.record.record(result, path)?;
    debug!("保存记录: {}", path.display());
    Ok(())
  }
}

impl Render<RgbImage, FrameDecode> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &FrameDecode) -> Result<(), Self::Error> {
    if self.always || !result.is_empty() {
      let path = self.frame_path()?;
      self.save(&path, frame, result)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::decode::{Detection, FrameSummary, PixelPoint, PixelRect, RegionOfInterest};

  fn decode(detections: Vec<Detection>) -> FrameDecode {
    FrameDecode {
      summary: FrameSummary::with_duration(detections.len(), Duration::ZERO),
      detections,
      region: RegionOfInterest {
        x_start: 0,
        x_end: 1,
        y_start: 0,
        y_end: 1,
      },
      region_bounds: PixelRect {
        top_left: PixelPoint { x: 0, y: 0 },
        bottom_right: PixelPoint { x: 8, y: 8 },
      },
    }
  }

  fn files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path);
        } else {
          found.push(path);
        }
      }
    }
    found.sort();
    found
  }

  #[test]
  fn skips_empty_frames_unless_always() {
    let dir = tempfile::tempdir().unwrap();
    let frame = RgbImage::new(8, 8);

    let url = url::Url::parse(&format!("record://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &decode(vec![])).unwrap();
    assert!(files(dir.path()).is_empty());

    let url = url::Url::parse(&format!("record://{}?always", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &decode(vec![])).unwrap();
    let written = files(dir.path());
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].extension().unwrap(), "txt");
  }

  #[test]
  fn directory_path_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("night shift");
    let url = url::Url::parse(&format!("record://{}?always", target.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&RgbImage::new(8, 8), &decode(vec![])).unwrap();
    assert_eq!(files(&target).len(), 1);
  }

  #[test]
  fn writes_record_and_drawing() {
    let dir = tempfile::tempdir().unwrap();
    let frame = RgbImage::new(8, 8);
    let url =
      url::Url::parse(&format!("record://{}?draw&record=id", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    let detection = Detection {
      class_id: 2,
      label: "dog".to_string(),
      confidence: 0.75,
      cell: (0, 0),
      center: PixelPoint { x: 4, y: 4 },
      radius: 5,
    };
    output.render_result(&frame, &decode(vec![detection])).unwrap();

    let written = files(dir.path());
    assert_eq!(written.len(), 2);
    let record = written.iter().find(|p| p.extension().unwrap() == "txt").unwrap();
    assert_eq!(std::fs::read_to_string(record).unwrap(), "2, 0.7500, 4, 4, 5");
  }
}
