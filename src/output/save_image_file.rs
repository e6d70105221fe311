// 该文件是 FOMO Grid 项目的一部分。
// src/output/save_image_file.rs - 保存绘制结果到图像文件
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

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  decode::FrameDecode,
  output::{
    Render,
    draw::{Draw, DrawDecodeOnImage, DrawError},
  },
  url_file_path,
};

pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

/// `image:///path/to/out.png?font=/path/to/font.ttf`
impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let font = uri.query_pairs().find(|(k, _)| k == "font").map(|(_, v)| v);
    let draw = Draw::from_font_param(font.as_deref())?;

    Ok(SaveImageFileOutput {
      path: url_file_path(uri),
      draw,
    })
  }
}

impl SaveImageFileOutput {
  fn save_image(&self, image: RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    info!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<RgbImage, FrameDecode> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RgbImage, result: &FrameDecode) -> Result<(), Self::Error> {
    let image = self.draw.draw_decode(frame, result);
    self.save_image(image)
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::decode::{FrameSummary, PixelPoint, PixelRect, RegionOfInterest};

  #[test]
  fn saves_to_decoded_path() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("drawn frames").join("out.png");
    let url = Url::parse(&format!("image://{}", target.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let result = FrameDecode {
      detections: vec![],
      region: RegionOfInterest {
        x_start: 0,
        x_end: 1,
        y_start: 0,
        y_end: 1,
      },
      region_bounds: PixelRect {
        top_left: PixelPoint { x: 0, y: 0 },
        bottom_right: PixelPoint { x: 6, y: 6 },
      },
      summary: FrameSummary::with_duration(0, Duration::from_millis(5)),
    };
    output.render_result(&RgbImage::new(6, 6), &result).unwrap();
    assert!(target.is_file());
  }
}
