// 该文件是 FOMO Grid 项目的一部分。
// src/lib.rs - 库主文件
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

//! FOMO 风格检测模型的网格输出解码。
//!
//! 推理引擎输出 `grid_height × grid_width × num_classes` 的概率张量，
//! [`decode::FomoDecoder`] 将其逐帧转换为带像素坐标的检测结果。

pub mod config;
pub mod decode;
pub mod grid;
pub mod input;
pub mod label;
pub mod model;
pub mod output;
pub mod task;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// URL 路径部分解码后的文件路径，所有方案共用
pub(crate) fn url_file_path(url: &url::Url) -> std::path::PathBuf {
  let bytes = urlencoding::decode_binary(url.path().as_bytes());
  String::from_utf8_lossy(&bytes).into_owned().into()
}
