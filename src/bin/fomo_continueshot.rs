// 该文件是 FOMO Grid 项目的一部分。
// src/bin/fomo_continueshot.rs - 连续逐帧推理与解码
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

use anyhow::Result;
use clap::Parser;
use image::RgbImage;
use url::Url;

use fomo_grid::{
  FromUrl,
  config::DecoderConfig,
  decode::FomoDecoder,
  input::InputWrapper,
  model::ReplayModel,
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// FOMO 连续解码
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型输出来源，例如 replay:///path/to/grids
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 frames:///path/to/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 record:///path/to/records?draw
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 解码配置，例如 fomo:///path/to/labels.txt?margin_h=0.1&margin_v=0.05
  #[arg(long, value_name = "DECODER")]
  pub decoder: Url,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型输出来源: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("解码配置: {}", args.decoder);

  let config = DecoderConfig::from_url(&args.decoder)?;
  let input = InputWrapper::from_url(&args.input)?;
  let model = ReplayModel::<RgbImage>::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  ContinuousTask::new(FomoDecoder::new(config))
    .with_frame_number(args.frame_number)
    .with_ctrlc()?
    .run_task(input, model, output)?;

  Ok(())
}
