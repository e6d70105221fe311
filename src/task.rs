// 该文件是 FOMO Grid 项目的一部分。
// src/task.rs - 逐帧推理与解码任务
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

use std::{
  sync::mpsc::{self, Receiver},
  thread,
  time::Duration,
};
use tracing::{debug, info, warn};

use crate::{
  decode::{FomoDecoder, FrameDecode, InferenceTiming},
  input::AsFrameSize,
  model::Model,
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 单帧处理：推理（计时）、解码、渲染
fn process_frame<F, M, O>(
  decoder: &FomoDecoder,
  model: &M,
  output: &O,
  frame: &F,
) -> anyhow::Result<FrameDecode>
where
  F: AsFrameSize,
  M: Model<Input = F>,
  M::Error: std::error::Error + Sync + Send + 'static,
  O: Render<F, FrameDecode>,
  O::Error: std::error::Error + Sync + Send + 'static,
{
  let (grid, timing) = InferenceTiming::measure(|| model.infer(frame));
  let grid = grid?;
  let result = decoder.decode(&grid, frame.frame_size(), timing)?;
  output.render_result(frame, &result)?;
  Ok(result)
}

pub struct OneShotTask {
  decoder: FomoDecoder,
}

impl OneShotTask {
  pub fn new(decoder: FomoDecoder) -> Self {
    Self { decoder }
  }
}

impl<
  F: AsFrameSize,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Error = ME>,
  O: Render<F, FrameDecode, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let result = process_frame(&self.decoder, &model, &output, &frame)?;
    info!("{}", result.summary);
    for det in &result.detections {
      debug!(
        "  - {}: {:.2} at ({}, {}) r={}",
        det.label, det.confidence, det.center.x, det.center.y, det.radius
      );
    }

    Ok(())
  }
}

#[derive(Debug)]
pub struct ContinuousTask {
  decoder: FomoDecoder,
  frame_number: Option<usize>,
  interrupt: Option<Receiver<()>>,
}

impl ContinuousTask {
  pub fn new(decoder: FomoDecoder) -> Self {
    Self {
      decoder,
      frame_number: None,
      interrupt: None,
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 安装 Ctrl-C 处理，每个进程只能调用一次
  pub fn with_ctrlc(mut self) -> Result<Self, ctrlc::Error> {
    let (tx, rx) = mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    self.interrupt = Some(rx);
    Ok(self)
  }
}

impl<
  F: AsFrameSize,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Error = ME>,
  O: Render<F, FrameDecode, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");

    let mut frame_index = 0usize;
    let mut total_detections = 0usize;
    for frame in input {
      frame_index += 1;
      debug!("处理第 {} 帧图像", frame_index);
      let result = process_frame(&self.decoder, &model, &output, &frame)?;
      total_detections += result.detections.len();
      info!("第 {} 帧: {}", frame_index, result.summary);

      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if self
        .interrupt
        .as_ref()
        .is_some_and(|rx| rx.try_recv().is_ok())
      {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成，共处理 {} 帧，检测到 {} 个目标",
      frame_index, total_detections
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, convert::Infallible};

  use image::RgbImage;

  use super::*;
  use crate::{config::DecoderConfig, grid::ProbabilityGrid, label::LabelSet};

  /// 每帧都返回同一个网格
  struct FixedModel(ProbabilityGrid);

  impl Model for FixedModel {
    type Input = RgbImage;
    type Error = Infallible;

    fn infer(&self, _input: &RgbImage) -> Result<ProbabilityGrid, Infallible> {
      Ok(self.0.clone())
    }
  }

  #[derive(Default)]
  struct Collect(RefCell<Vec<(u32, usize)>>);

  impl Render<RgbImage, FrameDecode> for Collect {
    type Error = Infallible;

    fn render_result(&self, frame: &RgbImage, result: &FrameDecode) -> Result<(), Infallible> {
      self
        .0
        .borrow_mut()
        .push((frame.width(), result.detections.len()));
      Ok(())
    }
  }

  impl Render<RgbImage, FrameDecode> for &Collect {
    type Error = Infallible;

    fn render_result(&self, frame: &RgbImage, result: &FrameDecode) -> Result<(), Infallible> {
      <Collect as Render<RgbImage, FrameDecode>>::render_result(self, frame, result)
    }
  }

  fn decoder() -> FomoDecoder {
    let config = DecoderConfig::builder()
      .labels(["background", "person"].into_iter().collect::<LabelSet>())
      .margins(0.0, 0.0)
      .build()
      .unwrap();
    FomoDecoder::new(config)
  }

  fn model() -> FixedModel {
    FixedModel(ProbabilityGrid::new(1, 2, 2, vec![0.1, 0.9, 0.9, 0.1]).unwrap())
  }

  #[test]
  fn one_shot_processes_first_frame() {
    let output = Collect::default();
    let frames = vec![RgbImage::new(10, 10), RgbImage::new(20, 10)];
    OneShotTask::new(decoder())
      .run_task(frames.into_iter(), model(), &output)
      .unwrap();
    assert_eq!(*output.0.borrow(), [(10, 1)]);
  }

  #[test]
  fn one_shot_without_frames_fails() {
    let output = Collect::default();
    let result = OneShotTask::new(decoder()).run_task(std::iter::empty(), model(), &output);
    assert!(result.is_err());
  }

  #[test]
  fn continuous_stops_at_frame_number() {
    let output = Collect::default();
    let frames = (1..=5).map(|w| RgbImage::new(w * 4, 4));
    ContinuousTask::new(decoder())
      .with_frame_number(Some(3))
      .run_task(frames, model(), &output)
      .unwrap();
    assert_eq!(*output.0.borrow(), [(4, 1), (8, 1), (12, 1)]);
  }

  #[test]
  fn continuous_stops_on_decode_error() {
    let output = Collect::default();
    // 3 个类别，标签只有 2 个且按下标判定背景
    let config = DecoderConfig::builder()
      .labels(["background", "person"].into_iter().collect::<LabelSet>())
      .background(crate::label::BackgroundPolicy::LeadingIndex)
      .build()
      .unwrap();
    let model = FixedModel(ProbabilityGrid::new(1, 1, 3, vec![0.1, 0.2, 0.7]).unwrap());
    let frames = vec![RgbImage::new(4, 4)];
    let result =
      ContinuousTask::new(FomoDecoder::new(config)).run_task(frames.into_iter(), model, &output);
    assert!(result.is_err());
    assert!(output.0.borrow().is_empty());
  }
}
