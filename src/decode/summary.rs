// 该文件是 FOMO Grid 项目的一部分。
// src/decode/summary.rs - 单帧统计
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
  fmt,
  time::{Duration, Instant},
};

/// 包围一次推理调用的起止时间戳，由调用方提供
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceTiming {
  pub start: Instant,
  pub end: Instant,
}

impl InferenceTiming {
  pub fn new(start: Instant, end: Instant) -> Self {
    Self { start, end }
  }

  /// 对闭包计时，返回闭包结果与时间戳
  pub fn measure<T>(f: impl FnOnce() -> T) -> (T, Self) {
    let start = Instant::now();
    let value = f();
    let end = Instant::now();
    (value, Self { start, end })
  }

  /// 结束时间早于开始时间时视为 0
  pub fn duration(&self) -> Duration {
    self.end.saturating_duration_since(self.start)
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSummary {
  pub detections: usize,
  pub inference: Duration,
  pub fps: f64,
}

impl FrameSummary {
  pub fn new(detections: usize, timing: InferenceTiming) -> Self {
    Self::with_duration(detections, timing.duration())
  }

  pub fn with_duration(detections: usize, inference: Duration) -> Self {
    let seconds = inference.as_secs_f64();
    let fps = if seconds > 0.0 { 1.0 / seconds } else { 0.0 };
    Self {
      detections,
      inference,
      fps,
    }
  }

  pub fn inference_ms(&self) -> f64 {
    self.inference.as_secs_f64() * 1000.0
  }
}

/// 状态栏文本：`Objects: 3 | Inference: 12.5ms | FPS: 80.0`
impl fmt::Display for FrameSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Objects: {} | Inference: {:.1}ms | FPS: {:.1}",
      self.detections,
      self.inference_ms(),
      self.fps
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_duration_has_zero_fps() {
    let now = Instant::now();
    let summary = FrameSummary::new(2, InferenceTiming::new(now, now));
    assert_eq!(summary.fps, 0.0);
    assert_eq!(summary.inference, Duration::ZERO);
  }

  #[test]
  fn reversed_timestamps_saturate() {
    let start = Instant::now();
    let end = start + Duration::from_millis(5);
    let timing = InferenceTiming::new(end, start);
    assert_eq!(timing.duration(), Duration::ZERO);
    assert_eq!(FrameSummary::new(0, timing).fps, 0.0);
  }

  #[test]
  fn fps_is_inverse_of_latency() {
    let summary = FrameSummary::with_duration(1, Duration::from_millis(20));
    assert!((summary.fps - 50.0).abs() < 1e-9);
    assert_eq!(
      summary.to_string(),
      "Objects: 1 | Inference: 20.0ms | FPS: 50.0"
    );
  }
}
