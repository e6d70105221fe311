// 该文件是 FOMO Grid 项目的一部分。
// src/model/replay.rs - 回放已录制的模型输出
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
  marker::PhantomData,
  path::{Path, PathBuf},
  sync::atomic::{AtomicUsize, Ordering},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  grid::{GridError, ProbabilityGrid},
  model::Model,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误 {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("JSON 解析错误 {path}: {source}")]
  Json {
    path: PathBuf,
    source: serde_json::Error,
  },
  #[error("张量形状错误 {path}: {source}")]
  Grid { path: PathBuf, source: GridError },
  #[error("没有可回放的输出: {0}")]
  Empty(PathBuf),
}

/// 录制文件格式：`{"shape": [1, h, w, c], "data": [...]}`
#[derive(Debug, Deserialize)]
struct GridRecord {
  shape: Vec<usize>,
  data: Vec<f32>,
}

/// 按顺序循环返回录制好的网格输出，替代硬件推理引擎
pub struct ReplayModel<Frame> {
  grids: Box<[ProbabilityGrid]>,
  cursor: AtomicUsize,
  _phantom: PhantomData<fn(&Frame)>,
}

impl<Frame> FromUrlWithScheme for ReplayModel<Frame> {
  const SCHEME: &'static str = "replay";
}

impl<Frame> FromUrl for ReplayModel<Frame> {
  type Error = ReplayModelError;

  /// `replay:///path/to/grid.json` 或 `replay:///path/to/dir`（按文件名排序的所有 .json）
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Self::open(url_file_path(url))
  }
}

impl<Frame> ReplayModel<Frame> {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ReplayModelError> {
    let path = path.as_ref();
    let files = if path.is_dir() {
      let mut files = std::fs::read_dir(path)
        .and_then(|entries| {
          entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
        })
        .map_err(|source| ReplayModelError::Io {
          path: path.to_path_buf(),
          source,
        })?;
      files.retain(|p| p.extension().is_some_and(|ext| ext == "json"));
      files.sort();
      files
    } else {
      vec![path.to_path_buf()]
    };

    let grids = files
      .iter()
      .map(|file| load_grid(file))
      .collect::<Result<Vec<_>, _>>()?;
    if grids.is_empty() {
      return Err(ReplayModelError::Empty(path.to_path_buf()));
    }

    info!("从 {} 载入 {} 帧模型输出", path.display(), grids.len());
    Ok(Self::from_grids(grids))
  }

  pub fn from_grids(grids: Vec<ProbabilityGrid>) -> Self {
    Self {
      grids: grids.into_boxed_slice(),
      cursor: AtomicUsize::new(0),
      _phantom: PhantomData,
    }
  }

  pub fn len(&self) -> usize {
    self.grids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.grids.is_empty()
  }
}

fn load_grid(path: &Path) -> Result<ProbabilityGrid, ReplayModelError> {
  let content = std::fs::read(path).map_err(|source| ReplayModelError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let record: GridRecord =
    serde_json::from_slice(&content).map_err(|source| ReplayModelError::Json {
      path: path.to_path_buf(),
      source,
    })?;
  debug!("{}: 形状 {:?}", path.display(), record.shape);
  ProbabilityGrid::from_shape(&record.shape, record.data).map_err(|source| {
    ReplayModelError::Grid {
      path: path.to_path_buf(),
      source,
    }
  })
}

impl<Frame> Model for ReplayModel<Frame> {
  type Input = Frame;
  type Error = ReplayModelError;

  fn infer(&self, _input: &Self::Input) -> Result<ProbabilityGrid, Self::Error> {
    if self.grids.is_empty() {
      return Err(ReplayModelError::Empty(PathBuf::new()));
    }
    let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.grids.len();
    debug!("回放第 {} 帧模型输出", index);
    Ok(self.grids[index].clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
  }

  #[test]
  fn replays_directory_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "b.json", r#"{"shape": [1, 1, 1, 2], "data": [0.2, 0.8]}"#);
    write(dir.path(), "a.json", r#"{"shape": [1, 1, 2], "data": [0.9, 0.1]}"#);
    write(dir.path(), "notes.txt", "ignored");

    let url = Url::parse(&format!("replay://{}", dir.path().display())).unwrap();
    let model: ReplayModel<()> = ReplayModel::from_url(&url).unwrap();
    assert_eq!(model.len(), 2);

    let first = model.infer(&()).unwrap();
    let second = model.infer(&()).unwrap();
    let third = model.infer(&()).unwrap();
    assert_eq!(first.cell(0, 0), &[0.9, 0.1]);
    assert_eq!(second.cell(0, 0), &[0.2, 0.8]);
    assert_eq!(third, first);
  }

  #[test]
  fn reports_bad_shape() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bad.json", r#"{"shape": [1, 2, 2], "data": [0.5]}"#);

    let err = ReplayModel::<()>::open(dir.path().join("bad.json")).err().unwrap();
    assert!(matches!(err, ReplayModelError::Grid { .. }));
  }

  #[test]
  fn reports_overflowing_shape() {
    let dir = tempfile::tempdir().unwrap();
    let huge = usize::MAX / 2;
    write(
      dir.path(),
      "huge.json",
      &format!(r#"{{"shape": [{huge}, 4, 2], "data": [0.0, 0.0, 0.0, 0.0]}}"#),
    );

    let err = ReplayModel::<()>::open(dir.path().join("huge.json")).err().unwrap();
    assert!(matches!(
      err,
      ReplayModelError::Grid {
        source: GridError::TooLarge { .. },
        ..
      }
    ));
  }

  #[test]
  fn empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReplayModel::<()>::open(dir.path()).err().unwrap();
    assert!(matches!(err, ReplayModelError::Empty(_)));
  }
}
