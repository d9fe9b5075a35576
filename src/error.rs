//! Error type shared by the chart binding and the wasm facade.

use crate::layout::{PointId, SeriesId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown series: {0}")]
    UnknownSeries(SeriesId),
    #[error("unknown point: {0}")]
    UnknownPoint(PointId),
    #[error("invalid bubble size `{0}`: expected pixels (\"25\") or percent (\"10%\")")]
    InvalidSize(String),
    #[error("invalid options: {0}")]
    Options(String),
}

pub type Result<T> = std::result::Result<T, Error>;
