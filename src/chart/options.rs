//! Chart configuration surface.
//!
//! Every field is optional on the host side. Missing fields take the
//! documented defaults and an unparsable bubble size falls back to its
//! default with a warning rather than rejecting the whole object.

use log::warn;
use serde::{Deserialize, Deserializer};

use super::sizing::SizeSpec;
use crate::layout::LayoutOptions;

/// Which bubble dimension scales with the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBy {
    /// Bubble area is proportional to the value.
    #[default]
    Area,
    /// Bubble diameter is proportional to the value.
    Width,
}

/// Configuration of a packed-bubble chart.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BubbleOptions {
    /// Smallest bubble diameter (default: "10%").
    #[serde(deserialize_with = "min_size_or_default")]
    pub min_size: SizeSpec,
    /// Largest bubble diameter (default: "50%").
    #[serde(deserialize_with = "max_size_or_default")]
    pub max_size: SizeSpec,
    pub size_by: SizeBy,
    /// Lower value extreme; defaults to the smallest value on the chart.
    pub z_min: Option<f64>,
    /// Upper value extreme; defaults to the largest value on the chart.
    pub z_max: Option<f64>,
    /// Position bubbles with the force layout instead of the packing engine
    /// (default: false).
    pub use_simulation: bool,
    /// Bubbles can be dragged (default: true).
    pub draggable: bool,
    /// Keep a dragged bubble pinned where it was released (default: false).
    pub fixed_draggable: bool,
    /// Leave hidden series out of value extremes and sizing (default: true).
    pub ignore_hidden_series: bool,
    pub layout_algorithm: LayoutOptions,
}

impl Default for BubbleOptions {
    fn default() -> Self {
        Self {
            min_size: SizeSpec::DEFAULT_MIN,
            max_size: SizeSpec::DEFAULT_MAX,
            size_by: SizeBy::Area,
            z_min: None,
            z_max: None,
            use_simulation: false,
            draggable: true,
            fixed_draggable: false,
            ignore_hidden_series: true,
            layout_algorithm: LayoutOptions::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Pixels(f64),
    Text(String),
}

fn size_or(raw: RawSize, fallback: SizeSpec) -> SizeSpec {
    match raw {
        RawSize::Pixels(px) => SizeSpec::Pixels(px),
        RawSize::Text(text) => text.parse().unwrap_or_else(|err| {
            warn!("{err}, using {fallback}");
            fallback
        }),
    }
}

fn min_size_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SizeSpec, D::Error> {
    RawSize::deserialize(deserializer).map(|raw| size_or(raw, SizeSpec::DEFAULT_MIN))
}

fn max_size_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SizeSpec, D::Error> {
    RawSize::deserialize(deserializer).map(|raw| size_or(raw, SizeSpec::DEFAULT_MAX))
}
