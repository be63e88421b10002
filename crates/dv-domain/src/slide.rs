//! Slides, layers and backgrounds

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::element::Element;

/// A single slide. `elements` paint first, then `layers` in ascending
/// `order`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    #[serde(default)]
    pub elements: Vec<Element>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Layer>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<SlideNotes>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Value>,

    /// Pre-rendered slide thumbnail as an asset slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Slide {
    /// Layers in paint order (ascending `order`, stable on ties).
    pub fn layers_in_paint_order(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self.layers.iter().flatten().collect();
        layers.sort_by(|a, b| a.order.partial_cmp(&b.order).unwrap_or(std::cmp::Ordering::Equal));
        layers
    }
}

/// An ordered overlay of elements painted above the slide's own elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub order: f64,

    #[serde(default)]
    pub elements: Vec<Element>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Background of a slide or the deck default. `value` is an asset slot when
/// `type` is `image` or `video`; for other kinds (`color`, `gradient`, ...)
/// it is an opaque string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Background {
    /// True when `value` holds (or may hold) binary to be promoted.
    pub fn carries_binary(&self) -> bool {
        self.kind == "image" || self.kind == "video"
    }
}

/// Presenter and viewer notes, plus whatever assistants attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presenter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
