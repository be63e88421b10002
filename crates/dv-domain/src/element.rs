//! Slide elements
//!
//! Elements are a tagged sum keyed by the JSON `type` field. Kinds that this
//! crate understands get typed variants; anything else is carried verbatim
//! in the `Unknown` arm so newer editors can round-trip documents through an
//! older core without loss.
//!
//! Groups nest arbitrarily. The traversal bound lives in [`crate::walk`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A slide element. Deserialization first tries the typed kinds; a `type`
/// this crate does not know falls through to `Unknown` and is preserved
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Element {
    Known(Box<KnownElement>),
    Unknown(Value),
}

impl Element {
    /// The element id, when one is present.
    pub fn id(&self) -> Option<&str> {
        match self {
            Element::Known(known) => Some(known.base().id.as_str()),
            Element::Unknown(value) => value.get("id").and_then(Value::as_str),
        }
    }

    pub fn known(&self) -> Option<&KnownElement> {
        match self {
            Element::Known(known) => Some(known),
            Element::Unknown(_) => None,
        }
    }

    pub fn known_mut(&mut self) -> Option<&mut KnownElement> {
        match self {
            Element::Known(known) => Some(known),
            Element::Unknown(_) => None,
        }
    }
}

/// Element kinds understood by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KnownElement {
    Text(TextElement),
    Richtext(RichtextElement),
    Codeblock(CodeblockElement),
    Table(TableElement),
    Chart(ChartElement),
    Shape(ShapeElement),
    Image(ImageElement),
    Media(MediaElement),
    Group(GroupElement),
}

impl KnownElement {
    pub fn base(&self) -> &ElementBase {
        match self {
            KnownElement::Text(e) => &e.base,
            KnownElement::Richtext(e) => &e.base,
            KnownElement::Codeblock(e) => &e.base,
            KnownElement::Table(e) => &e.base,
            KnownElement::Chart(e) => &e.base,
            KnownElement::Shape(e) => &e.base,
            KnownElement::Image(e) => &e.base,
            KnownElement::Media(e) => &e.base,
            KnownElement::Group(e) => &e.base,
        }
    }
}

/// Fields shared by every typed element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementBase {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Value>,

    /// Opaque passthrough; preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Element placement. Floating-point values keep full precision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichtextElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeblockElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
}

/// An image. `src` is an asset slot: embedded binary is promoted to a
/// reference on save, external URLs pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_fit: Option<String>,
}

/// Audio or video. `src` is an asset slot like an image's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupElement {
    #[serde(flatten)]
    pub base: ElementBase,

    #[serde(default)]
    pub children: Vec<Element>,
}
