use std::path::PathBuf;

use crate::error::{SlotformError, SlotformResult};

/// Stable identity of a project item within one document.
///
/// Ids are arena indices; they are never reused within a document's lifetime.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub u32);

/// A project item. Closed variant; traversal dispatches structurally, never by
/// runtime type probing.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProjectItem {
    Composition(CompositionNode),
    Media(MediaAsset),
    Folder(FolderItem),
}

impl ProjectItem {
    pub fn name(&self) -> &str {
        match self {
            ProjectItem::Composition(c) => &c.name,
            ProjectItem::Media(m) => &m.name,
            ProjectItem::Folder(f) => &f.name,
        }
    }

    pub fn as_composition(&self) -> Option<&CompositionNode> {
        match self {
            ProjectItem::Composition(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_media(&self) -> Option<&MediaAsset> {
        match self {
            ProjectItem::Media(m) => Some(m),
            _ => None,
        }
    }
}

/// A container of ordered layers, itself reusable as another layer's source.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CompositionNode {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub duration_sec: f64,
    /// Stack order 1..N top-down; position in this vec is the traversal and
    /// tie-break order.
    pub layers: Vec<LayerNode>,
    /// Set on adapter-built comps. A synthesized comp is never treated as a
    /// placeholder target and is never recursed into.
    #[serde(default)]
    pub synthesized: bool,
}

/// One layer inside a composition.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LayerNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
    /// Reference to a MediaAsset or CompositionNode; layers do not own sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ItemId>,
    #[serde(default)]
    pub kind: LayerKind,
    /// Presentation properties preserved verbatim across substitution.
    #[serde(default)]
    pub props: LayerProps,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Audio/visual layer driven by its source reference.
    #[default]
    Av,
    /// Text-capable layer (drives "text" content-type inference).
    Text,
}

/// A timed marker on a layer. Only the comment participates in placeholder
/// identification.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    pub time_sec: f64,
    pub comment: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerProps {
    pub position: [f64; 2],
    /// Per-axis scale in percent, 100.0 = identity.
    pub scale_pct: [f64; 2],
    pub opacity_pct: f64,
    pub in_point_sec: f64,
    pub out_point_sec: f64,
}

impl Default for LayerProps {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0],
            scale_pct: [100.0, 100.0],
            opacity_pct: 100.0,
            in_point_sec: 0.0,
            out_point_sec: 0.0,
        }
    }
}

/// Raw imported media, owned by the project, referenced by layers.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MediaAsset {
    pub name: String,
    /// Canonical filesystem path.
    pub path: PathBuf,
    /// Absolute resource identifier, when the importing host supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub media_kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Still,
    Video,
    Other,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FolderItem {
    pub name: String,
}

/// Operator-supplied binding for one zero-based slot index.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSpec {
    /// Raw file on disk; goes through identity resolution and adapter synthesis.
    File(PathBuf),
    /// Existing composition referenced by name; substituted as-is.
    CompByName(String),
}

impl CompositionNode {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            frame_rate: 30.0,
            duration_sec: 10.0,
            layers: Vec::new(),
            synthesized: false,
        }
    }

    pub fn validate(&self) -> SlotformResult<()> {
        if self.name.trim().is_empty() {
            return Err(SlotformError::validation(
                "composition name must be non-empty",
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SlotformError::validation(format!(
                "composition '{}' width/height must be > 0",
                self.name
            )));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(SlotformError::validation(format!(
                "composition '{}' frame_rate must be finite and > 0",
                self.name
            )));
        }
        if !self.duration_sec.is_finite() || self.duration_sec <= 0.0 {
            return Err(SlotformError::validation(format!(
                "composition '{}' duration must be finite and > 0",
                self.name
            )));
        }
        Ok(())
    }
}

impl MediaAsset {
    /// True for media with a time dimension.
    pub fn is_timed(&self) -> bool {
        self.media_kind == MediaKind::Video
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_comp() -> CompositionNode {
        let mut comp = CompositionNode::new("main", 1080, 1920);
        comp.layers.push(LayerNode {
            name: "PH_1".to_string(),
            comment: None,
            markers: vec![],
            source: Some(ItemId(1)),
            kind: LayerKind::Av,
            props: LayerProps::default(),
        });
        comp
    }

    #[test]
    fn json_roundtrip_preserves_layers() {
        let comp = basic_comp();
        let s = serde_json::to_string_pretty(&comp).unwrap();
        let de: CompositionNode = serde_json::from_str(&s).unwrap();
        assert_eq!(de.layers.len(), 1);
        assert_eq!(de.layers[0].source, Some(ItemId(1)));
        assert!(!de.synthesized);
    }

    #[test]
    fn validate_rejects_zero_canvas() {
        let mut comp = basic_comp();
        comp.width = 0;
        assert!(comp.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_frame_rate() {
        let mut comp = basic_comp();
        comp.frame_rate = 0.0;
        assert!(comp.validate().is_err());
    }

    #[test]
    fn project_item_structural_accessors() {
        let item = ProjectItem::Folder(FolderItem {
            name: "footage".to_string(),
        });
        assert_eq!(item.name(), "footage");
        assert!(item.as_composition().is_none());
        assert!(item.as_media().is_none());
    }
}
