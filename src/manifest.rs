use std::path::Path;

use crate::error::{SlotformError, SlotformResult};

/// Portable template descriptor: produced by packaging, consumed by the
/// resolver's manifest-driven build path. UTF-8 JSON on disk, camelCase keys.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateManifest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub main_comp_name: String,
    #[serde(default)]
    pub preview: PreviewRefs,
    #[serde(default)]
    pub project: ProjectRef,
    pub placeholders: Vec<PlaceholderEntry>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jpg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp4: Option<String>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_file: Option<String>,
}

/// One declared slot. `index` is 1-based on disk; use [`PlaceholderEntry::zero_based`]
/// internally.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderEntry {
    pub index: u32,
    pub label: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Human-readable location: containing graph name + stack position.
    pub layer_ref: String,
}

impl PlaceholderEntry {
    pub fn zero_based(&self) -> SlotformResult<usize> {
        if self.index == 0 {
            return Err(SlotformError::validation(format!(
                "placeholder '{}' declares index 0; on-disk indices are 1-based",
                self.label
            )));
        }
        Ok(self.index as usize - 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Comp,
    Image,
    Video,
    Footage,
}

impl TemplateManifest {
    pub fn validate(&self) -> SlotformResult<()> {
        if self.id.trim().is_empty() {
            return Err(SlotformError::validation("manifest id must be non-empty"));
        }
        if self.main_comp_name.trim().is_empty() {
            return Err(SlotformError::validation(
                "manifest mainCompName must be non-empty",
            ));
        }
        for entry in &self.placeholders {
            entry.zero_based()?;
        }
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> SlotformResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SlotformError::serde(format!("serialize manifest: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn open_json(path: &Path) -> SlotformResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            SlotformError::document(format!("open manifest '{}': {e}", path.display()))
        })?;
        let manifest: Self = serde_json::from_slice(&bytes)
            .map_err(|e| SlotformError::serde(format!("parse manifest '{}': {e}", path.display())))?;
        manifest.validate()?;
        Ok(manifest)
    }
}
