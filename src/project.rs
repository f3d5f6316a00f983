use std::path::{Path, PathBuf};

use crate::{
    error::{SlotformError, SlotformResult},
    model::{CompositionNode, FolderItem, ItemId, MediaAsset, MediaKind, ProjectItem},
};

/// The host document: an arena of typed items referenced by [`ItemId`].
///
/// All graph structure (layer sources, nesting, reuse) is expressed through ids
/// into this arena, so reference cycles are representable and identity is
/// trivially stable per item.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Project {
    items: Vec<ProjectItem>,
    #[serde(skip)]
    undo_stack: Vec<UndoSnapshot>,
}

#[derive(Clone, Debug)]
struct UndoSnapshot {
    label: String,
    items: Vec<ProjectItem>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, item: ProjectItem) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(item);
        id
    }

    pub fn add_folder(&mut self, name: impl Into<String>) -> ItemId {
        self.add_item(ProjectItem::Folder(FolderItem { name: name.into() }))
    }

    pub fn get(&self, id: ItemId) -> Option<&ProjectItem> {
        self.items.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut ProjectItem> {
        self.items.get_mut(id.0 as usize)
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemId, &ProjectItem)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (ItemId(i as u32), item))
    }

    pub fn comp(&self, id: ItemId) -> SlotformResult<&CompositionNode> {
        self.get(id)
            .and_then(ProjectItem::as_composition)
            .ok_or_else(|| SlotformError::document(format!("item {} is not a composition", id.0)))
    }

    pub fn comp_mut(&mut self, id: ItemId) -> SlotformResult<&mut CompositionNode> {
        match self.get_mut(id) {
            Some(ProjectItem::Composition(c)) => Ok(c),
            _ => Err(SlotformError::document(format!(
                "item {} is not a composition",
                id.0
            ))),
        }
    }

    pub fn media(&self, id: ItemId) -> SlotformResult<&MediaAsset> {
        self.get(id)
            .and_then(ProjectItem::as_media)
            .ok_or_else(|| SlotformError::document(format!("item {} is not a media asset", id.0)))
    }

    /// First composition whose name matches exactly.
    pub fn find_composition(&self, name: &str) -> Option<ItemId> {
        self.items().find_map(|(id, item)| match item {
            ProjectItem::Composition(c) if c.name == name => Some(id),
            _ => None,
        })
    }

    pub fn media_items(&self) -> impl Iterator<Item = (ItemId, &MediaAsset)> {
        self.items().filter_map(|(id, item)| match item {
            ProjectItem::Media(m) => Some((id, m)),
            _ => None,
        })
    }

    /// Shallow duplicate: the comp itself is cloned under a unique name, nested
    /// comps stay shared with the original.
    pub fn duplicate_composition(&mut self, id: ItemId) -> SlotformResult<ItemId> {
        let mut copy = self.comp(id)?.clone();
        copy.name = self.unique_comp_name(&copy.name);
        Ok(self.add_item(ProjectItem::Composition(copy)))
    }

    fn unique_comp_name(&self, base: &str) -> String {
        let mut n = 1usize;
        loop {
            let candidate = if n == 1 {
                format!("{base} copy")
            } else {
                format!("{base} copy {n}")
            };
            if self.find_composition(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Register an external file as a new media asset. Identity dedup lives in
    /// [`crate::identity::IdentityIndex`]; this always creates a fresh item.
    pub fn import_media(&mut self, path: &Path, uri: Option<String>) -> ItemId {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let media_kind = media_kind_for_path(path);

        // Intrinsic still dimensions are read best-effort; a missing or
        // unreadable file imports with unknown dimensions.
        let (width, height) = if media_kind == MediaKind::Still {
            match image::image_dimensions(path) {
                Ok((w, h)) => (Some(w), Some(h)),
                Err(_) => (None, None),
            }
        } else {
            (None, None)
        };

        self.add_item(ProjectItem::Media(MediaAsset {
            name,
            path: path.to_path_buf(),
            uri,
            media_kind,
            width,
            height,
            frame_rate: None,
            duration_sec: None,
        }))
    }

    /// Run one user-triggered mutation inside a coarse undo group.
    ///
    /// The group is closed on every exit path: the pre-mutation snapshot is
    /// pushed onto the undo stack whether `f` returns `Ok` or `Err`.
    pub fn with_undo_group<T>(
        &mut self,
        label: &str,
        f: impl FnOnce(&mut Project) -> SlotformResult<T>,
    ) -> SlotformResult<T> {
        let snapshot = UndoSnapshot {
            label: label.to_string(),
            items: self.items.clone(),
        };
        let result = f(self);
        self.undo_stack.push(snapshot);
        result
    }

    /// Revert the most recent undo group. Returns its label.
    pub fn undo(&mut self) -> Option<String> {
        let snapshot = self.undo_stack.pop()?;
        self.items = snapshot.items;
        Some(snapshot.label)
    }

    pub fn save_json(&self, path: &Path) -> SlotformResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SlotformError::serde(format!("serialize project: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn open_json(path: &Path) -> SlotformResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            SlotformError::document(format!("open project '{}': {e}", path.display()))
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SlotformError::serde(format!("parse project '{}': {e}", path.display())))
    }
}

pub(crate) fn media_kind_for_path(path: &Path) -> MediaKind {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "tif" | "tiff" | "gif" | "bmp" | "webp" | "exr" | "tga" => {
            MediaKind::Still
        }
        "mp4" | "mov" | "avi" | "mkv" | "webm" | "m4v" | "mxf" => MediaKind::Video,
        _ => MediaKind::Other,
    }
}

/// Default name for the media bundle folder written by packaging.
pub const FOOTAGE_DIR: &str = "footage";
