//! Slotform turns marked-up composition graphs ("templates") into finished
//! compositions by substituting placeholder slots with supplied media, and
//! packages authored graphs back into portable template descriptors.
//!
//! The core pieces:
//!
//! - [`locate`]: multi-strategy, precedence-ordered placeholder identification
//! - [`identity::IdentityIndex`]: asset-identity deduplication across imports
//! - [`adapter`]: cover-fit adapter sub-graphs for raw media
//! - [`resolve`]: cycle-safe recursive traversal + substitution
//! - [`packager`]: manifest extraction and template packaging
#![forbid(unsafe_code)]

pub mod adapter;
pub mod error;
pub mod identity;
pub mod locate;
pub mod manifest;
pub mod model;
pub mod packager;
pub mod preview;
pub mod project;
pub mod resolve;

pub use error::{Advisory, SlotformError, SlotformResult};
pub use manifest::{ContentType, PlaceholderEntry, TemplateManifest};
pub use model::{
    AssetSpec, CompositionNode, ItemId, LayerKind, LayerNode, Marker, MediaAsset, MediaKind,
    ProjectItem,
};
pub use packager::{ExtractedSlot, MarkCounter, PackageMeta, PackageOpts, PackageReport};
pub use preview::{FlatPreviewRenderer, PreviewRenderer};
pub use project::Project;
pub use resolve::{ResolveOpts, ResolveReport, SlotBindings};
