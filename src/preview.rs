use std::path::Path;

use crate::{error::SlotformResult, model::ItemId, project::Project};

/// Seam for the host's preview render. Packaging treats a failure here as an
/// advisory, never as a package-aborting error.
pub trait PreviewRenderer {
    fn render(&self, project: &Project, comp: ItemId, out_path: &Path) -> SlotformResult<()>;
}

/// Default stand-in renderer: writes a flat frame at the comp's canvas size.
/// Real rendering quality is an external collaborator's concern.
#[derive(Debug, Default)]
pub struct FlatPreviewRenderer {
    /// RGB fill; defaults to a dark slate.
    pub rgb: [u8; 3],
}

impl FlatPreviewRenderer {
    pub fn new() -> Self {
        Self { rgb: [18, 20, 28] }
    }
}

impl PreviewRenderer for FlatPreviewRenderer {
    fn render(&self, project: &Project, comp: ItemId, out_path: &Path) -> SlotformResult<()> {
        let comp = project.comp(comp)?;
        comp.validate()?;

        let [r, g, b] = self.rgb;
        let pixels: Vec<u8> = [r, g, b]
            .repeat(comp.width as usize * comp.height as usize);
        image::save_buffer_with_format(
            out_path,
            &pixels,
            comp.width,
            comp.height,
            image::ColorType::Rgb8,
            image::ImageFormat::Jpeg,
        )
        .map_err(|e| {
            crate::error::SlotformError::document(format!(
                "write preview '{}': {e}",
                out_path.display()
            ))
        })?;
        Ok(())
    }
}
