use crate::{
    error::SlotformResult,
    model::{CompositionNode, ItemId, LayerKind, LayerNode, LayerProps, ProjectItem},
    project::Project,
};

/// Target frame used when the template does not declare one (portrait 9:16).
pub const DEFAULT_TARGET_WIDTH: u32 = 1080;
pub const DEFAULT_TARGET_HEIGHT: u32 = 1920;

/// Fixed conservative duration for synthesized wrappers, independent of the
/// source's natural length.
pub const ADAPTER_DURATION_SEC: f64 = 10.0;

const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Wrap raw media into a frame-normalized sub-graph.
///
/// Builds a new composition sized to the target frame containing one layer
/// referencing `asset`, scaled uniformly by the larger axis ratio: a "cover"
/// fit that fills the frame and may crop edges, never letterboxes. The comp is
/// flagged `synthesized`, so the resolver neither recurses into it nor treats
/// it as a placeholder target.
///
/// Naming is deterministic per slot index within one build, so repeated builds
/// produce recognizable artifacts that do not collide across slots.
pub fn wrap(
    project: &mut Project,
    asset: ItemId,
    target_width: u32,
    target_height: u32,
    slot_index: usize,
) -> SlotformResult<ItemId> {
    let media = project.media(asset)?;

    let scale_pct = cover_scale_pct(
        media.width.unwrap_or(target_width),
        media.height.unwrap_or(target_height),
        target_width,
        target_height,
    );
    let frame_rate = media.frame_rate.unwrap_or(DEFAULT_FRAME_RATE);
    let stem = media
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| media.name.clone());

    let mut comp = CompositionNode::new(
        format!("PH{} Adapter {stem}", slot_index + 1),
        target_width,
        target_height,
    );
    comp.frame_rate = frame_rate;
    comp.duration_sec = ADAPTER_DURATION_SEC;
    comp.synthesized = true;
    comp.layers.push(LayerNode {
        name: stem,
        comment: None,
        markers: vec![],
        source: Some(asset),
        kind: LayerKind::Av,
        props: LayerProps {
            position: [f64::from(target_width) / 2.0, f64::from(target_height) / 2.0],
            scale_pct: [scale_pct, scale_pct],
            ..LayerProps::default()
        },
    });

    tracing::debug!(
        slot = slot_index,
        comp = %comp.name,
        scale_pct,
        "synthesized adapter sub-graph"
    );
    Ok(project.add_item(ProjectItem::Composition(comp)))
}

/// Uniform cover-fit scale in percent: the larger of the two axis ratios.
fn cover_scale_pct(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> f64 {
    if src_w == 0 || src_h == 0 {
        return 100.0;
    }
    let sx = f64::from(target_w) / f64::from(src_w);
    let sy = f64::from(target_h) / f64::from(src_h);
    sx.max(sy) * 100.0
}
