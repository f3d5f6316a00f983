use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::{
    error::{Advisory, SlotformError, SlotformResult},
    locate,
    manifest::{ContentType, PlaceholderEntry, PreviewRefs, ProjectRef, TemplateManifest},
    model::{ItemId, LayerKind, Marker, MediaKind, ProjectItem},
    preview::PreviewRenderer,
    project::{FOOTAGE_DIR, Project},
};

/// Session-persistent marking counter, threaded explicitly through marking
/// calls instead of hiding in module state. Resettable between templates.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkCounter {
    next: u32,
}

impl MarkCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next 1-based placeholder index.
    pub fn advance(&mut self) -> u32 {
        self.next += 1;
        self.next
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Write placeholder markers onto the given layers (1-based stack positions),
/// in the order the operator selected them. One undo group per call.
pub fn mark_layers(
    project: &mut Project,
    comp_id: ItemId,
    stack_positions: &[usize],
    counter: &mut MarkCounter,
) -> SlotformResult<usize> {
    project.with_undo_group("Mark Placeholders", |p| {
        let mut marked = 0usize;
        for &pos in stack_positions {
            let comp = p.comp_mut(comp_id)?;
            if pos == 0 || pos > comp.layers.len() {
                return Err(SlotformError::extraction(format!(
                    "layer position {pos} out of range (comp has {} layers)",
                    comp.layers.len()
                )));
            }
            let layer = &mut comp.layers[pos - 1];
            let index = counter.advance();
            let label = sanitize_label(&layer.name);
            layer.markers.push(Marker {
                time_sec: layer.props.in_point_sec,
                comment: format!("PH:{index}_{label}"),
            });
            marked += 1;
        }
        tracing::debug!(marked, "marked placeholder layers");
        Ok(marked)
    })
}

/// Marker labels are written with word characters only so they survive the
/// locator's label capture.
fn sanitize_label(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "slot".to_string()
    } else {
        cleaned
    }
}

/// One discovered placeholder, in traversal order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedSlot {
    /// Zero-based internally; written 1-based to the manifest.
    pub index: usize,
    pub label: String,
    pub content_type: ContentType,
    /// Containing graph name + stack position.
    pub location: String,
}

/// Read-only manifest extraction over the root graph.
///
/// Same cycle-guarded pre-order shared-visited-set traversal as resolution,
/// but only the tamper-resistant marker/comment forms identify slots. Results
/// are sorted ascending by index (stable); duplicate indices stay as distinct
/// entries.
#[tracing::instrument(skip(project))]
pub fn extract(project: &Project, root: ItemId) -> SlotformResult<Vec<ExtractedSlot>> {
    let mut visited = BTreeSet::new();
    let mut slots = Vec::new();
    walk_extract(project, root, &mut visited, &mut slots)?;
    slots.sort_by_key(|s| s.index);
    Ok(slots)
}

fn walk_extract(
    project: &Project,
    comp_id: ItemId,
    visited: &mut BTreeSet<ItemId>,
    out: &mut Vec<ExtractedSlot>,
) -> SlotformResult<()> {
    if !visited.insert(comp_id) {
        return Ok(());
    }
    let comp = project.comp(comp_id)?;

    for (i, layer) in comp.layers.iter().enumerate() {
        if let Some(src) = layer.source
            && let Some(ProjectItem::Composition(sub)) = project.get(src)
            && !sub.synthesized
        {
            walk_extract(project, src, visited, out)?;
        }

        let Some(hit) = locate::locate_marker_or_comment(layer) else {
            continue;
        };

        let label = hit
            .label
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| layer.name.clone());
        out.push(ExtractedSlot {
            index: hit.index,
            label,
            content_type: infer_content_type(project, layer),
            location: format!("{} / Layer {}", comp.name, i + 1),
        });
    }
    Ok(())
}

/// Content-type inference precedence: text-capable layer, comp source, still
/// media, timed media, anything else.
fn infer_content_type(project: &Project, layer: &crate::model::LayerNode) -> ContentType {
    if layer.kind == LayerKind::Text {
        return ContentType::Text;
    }
    match layer.source.and_then(|id| project.get(id)) {
        Some(ProjectItem::Composition(_)) => ContentType::Comp,
        Some(ProjectItem::Media(m)) => match m.media_kind {
            MediaKind::Still => ContentType::Image,
            MediaKind::Video => ContentType::Video,
            MediaKind::Other => ContentType::Footage,
        },
        _ => ContentType::Footage,
    }
}

/// Operator-supplied template metadata for packaging.
#[derive(Clone, Debug)]
pub struct PackageMeta {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Copy, Debug)]
pub struct PackageOpts {
    /// Copy every referenced media file into the package's footage folder.
    pub collect_assets: bool,
    /// Persist only the root graph's dependency closure instead of the whole
    /// document.
    pub reduce_project: bool,
}

impl Default for PackageOpts {
    fn default() -> Self {
        Self {
            collect_assets: true,
            reduce_project: true,
        }
    }
}

#[derive(Debug)]
pub struct PackageReport {
    pub package_dir: PathBuf,
    /// `None` when no placeholders were found and nothing was written.
    pub manifest: Option<TemplateManifest>,
    pub advisories: Vec<Advisory>,
}

/// Package an authored graph into a portable template directory.
///
/// Writes `template.json`, `preview.jpg`, `project.json` and optionally a
/// `footage/` bundle under `<out_dir>/<meta.id>/`. Preview rendering, asset
/// collection and project reduction are each best-effort: a failure becomes an
/// advisory and the rest of the package still lands.
#[tracing::instrument(skip(project, renderer), fields(template = %meta.id))]
pub fn package(
    project: &Project,
    root: ItemId,
    meta: &PackageMeta,
    out_dir: &Path,
    renderer: &dyn PreviewRenderer,
    opts: PackageOpts,
) -> SlotformResult<PackageReport> {
    if meta.id.trim().is_empty() {
        return Err(SlotformError::validation("template id must be non-empty"));
    }
    let root_comp = project.comp(root)?;
    root_comp.validate()?;

    let mut advisories = Vec::new();
    let package_dir = out_dir.join(&meta.id);

    let slots = extract(project, root)?;
    if slots.is_empty() {
        tracing::warn!("no placeholders found; nothing packaged");
        return Ok(PackageReport {
            package_dir,
            manifest: None,
            advisories: vec![Advisory::NoPlaceholdersFound],
        });
    }

    std::fs::create_dir_all(&package_dir)?;

    let mut preview = PreviewRefs::default();
    let preview_path = package_dir.join("preview.jpg");
    match renderer.render(project, root, &preview_path) {
        Ok(()) => preview.jpg = Some("preview.jpg".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "preview render failed");
            advisories.push(Advisory::PreviewRenderFailed(e.to_string()));
        }
    }

    let closure = dependency_closure(project, root)?;

    if opts.collect_assets
        && let Err(msg) = collect_assets(project, &closure, &package_dir)
    {
        tracing::warn!(error = %msg, "asset collection failed");
        advisories.push(Advisory::AssetCollectionFailed(msg));
    }

    let mut project_ref = ProjectRef::default();
    let project_path = package_dir.join("project.json");
    let persist_result = if opts.reduce_project {
        reduce_to_closure(project, root, &closure)
            .and_then(|(reduced, _)| reduced.save_json(&project_path))
    } else {
        project.save_json(&project_path)
    };
    match persist_result {
        Ok(()) => project_ref.project_file = Some("project.json".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "project persist failed");
            advisories.push(Advisory::ReduceProjectFailed(e.to_string()));
        }
    }

    let manifest = TemplateManifest {
        id: meta.id.clone(),
        name: meta.name.clone(),
        description: meta.description.clone(),
        main_comp_name: root_comp.name.clone(),
        preview,
        project: project_ref,
        placeholders: slots
            .iter()
            .map(|s| PlaceholderEntry {
                index: (s.index + 1) as u32,
                label: s.label.clone(),
                content_type: s.content_type,
                layer_ref: s.location.clone(),
            })
            .collect(),
    };
    manifest.save_json(&package_dir.join("template.json"))?;

    tracing::info!(
        placeholders = manifest.placeholders.len(),
        dir = %package_dir.display(),
        "package written"
    );
    Ok(PackageReport {
        package_dir,
        manifest: Some(manifest),
        advisories,
    })
}

/// Item ids reachable from the root graph: compositions via layer recursion,
/// media via layer sources. Folders never participate.
fn dependency_closure(project: &Project, root: ItemId) -> SlotformResult<BTreeSet<ItemId>> {
    let mut visited = BTreeSet::new();
    let mut closure = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(comp_id) = stack.pop() {
        if !visited.insert(comp_id) {
            continue;
        }
        closure.insert(comp_id);
        for layer in &project.comp(comp_id)?.layers {
            let Some(src) = layer.source else { continue };
            match project.get(src) {
                Some(ProjectItem::Composition(_)) => stack.push(src),
                Some(ProjectItem::Media(_)) => {
                    closure.insert(src);
                }
                _ => {}
            }
        }
    }
    Ok(closure)
}

/// Copy each referenced media file into `<package>/footage/`. Returns a
/// summary message when one or more copies fail.
fn collect_assets(
    project: &Project,
    closure: &BTreeSet<ItemId>,
    package_dir: &Path,
) -> Result<(), String> {
    let footage_dir = package_dir.join(FOOTAGE_DIR);
    std::fs::create_dir_all(&footage_dir).map_err(|e| e.to_string())?;

    let mut failures = Vec::new();
    for &id in closure {
        let Some(ProjectItem::Media(media)) = project.get(id) else {
            continue;
        };
        let file_name = media
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| media.name.clone());
        if let Err(e) = std::fs::copy(&media.path, footage_dir.join(&file_name)) {
            failures.push(format!("{}: {e}", media.path.display()));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures.join("; "))
    }
}

/// Restricted working copy: a fresh document holding only the closure, with
/// layer sources remapped onto the new arena.
fn reduce_to_closure(
    project: &Project,
    root: ItemId,
    closure: &BTreeSet<ItemId>,
) -> SlotformResult<(Project, ItemId)> {
    let mut reduced = Project::new();
    let mut remap: BTreeMap<ItemId, ItemId> = BTreeMap::new();

    for &old_id in closure {
        let item = project
            .get(old_id)
            .ok_or_else(|| SlotformError::document(format!("missing item {}", old_id.0)))?;
        let new_id = reduced.add_item(item.clone());
        remap.insert(old_id, new_id);
    }

    // Rewrite layer sources; references outside the closure cannot exist by
    // construction.
    for (_, new_id) in remap.iter() {
        if let Some(ProjectItem::Composition(comp)) = reduced.get_mut(*new_id) {
            for layer in &mut comp.layers {
                if let Some(src) = layer.source {
                    layer.source = remap.get(&src).copied();
                }
            }
        }
    }

    let new_root = remap
        .get(&root)
        .copied()
        .ok_or_else(|| SlotformError::document("root not in its own closure"))?;
    Ok((reduced, new_root))
}
