use std::path::{Path, PathBuf};

use slotform::{
    AssetSpec, CompositionNode, FlatPreviewRenderer, ItemId, LayerKind, LayerNode, MarkCounter,
    Marker, MediaAsset, MediaKind, PackageMeta, PackageOpts, PreviewRenderer, Project,
    ProjectItem, ResolveOpts, SlotBindings, SlotformResult, TemplateManifest, packager, resolve,
};

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "slotform_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn av_layer(name: &str, source: Option<ItemId>) -> LayerNode {
    LayerNode {
        name: name.to_string(),
        comment: None,
        markers: vec![],
        source,
        kind: LayerKind::Av,
        props: Default::default(),
    }
}

fn add_video(project: &mut Project, path: &str) -> ItemId {
    project.add_item(ProjectItem::Media(MediaAsset {
        name: Path::new(path)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned(),
        path: PathBuf::from(path),
        uri: None,
        media_kind: MediaKind::Video,
        width: Some(1920),
        height: Some(1080),
        frame_rate: Some(30.0),
        duration_sec: Some(8.0),
    }))
}

/// Authored template: MAIN holds two placeholder layers and a nested comp
/// carrying a third.
fn authored_project() -> (Project, ItemId) {
    let mut project = Project::new();
    let stub_a = add_video(&mut project, "/stub/a.mp4");
    let stub_b = add_video(&mut project, "/stub/b.mp4");

    let nested = project.add_item(ProjectItem::Composition(CompositionNode::new(
        "intro", 1080, 1920,
    )));
    project
        .comp_mut(nested)
        .unwrap()
        .layers
        .push(av_layer("nested slot", Some(stub_b)));

    let root = project.add_item(ProjectItem::Composition(CompositionNode::new(
        "TEMPLATE_MAIN",
        1080,
        1920,
    )));
    project.comp_mut(root).unwrap().layers.extend([
        av_layer("hero", Some(stub_a)),
        av_layer("logo", Some(stub_a)),
        av_layer("opener", Some(nested)),
    ]);
    (project, root)
}

#[test]
fn mark_extract_package_build_roundtrip() {
    let tmp = temp_dir("roundtrip");
    std::fs::create_dir_all(&tmp).unwrap();

    let (mut project, root) = authored_project();
    let nested = project.find_composition("intro").unwrap();

    // Operator marks the two root layers and the nested one.
    let mut counter = MarkCounter::new();
    packager::mark_layers(&mut project, root, &[1, 2], &mut counter).unwrap();
    packager::mark_layers(&mut project, nested, &[1], &mut counter).unwrap();

    let report = packager::package(
        &project,
        root,
        &PackageMeta {
            id: "basic_story".to_string(),
            name: "Basic Story".to_string(),
            description: "roundtrip fixture".to_string(),
        },
        &tmp,
        &FlatPreviewRenderer::new(),
        // Stub media paths do not exist on disk; skip the copy step.
        PackageOpts {
            collect_assets: false,
            reduce_project: true,
        },
    )
    .unwrap();

    let manifest = report.manifest.expect("manifest written");
    assert_eq!(manifest.main_comp_name, "TEMPLATE_MAIN");
    assert_eq!(manifest.placeholders.len(), 3);
    // On-disk indices are 1-based and ascending.
    assert_eq!(
        manifest
            .placeholders
            .iter()
            .map(|p| p.index)
            .collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(report.package_dir.join("template.json").exists());
    assert!(report.package_dir.join("preview.jpg").exists());
    assert!(report.package_dir.join("project.json").exists());

    // The packaged artifacts alone reconstruct a buildable template.
    let mut packaged =
        Project::open_json(&report.package_dir.join("project.json")).unwrap();
    let reloaded =
        TemplateManifest::open_json(&report.package_dir.join("template.json")).unwrap();

    let bindings: SlotBindings = reloaded
        .placeholders
        .iter()
        .map(|p| {
            (
                p.zero_based().unwrap(),
                AssetSpec::File(PathBuf::from(format!("/in/media_{}.mp4", p.index))),
            )
        })
        .collect();

    let built =
        resolve::build_from_manifest(&mut packaged, &reloaded, &bindings, ResolveOpts::default())
            .unwrap();
    // One binding per declared slot: substituted count equals declared count.
    assert_eq!(built.substituted, reloaded.placeholders.len());
    assert_eq!(built.found, reloaded.placeholders.len());
    assert!(built.unresolved.is_empty());

    std::fs::remove_dir_all(&tmp).ok();
}

struct FailingRenderer;

impl PreviewRenderer for FailingRenderer {
    fn render(&self, _: &Project, _: ItemId, _: &Path) -> SlotformResult<()> {
        Err(slotform::SlotformError::document("render queue unavailable"))
    }
}

#[test]
fn package_survives_preview_failure() {
    let tmp = temp_dir("preview_fail");
    std::fs::create_dir_all(&tmp).unwrap();

    let (mut project, root) = authored_project();
    let mut counter = MarkCounter::new();
    packager::mark_layers(&mut project, root, &[1], &mut counter).unwrap();

    let report = packager::package(
        &project,
        root,
        &PackageMeta {
            id: "t".to_string(),
            name: "T".to_string(),
            description: String::new(),
        },
        &tmp,
        &FailingRenderer,
        PackageOpts {
            collect_assets: false,
            reduce_project: true,
        },
    )
    .unwrap();

    let manifest = report.manifest.expect("manifest still written");
    assert!(manifest.preview.jpg.is_none());
    assert!(report.package_dir.join("template.json").exists());
    assert!(
        report
            .advisories
            .iter()
            .any(|a| matches!(a, slotform::Advisory::PreviewRenderFailed(_)))
    );

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn package_collects_existing_footage() {
    let tmp = temp_dir("collect");
    let media_dir = tmp.join("media");
    std::fs::create_dir_all(&media_dir).unwrap();
    let clip = media_dir.join("clip.mp4");
    std::fs::write(&clip, b"not really a video").unwrap();

    let mut project = Project::new();
    let media = project.import_media(&clip, None);
    let root = project.add_item(ProjectItem::Composition(CompositionNode::new(
        "MAIN", 1080, 1920,
    )));
    let mut layer = av_layer("clip", Some(media));
    layer.markers.push(Marker {
        time_sec: 0.0,
        comment: "PH:1_clip".to_string(),
    });
    project.comp_mut(root).unwrap().layers.push(layer);

    let report = packager::package(
        &project,
        root,
        &PackageMeta {
            id: "bundle".to_string(),
            name: "Bundle".to_string(),
            description: String::new(),
        },
        &tmp,
        &FlatPreviewRenderer::new(),
        PackageOpts::default(),
    )
    .unwrap();

    assert!(report.advisories.is_empty(), "{:?}", report.advisories);
    assert!(report.package_dir.join("footage/clip.mp4").exists());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn no_placeholders_packages_nothing() {
    let tmp = temp_dir("empty");
    std::fs::create_dir_all(&tmp).unwrap();

    let (project, root) = authored_project();
    let report = packager::package(
        &project,
        root,
        &PackageMeta {
            id: "empty".to_string(),
            name: "Empty".to_string(),
            description: String::new(),
        },
        &tmp,
        &FlatPreviewRenderer::new(),
        PackageOpts::default(),
    )
    .unwrap();

    assert!(report.manifest.is_none());
    assert_eq!(
        report.advisories,
        vec![slotform::Advisory::NoPlaceholdersFound]
    );
    assert!(!report.package_dir.exists());

    std::fs::remove_dir_all(&tmp).ok();
}
