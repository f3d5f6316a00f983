use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use slotform::{
    AssetSpec, FlatPreviewRenderer, MarkCounter, PackageMeta, PackageOpts, Project, ResolveOpts,
    SlotBindings, TemplateManifest, packager, resolve,
};

#[derive(Parser, Debug)]
#[command(name = "slotform", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a composition from a packaged template manifest.
    Build(BuildArgs),
    /// Fill a template comp from an ordered media list (flat fallback).
    Fill(FillArgs),
    /// Write placeholder markers onto layers of a comp.
    Mark(MarkArgs),
    /// Package an authored comp into a template directory.
    Pack(PackArgs),
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Project document JSON.
    #[arg(long)]
    project: PathBuf,

    /// Template manifest JSON (template.json).
    #[arg(long)]
    manifest: PathBuf,

    /// Per-slot media file, as `<1-based index>=<path>`; repeatable.
    #[arg(long = "slot", value_parser = parse_slot)]
    slots: Vec<(usize, PathBuf)>,

    /// Write the updated project back to this path.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FillArgs {
    /// Project document JSON.
    #[arg(long)]
    project: PathBuf,

    /// Template composition name.
    #[arg(long)]
    comp: String,

    /// Media files in slot order.
    media: Vec<PathBuf>,

    /// Write the updated project back to this path.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct MarkArgs {
    /// Project document JSON.
    #[arg(long)]
    project: PathBuf,

    /// Composition name holding the layers.
    #[arg(long)]
    comp: String,

    /// 1-based layer stack positions, in selection order.
    layers: Vec<usize>,

    /// Write the updated project back to this path (defaults to in place).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PackArgs {
    /// Project document JSON.
    #[arg(long)]
    project: PathBuf,

    /// Root composition name.
    #[arg(long)]
    comp: String,

    /// Template id (package folder name).
    #[arg(long)]
    id: String,

    /// Display name; defaults to the id.
    #[arg(long)]
    name: Option<String>,

    #[arg(long, default_value = "")]
    description: String,

    /// Output folder the package directory is created under.
    #[arg(long)]
    out: PathBuf,

    /// Skip copying referenced media into the package.
    #[arg(long)]
    no_collect: bool,

    /// Persist the whole document instead of the reduced dependency closure.
    #[arg(long)]
    no_reduce: bool,
}

fn parse_slot(s: &str) -> Result<(usize, PathBuf), String> {
    let (idx, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <index>=<path>, got '{s}'"))?;
    let n: usize = idx.parse().map_err(|e| format!("bad slot index '{idx}': {e}"))?;
    if n == 0 {
        return Err("slot indices are 1-based".to_string());
    }
    Ok((n - 1, PathBuf::from(path)))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Build(args) => cmd_build(args),
        Command::Fill(args) => cmd_fill(args),
        Command::Mark(args) => cmd_mark(args),
        Command::Pack(args) => cmd_pack(args),
    }
}

fn open_project(path: &PathBuf) -> anyhow::Result<Project> {
    Project::open_json(path).with_context(|| format!("open project '{}'", path.display()))
}

fn save_project(project: &Project, path: &PathBuf) -> anyhow::Result<()> {
    project
        .save_json(path)
        .with_context(|| format!("write project '{}'", path.display()))
}

fn print_report(report: &slotform::ResolveReport) {
    eprintln!(
        "substituted {} of {} found slot(s)",
        report.substituted, report.found
    );
    for advisory in &report.advisories {
        eprintln!("note: {advisory}");
    }
}

fn cmd_build(args: BuildArgs) -> anyhow::Result<()> {
    let mut project = open_project(&args.project)?;
    let manifest = TemplateManifest::open_json(&args.manifest)
        .with_context(|| format!("open manifest '{}'", args.manifest.display()))?;

    let bindings: SlotBindings = args
        .slots
        .into_iter()
        .map(|(idx, path)| (idx, AssetSpec::File(path)))
        .collect();

    let report =
        resolve::build_from_manifest(&mut project, &manifest, &bindings, ResolveOpts::default())?;
    print_report(&report);

    if let Some(out) = &args.out {
        save_project(&project, out)?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn cmd_fill(args: FillArgs) -> anyhow::Result<()> {
    let mut project = open_project(&args.project)?;
    let root = project
        .find_composition(&args.comp)
        .with_context(|| format!("composition '{}' not found", args.comp))?;

    let selection: Vec<_> = args
        .media
        .iter()
        .map(|path| project.import_media(path, None))
        .collect();

    let report = resolve::resolve_with_selection(&mut project, root, &selection)?;
    print_report(&report);

    if let Some(out) = &args.out {
        save_project(&project, out)?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn cmd_mark(args: MarkArgs) -> anyhow::Result<()> {
    let mut project = open_project(&args.project)?;
    let comp_id = project
        .find_composition(&args.comp)
        .with_context(|| format!("composition '{}' not found", args.comp))?;
    if args.layers.is_empty() {
        anyhow::bail!("no layer positions given");
    }

    let mut counter = MarkCounter::new();
    let marked = packager::mark_layers(&mut project, comp_id, &args.layers, &mut counter)?;
    eprintln!("marked {marked} layer(s) as placeholders");

    let out = args.out.as_ref().unwrap_or(&args.project);
    save_project(&project, out)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_pack(args: PackArgs) -> anyhow::Result<()> {
    let project = open_project(&args.project)?;
    let root = project
        .find_composition(&args.comp)
        .with_context(|| format!("composition '{}' not found", args.comp))?;

    let meta = PackageMeta {
        id: args.id.clone(),
        name: args.name.unwrap_or(args.id),
        description: args.description,
    };
    let opts = PackageOpts {
        collect_assets: !args.no_collect,
        reduce_project: !args.no_reduce,
    };

    let report = packager::package(
        &project,
        root,
        &meta,
        &args.out,
        &FlatPreviewRenderer::new(),
        opts,
    )?;

    for advisory in &report.advisories {
        eprintln!("note: {advisory}");
    }
    match &report.manifest {
        Some(manifest) => eprintln!(
            "packaged {} placeholder(s) into {}",
            manifest.placeholders.len(),
            report.package_dir.display()
        ),
        None => eprintln!("nothing packaged"),
    }
    Ok(())
}
