use std::collections::{BTreeMap, BTreeSet};

use crate::{
    adapter,
    error::{Advisory, SlotformResult},
    identity::IdentityIndex,
    locate,
    manifest::TemplateManifest,
    model::{AssetSpec, ItemId, ProjectItem},
    project::Project,
};

/// Per-slot bindings, keyed by zero-based slot index.
pub type SlotBindings = BTreeMap<usize, AssetSpec>;

#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveOpts {
    /// Target frame for adapter synthesis. Defaults to the template root's
    /// canvas (or 1080x1920 when that is somehow unusable).
    pub target: Option<(u32, u32)>,
}

/// Outcome of one resolution call.
#[derive(Clone, Debug)]
pub struct ResolveReport {
    /// The duplicated root the substitutions were applied to. `None` only when
    /// the named template was missing.
    pub root: Option<ItemId>,
    /// Slots that were located and replaced.
    pub substituted: usize,
    /// Every located slot occurrence, filled or not.
    pub found: usize,
    /// Distinct zero-based indices that were located but left unfilled.
    pub unresolved: Vec<usize>,
    pub advisories: Vec<Advisory>,
}

/// Value-type traversal context: one shared visited-set of composition
/// identities per call, never aliased across calls.
#[derive(Debug, Default)]
struct TraversalCtx {
    visited: BTreeSet<ItemId>,
}

impl TraversalCtx {
    fn enter(&mut self, comp: ItemId) -> bool {
        self.visited.insert(comp)
    }
}

/// Resolve a template by name: duplicate it, substitute bound slots, report.
///
/// A missing template is an advisory, not an error: the call completes with
/// zero counts and the document untouched.
#[tracing::instrument(skip(project, bindings))]
pub fn resolve_template(
    project: &mut Project,
    template_name: &str,
    bindings: &SlotBindings,
    opts: ResolveOpts,
) -> SlotformResult<ResolveReport> {
    let Some(root) = project.find_composition(template_name) else {
        tracing::warn!(template = template_name, "template not found");
        return Ok(ResolveReport {
            root: None,
            substituted: 0,
            found: 0,
            unresolved: Vec::new(),
            advisories: vec![Advisory::TemplateNotFound(template_name.to_string())],
        });
    };
    resolve(project, root, bindings, opts)
}

/// Resolve against an explicit root composition.
///
/// The root is duplicated first and only the duplicate is mutated. The whole
/// mutation runs inside one undo group; a substitution error aborts the
/// remaining traversal but the duplicate is not rolled back.
#[tracing::instrument(skip(project, bindings))]
pub fn resolve(
    project: &mut Project,
    root: ItemId,
    bindings: &SlotBindings,
    opts: ResolveOpts,
) -> SlotformResult<ResolveReport> {
    project.comp(root)?.validate()?;

    project.with_undo_group("Build from template", |p| {
        let dup = p.duplicate_composition(root)?;
        let root_comp = p.comp(dup)?;
        let target = opts
            .target
            .filter(|&(w, h)| w > 0 && h > 0)
            .unwrap_or((root_comp.width, root_comp.height));

        let mut pass = ResolvePass {
            project: p,
            identity: None,
            bindings,
            materialized: BTreeMap::new(),
            target,
            report: ResolveReport {
                root: Some(dup),
                substituted: 0,
                found: 0,
                unresolved: Vec::new(),
                advisories: Vec::new(),
            },
        };
        if bindings.is_empty() {
            pass.report.advisories.push(Advisory::NoMediaProvided);
        }

        let mut ctx = TraversalCtx::default();
        pass.walk(dup, &mut ctx)?;
        Ok(pass.finish())
    })
}

/// Flat multi-selection fallback: the Nth slot takes the Nth already-registered
/// asset, substituted as-is with no adapter synthesis.
#[tracing::instrument(skip(project, selection))]
pub fn resolve_with_selection(
    project: &mut Project,
    root: ItemId,
    selection: &[ItemId],
) -> SlotformResult<ResolveReport> {
    project.comp(root)?.validate()?;

    project.with_undo_group("Build from selection", |p| {
        let dup = p.duplicate_composition(root)?;
        let mut pass = SelectionPass {
            project: p,
            selection,
            report: ResolveReport {
                root: Some(dup),
                substituted: 0,
                found: 0,
                unresolved: Vec::new(),
                advisories: Vec::new(),
            },
        };
        if selection.is_empty() {
            pass.report.advisories.push(Advisory::NoMediaProvided);
        }

        let mut ctx = TraversalCtx::default();
        pass.walk(dup, &mut ctx)?;
        Ok(pass.finish())
    })
}

/// Manifest-driven build: find the declared main comp, resolve, and report
/// declared slots that were never bound.
pub fn build_from_manifest(
    project: &mut Project,
    manifest: &TemplateManifest,
    bindings: &SlotBindings,
    opts: ResolveOpts,
) -> SlotformResult<ResolveReport> {
    manifest.validate()?;

    let mut report = resolve_template(project, &manifest.main_comp_name, bindings, opts)?;

    let mut declared_unbound: Vec<usize> = Vec::new();
    for entry in &manifest.placeholders {
        let idx = entry.zero_based()?;
        if !bindings.contains_key(&idx) && !declared_unbound.contains(&idx) {
            declared_unbound.push(idx);
        }
    }
    if !declared_unbound.is_empty() {
        declared_unbound.sort_unstable();
        report
            .advisories
            .push(Advisory::UnfilledSlots(declared_unbound));
    }
    Ok(report)
}

/// One bindings-driven substitution pass over a duplicated graph.
struct ResolvePass<'a> {
    project: &'a mut Project,
    /// Built lazily on first file binding; identity lookups are idempotent
    /// within this pass.
    identity: Option<IdentityIndex>,
    bindings: &'a SlotBindings,
    /// Per-slot memo of materialized handles, so duplicate indices reuse one
    /// adapter. `None` records a binding that could not be materialized.
    materialized: BTreeMap<usize, Option<ItemId>>,
    target: (u32, u32),
    report: ResolveReport,
}

impl ResolvePass<'_> {
    /// Depth-first pre-order. Recurses into a layer's sub-graph before
    /// evaluating that layer's own placeholder status, so nested slots resolve
    /// regardless of whether the containing layer is also a target.
    fn walk(&mut self, comp_id: ItemId, ctx: &mut TraversalCtx) -> SlotformResult<()> {
        if !ctx.enter(comp_id) {
            return Ok(());
        }

        let layer_count = self.project.comp(comp_id)?.layers.len();
        for i in 0..layer_count {
            let (source, layer) = {
                let comp = self.project.comp(comp_id)?;
                let layer = &comp.layers[i];
                (layer.source, layer.clone())
            };

            if let Some(src) = source
                && recursable_comp(self.project, src)
            {
                self.walk(src, ctx)?;
            }

            let source_name = source_name_for_locate(self.project, source);
            let Some(hit) = locate::locate(&layer, source_name.as_deref()) else {
                continue;
            };
            self.report.found += 1;

            match self.fill_for(hit.index)? {
                Some(new_source) => {
                    // In-place source swap; every other layer property stays.
                    self.project.comp_mut(comp_id)?.layers[i].source = Some(new_source);
                    self.report.substituted += 1;
                    tracing::debug!(
                        slot = hit.index,
                        layer = %layer.name,
                        via = ?hit.via,
                        "substituted placeholder"
                    );
                }
                None => {
                    if !self.report.unresolved.contains(&hit.index) {
                        self.report.unresolved.push(hit.index);
                    }
                }
            }
        }
        Ok(())
    }

    /// Materialized handle for a slot, memoized across duplicate indices.
    fn fill_for(&mut self, slot: usize) -> SlotformResult<Option<ItemId>> {
        if let Some(handle) = self.materialized.get(&slot) {
            return Ok(*handle);
        }

        let handle = match self.bindings.get(&slot) {
            None => None,
            Some(AssetSpec::CompByName(name)) => match self.project.find_composition(name) {
                Some(id) => Some(id),
                None => {
                    self.report.advisories.push(Advisory::BoundCompMissing {
                        slot,
                        name: name.clone(),
                    });
                    None
                }
            },
            Some(AssetSpec::File(path)) => {
                let identity = self
                    .identity
                    .get_or_insert_with(|| IdentityIndex::build(self.project));
                let asset = identity.resolve(self.project, path);
                let (tw, th) = self.target;
                Some(adapter::wrap(self.project, asset, tw, th, slot)?)
            }
        };

        self.materialized.insert(slot, handle);
        Ok(handle)
    }

    fn finish(mut self) -> ResolveReport {
        self.report.unresolved.sort_unstable();
        if !self.report.unresolved.is_empty() {
            self.report
                .advisories
                .push(Advisory::UnfilledSlots(self.report.unresolved.clone()));
        }
        self.report
    }
}

/// Flat-selection variant of the same traversal.
struct SelectionPass<'a> {
    project: &'a mut Project,
    selection: &'a [ItemId],
    report: ResolveReport,
}

impl SelectionPass<'_> {
    fn walk(&mut self, comp_id: ItemId, ctx: &mut TraversalCtx) -> SlotformResult<()> {
        if !ctx.enter(comp_id) {
            return Ok(());
        }

        let layer_count = self.project.comp(comp_id)?.layers.len();
        for i in 0..layer_count {
            let (source, layer) = {
                let comp = self.project.comp(comp_id)?;
                let layer = &comp.layers[i];
                (layer.source, layer.clone())
            };

            if let Some(src) = source
                && recursable_comp(self.project, src)
            {
                self.walk(src, ctx)?;
            }

            let source_name = source_name_for_locate(self.project, source);
            let Some(hit) = locate::locate(&layer, source_name.as_deref()) else {
                continue;
            };
            self.report.found += 1;

            match self.selection.get(hit.index) {
                Some(&asset) => {
                    self.project.comp_mut(comp_id)?.layers[i].source = Some(asset);
                    self.report.substituted += 1;
                }
                None => {
                    if !self.report.unresolved.contains(&hit.index) {
                        self.report.unresolved.push(hit.index);
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> ResolveReport {
        self.report.unresolved.sort_unstable();
        if !self.report.unresolved.is_empty() {
            self.report
                .advisories
                .push(Advisory::UnfilledSlots(self.report.unresolved.clone()));
        }
        self.report
    }
}

/// True when `id` names a composition the traversal may descend into.
/// Synthesized adapter comps are opaque.
fn recursable_comp(project: &Project, id: ItemId) -> bool {
    matches!(project.get(id), Some(ProjectItem::Composition(c)) if !c.synthesized)
}

/// Source name fed to the locator's third strategy. Synthesized adapter comps
/// are never treated as placeholder targets, so their names are withheld.
fn source_name_for_locate(project: &Project, source: Option<ItemId>) -> Option<String> {
    let item = project.get(source?)?;
    if let ProjectItem::Composition(c) = item
        && c.synthesized
    {
        return None;
    }
    Some(item.name().to_string())
}
