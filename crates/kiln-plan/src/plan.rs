//! Build plan: the registry of targets and its final resolution
//!
//! Targets are registered during configuration and may reference each other
//! by name before the referenced target exists. Nothing is expanded until
//! [`BuildPlan::resolve`] runs, which is the point where interface proxies
//! read their source's properties and lazy link references are rendered.

use crate::build_order::{BuildGraph, TargetNode};
use crate::error::{PlanError, PlanResult};
use crate::flags::{FlagProfile, SymbolVisibility};
use crate::targets::{LinkItem, Scope, Scoped, Target, TargetKind};
use crate::toolchain::{BuildType, Platform};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

/// Registry of every target declared during a configuration pass
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    targets: Vec<Target>,
    index: HashMap<String, usize>,
}

impl BuildPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target. Names must be unique.
    pub fn add_target(&mut self, target: Target) -> PlanResult<&mut Target> {
        target.validate().map_err(PlanError::InvalidTarget)?;
        if self.index.contains_key(&target.name) {
            return Err(PlanError::duplicate_target(&target.name));
        }

        tracing::debug!(target = %target.name, kind = %target.kind, "registered target");
        let slot = self.targets.len();
        self.index.insert(target.name.clone(), slot);
        self.targets.push(target);
        Ok(&mut self.targets[slot])
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.index.get(name).map(|&i| &self.targets[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Target> {
        self.index.get(name).map(|&i| &mut self.targets[i])
    }

    /// Get a target or fail with [`PlanError::TargetNotFound`]
    pub fn target(&self, name: &str) -> PlanResult<&Target> {
        self.get(name).ok_or_else(|| PlanError::target_not_found(name))
    }

    pub fn target_mut(&mut self, name: &str) -> PlanResult<&mut Target> {
        self.get_mut(name)
            .ok_or_else(|| PlanError::target_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Targets in registration order
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Dependency graph over registered targets.
    ///
    /// Edges are the explicit build-order dependencies plus every link entry
    /// naming a registered target. A bare library name that is not a target
    /// is an external library and adds no edge.
    pub fn build_graph(&self) -> PlanResult<BuildGraph> {
        let mut graph = BuildGraph::new();
        for target in &self.targets {
            let mut deps = target.dependencies.clone();
            for item in target
                .link_libraries
                .iter()
                .chain(target.link_options.iter())
                .map(|s| &s.value)
            {
                let Some(name) = item.referenced_target() else {
                    continue;
                };
                if !self.contains(name) {
                    if matches!(item, LinkItem::Target(_)) {
                        continue;
                    }
                    return Err(PlanError::target_not_found(format!(
                        "{} (referenced by {})",
                        name, target.name
                    )));
                }
                if name != target.name && !deps.iter().any(|d| d == name) {
                    deps.push(name.to_string());
                }
            }
            graph.add_node(TargetNode::new(&target.name).with_dependencies(deps));
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Evaluate the plan for `platform`.
    ///
    /// Targets are returned in configuration order. Proxies report the
    /// properties their consumers receive; everything else reports the
    /// properties it is built with.
    pub fn resolve(&self, platform: Platform) -> PlanResult<ResolvedPlan> {
        let graph = self.build_graph()?;
        let order = graph.compute_build_order()?;
        let resolver = Resolver::new(self, graph, platform);

        let mut targets = Vec::with_capacity(order.len());
        for name in &order {
            targets.push(resolver.resolve_target(self.target(name)?)?);
        }

        Ok(ResolvedPlan {
            platform,
            build_order: order,
            targets,
        })
    }
}

/// Usage requirements after expansion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Requirements {
    pub compile_definitions: Vec<String>,
    pub compile_options: Vec<String>,
    pub include_directories: Vec<PathBuf>,
    pub system_include_directories: Vec<PathBuf>,
    pub link_options: Vec<String>,
}

impl Requirements {
    fn merge(&mut self, other: Requirements) {
        extend_unique(&mut self.compile_definitions, other.compile_definitions);
        extend_unique(&mut self.compile_options, other.compile_options);
        extend_unique(&mut self.include_directories, other.include_directories);
        extend_unique(
            &mut self.system_include_directories,
            other.system_include_directories,
        );
        extend_unique(&mut self.link_options, other.link_options);
    }
}

fn extend_unique<T: PartialEq>(into: &mut Vec<T>, values: Vec<T>) {
    for value in values {
        if !into.contains(&value) {
            into.push(value);
        }
    }
}

/// A fully evaluated target, ready for the build engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTarget {
    pub name: String,
    pub kind: TargetKind,
    pub sources: Vec<PathBuf>,
    pub dependencies: Vec<String>,
    /// Toolchain flags followed by the target's own and inherited options
    pub compile_flags: Vec<String>,
    pub compile_definitions: Vec<String>,
    pub include_directories: Vec<PathBuf>,
    pub system_include_directories: Vec<PathBuf>,
    /// For proxies, the link line handed to consumers
    pub link_line: Vec<String>,
    pub link_options: Vec<String>,
    pub link_flags: Vec<String>,
    pub config_link_flags: BTreeMap<BuildType, Vec<String>>,
    pub visibility: SymbolVisibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_source: Option<String>,
}

/// The evaluated plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPlan {
    pub platform: Platform,
    pub build_order: Vec<String>,
    pub targets: Vec<ResolvedTarget>,
}

impl ResolvedPlan {
    pub fn get(&self, name: &str) -> Option<&ResolvedTarget> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn to_json(&self) -> PlanResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PlanError::Serialization(e.to_string()))
    }
}

/// Which entries of a scoped property list to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum View {
    /// What the target itself is built with
    Own,
    /// What consumers of the target receive
    Consumer,
    /// Every entry regardless of scope
    All,
}

impl View {
    fn includes(self, scope: Scope) -> bool {
        match self {
            Self::Own => scope.applies_to_self(),
            Self::Consumer => scope.visible_to_consumers(),
            Self::All => true,
        }
    }
}

fn select<T: Clone>(values: &[Scoped<T>], view: View) -> Vec<T> {
    values
        .iter()
        .filter(|s| view.includes(s.scope))
        .map(|s| s.value.clone())
        .collect()
}

fn entries(values: &[Scoped<LinkItem>], view: View) -> impl Iterator<Item = &LinkItem> {
    values
        .iter()
        .filter(move |s| view.includes(s.scope))
        .map(|s| &s.value)
}

/// One rendered link line entry
#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkEntry {
    /// Flags and explicit artifact paths, kept where they were written
    Fixed(String),
    /// Artifact of a shared library target
    Shared(String),
    /// Static archive or external library name
    Archive(String),
}

impl LinkEntry {
    fn into_text(self) -> String {
        match self {
            Self::Fixed(text) | Self::Shared(text) | Self::Archive(text) => text,
        }
    }
}

/// Drop repeated libraries from a rendered line.
///
/// Shared libraries keep their first occurrence. Archives keep their last,
/// so each one still follows everything that needs it. Fixed entries are
/// never dropped: whole-archive brackets must stay balanced.
fn dedup_link_entries(entries: Vec<LinkEntry>) -> Vec<LinkEntry> {
    let mut last_archive = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        if let LinkEntry::Archive(name) = entry {
            last_archive.insert(name.clone(), i);
        }
    }

    let mut seen_shared = HashSet::new();
    let mut kept = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let keep = match &entry {
            LinkEntry::Fixed(_) => true,
            LinkEntry::Shared(path) => seen_shared.insert(path.clone()),
            LinkEntry::Archive(name) => last_archive.get(name) == Some(&i),
        };
        if keep {
            kept.push(entry);
        }
    }
    kept
}

/// Evaluation state for one [`BuildPlan::resolve`] call.
///
/// Results are memoized per target and view; layered libraries would
/// otherwise be re-expanded once per path that reaches them.
struct Resolver<'a> {
    plan: &'a BuildPlan,
    graph: BuildGraph,
    platform: Platform,
    requirements_cache: RefCell<HashMap<(String, View), Requirements>>,
    link_cache: RefCell<HashMap<(String, View), Vec<LinkEntry>>>,
}

impl<'a> Resolver<'a> {
    fn new(plan: &'a BuildPlan, graph: BuildGraph, platform: Platform) -> Self {
        Self {
            plan,
            graph,
            platform,
            requirements_cache: RefCell::new(HashMap::new()),
            link_cache: RefCell::new(HashMap::new()),
        }
    }

    fn resolve_target(&self, target: &Target) -> PlanResult<ResolvedTarget> {
        let view = if target.is_proxy() {
            View::Consumer
        } else {
            View::Own
        };

        let requirements = self.requirements(target, view, &mut Vec::new())?;

        let link_line = self
            .expand(target, view, &mut Vec::new())?
            .into_iter()
            .map(LinkEntry::into_text)
            .collect();

        let profile = target
            .flag_profile
            .clone()
            .unwrap_or_else(FlagProfile::empty);

        let mut compile_flags = Vec::new();
        if target.kind.has_compile_step() {
            compile_flags = profile.compile_flags;
            extend_unique(&mut compile_flags, requirements.compile_options);
        }

        let dependencies = self
            .graph
            .get_node(&target.name)
            .map(|n| n.dependencies.clone())
            .unwrap_or_default();

        Ok(ResolvedTarget {
            name: target.name.clone(),
            kind: target.kind,
            sources: target.sources.clone(),
            dependencies,
            compile_flags,
            compile_definitions: requirements.compile_definitions,
            include_directories: requirements.include_directories,
            system_include_directories: requirements.system_include_directories,
            link_line,
            link_options: requirements.link_options,
            link_flags: profile.link_flags,
            config_link_flags: target.config_link_flags.clone(),
            visibility: profile.visibility,
            artifact: target.artifact_path(self.platform),
            install_destination: target.install_destination.clone(),
            proxy_source: target.proxy_source.clone(),
        })
    }

    /// Usage requirements of `target` under `view`, plus everything passed on
    /// by the targets its link entries refer to.
    ///
    /// A proxy mirrors the properties of its source library, read at this
    /// point rather than when the proxy was declared.
    fn requirements(
        &self,
        target: &Target,
        view: View,
        stack: &mut Vec<String>,
    ) -> PlanResult<Requirements> {
        let key = (target.name.clone(), view);
        if let Some(cached) = self.requirements_cache.borrow().get(&key) {
            return Ok(cached.clone());
        }
        enter(stack, &target.name)?;

        let mirrored = match &target.proxy_source {
            Some(source) => self.plan.target(source)?,
            None => target,
        };

        // repeated entries are dropped, e.g. a directory added by two helpers
        let mut requirements = Requirements::default();
        extend_unique(
            &mut requirements.compile_definitions,
            select(&mirrored.compile_definitions, view),
        );
        extend_unique(
            &mut requirements.compile_options,
            select(&mirrored.compile_options, view),
        );
        extend_unique(
            &mut requirements.include_directories,
            select(&mirrored.include_directories, view),
        );
        extend_unique(
            &mut requirements.system_include_directories,
            select(&mirrored.system_include_directories, view),
        );

        let mut link_options = Vec::new();
        self.render_items(entries(&target.link_options, view), &mut link_options, stack)?;
        extend_unique(
            &mut requirements.link_options,
            link_options.into_iter().map(LinkEntry::into_text).collect(),
        );
        let inherited = self.inherited(entries(&target.link_libraries, view), stack)?;
        requirements.merge(inherited);

        stack.pop();
        self.requirements_cache
            .borrow_mut()
            .insert(key, requirements.clone());
        Ok(requirements)
    }

    /// Requirements passed on through a list of link entries
    fn inherited<'i>(
        &self,
        items: impl Iterator<Item = &'i LinkItem>,
        stack: &mut Vec<String>,
    ) -> PlanResult<Requirements> {
        let mut requirements = Requirements::default();
        for item in items {
            match item {
                LinkItem::Target(name) => {
                    if let Some(dep) = self.plan.get(name) {
                        requirements.merge(self.requirements(dep, View::Consumer, stack)?);
                    }
                }
                LinkItem::LinkLibrariesOf(name) => {
                    let dep = self.plan.target(name)?;
                    enter(stack, name)?;
                    let inherited = self.inherited(entries(&dep.link_libraries, View::Own), stack)?;
                    stack.pop();
                    requirements.merge(inherited);
                }
                LinkItem::InterfaceLinkLibrariesOf(name) => {
                    let dep = self.plan.target(name)?;
                    enter(stack, name)?;
                    let inherited =
                        self.inherited(entries(&dep.link_libraries, View::Consumer), stack)?;
                    stack.pop();
                    requirements.merge(inherited);
                }
                LinkItem::TargetFile { .. } | LinkItem::Flag(_) => {}
            }
        }
        Ok(requirements)
    }

    /// Render the link entries of `target` under `view`
    fn expand(
        &self,
        target: &Target,
        view: View,
        stack: &mut Vec<String>,
    ) -> PlanResult<Vec<LinkEntry>> {
        let key = (target.name.clone(), view);
        if let Some(cached) = self.link_cache.borrow().get(&key) {
            return Ok(cached.clone());
        }
        enter(stack, &target.name)?;
        let mut out = Vec::new();
        self.render_items(entries(&target.link_libraries, view), &mut out, stack)?;
        stack.pop();

        let out = dedup_link_entries(out);
        self.link_cache.borrow_mut().insert(key, out.clone());
        Ok(out)
    }

    /// Render link entries, expanding target references recursively
    fn render_items<'i>(
        &self,
        items: impl Iterator<Item = &'i LinkItem>,
        out: &mut Vec<LinkEntry>,
        stack: &mut Vec<String>,
    ) -> PlanResult<()> {
        for item in items {
            match item {
                LinkItem::Flag(flag) => out.push(LinkEntry::Fixed(flag.clone())),
                LinkItem::TargetFile { target, prefix } => {
                    let path = self.artifact_of(target)?;
                    out.push(LinkEntry::Fixed(format!("{}{}", prefix, path)));
                }
                LinkItem::Target(name) => {
                    let Some(dep) = self.plan.get(name) else {
                        // not a plan target: an external library
                        out.push(LinkEntry::Archive(name.clone()));
                        continue;
                    };
                    let view = match dep.kind {
                        TargetKind::Executable => {
                            return Err(PlanError::InvalidTarget(format!(
                                "cannot link against executable '{}'",
                                dep.name
                            )));
                        }
                        TargetKind::InterfaceProxy => View::Consumer,
                        TargetKind::SharedLibrary => {
                            out.push(LinkEntry::Shared(self.artifact_of(name)?));
                            View::Consumer
                        }
                        // an archive's own dependencies are resolved by its consumer
                        TargetKind::StaticLibrary => {
                            out.push(LinkEntry::Archive(self.artifact_of(name)?));
                            View::All
                        }
                    };
                    out.extend(self.expand(dep, view, stack)?);
                }
                LinkItem::LinkLibrariesOf(name) => {
                    let dep = self.plan.target(name)?;
                    out.extend(self.expand(dep, View::Own, stack)?);
                }
                LinkItem::InterfaceLinkLibrariesOf(name) => {
                    let dep = self.plan.target(name)?;
                    out.extend(self.expand(dep, View::Consumer, stack)?);
                }
            }
        }
        Ok(())
    }

    fn artifact_of(&self, name: &str) -> PlanResult<String> {
        let target = self.plan.target(name)?;
        target.artifact_path(self.platform).ok_or_else(|| {
            PlanError::InvalidTarget(format!(
                "{} '{}' has no artifact to link",
                target.kind, target.name
            ))
        })
    }
}

fn enter(stack: &mut Vec<String>, name: &str) -> PlanResult<()> {
    if stack.iter().any(|n| n == name) {
        stack.push(name.to_string());
        return Err(PlanError::CircularDependency(stack.join(" -> ")));
    }
    stack.push(name.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dedup_link_entries() {
        let line = vec![
            LinkEntry::Fixed("-Wl,--whole-archive".into()),
            LinkEntry::Archive("lib/liba.a".into()),
            LinkEntry::Fixed("-Wl,--no-whole-archive".into()),
            LinkEntry::Shared("lib/libs.so".into()),
            LinkEntry::Archive("lib/libb.a".into()),
            LinkEntry::Archive("lib/liba.a".into()),
            LinkEntry::Shared("lib/libs.so".into()),
            LinkEntry::Fixed("-Wl,--whole-archive".into()),
        ];
        let texts: Vec<String> = dedup_link_entries(line)
            .into_iter()
            .map(LinkEntry::into_text)
            .collect();
        assert_eq!(
            texts,
            vec![
                "-Wl,--whole-archive",
                "-Wl,--no-whole-archive",
                "lib/libs.so",
                "lib/libb.a",
                "lib/liba.a",
                "-Wl,--whole-archive",
            ]
        );
    }
}
