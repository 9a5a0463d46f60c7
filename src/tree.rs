//! The per-package registry of branches and field histories.
//!
//! A [`Tree`] owns every [`Branch`] of one package together with the
//! [`Histories`] they share. Branch ids are assigned in creation order and a
//! fork can only be taken from an existing committed version, so every
//! ancestor has a smaller id than its descendants. [`Tree::checkout`] relies
//! on this to hand out the writer's `&mut Branch` next to shared views of
//! its ancestors.

use std::collections::{BTreeMap, BTreeSet};

use crate::branch::{Branch, BranchError, CommitInfo};
use crate::buffer::UpdateStats;
use crate::config::{ConfigError, TreeConfig};
use crate::element::{
    ArticleAtom, Declaration, Described, Documentation, Documented, Element, Histories, ModuleAtom, SymbolAtom,
};
use crate::fasces::{Fascis, Fasces};
use crate::route::{Composite, Diacritic, Route};
use crate::types::{Atom, BranchId, PackageIndex, Position, Revision, Version};

/// Error raised by branch management.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// No branch has this id.
    #[error("Branch not found: {0}")]
    UnknownBranch(BranchId),
    /// The version's branch exists but the revision was never committed.
    #[error("Version not found: {0}")]
    UnknownVersion(Version),
    /// A branch with this name already exists.
    #[error("Duplicate branch name: {0}")]
    DuplicateBranch(String),
    /// A branch write failed.
    #[error("Branch error: {0}")]
    Branch(#[from] BranchError),
    /// The configuration was rejected.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// All branches of one package.
#[derive(Debug)]
pub struct Tree {
    package: PackageIndex,
    config: TreeConfig,
    branches: Vec<Branch>,
    histories: Histories,
}

impl Tree {
    /// Create an empty tree with the default configuration.
    pub fn new(package: PackageIndex) -> Self {
        Self {
            package,
            config: TreeConfig::default(),
            branches: Vec::new(),
            histories: Histories::default(),
        }
    }

    /// Create an empty tree with a validated configuration.
    pub fn with_config(package: PackageIndex, config: TreeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            package,
            histories: Histories::with_limit(config.history_limit),
            config,
            branches: Vec::new(),
        })
    }

    /// The package this tree stores.
    pub fn package(&self) -> PackageIndex {
        self.package
    }

    /// Active configuration.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// All branches, in creation order.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Shared field histories.
    pub fn histories(&self) -> &Histories {
        &self.histories
    }

    /// Branch by id.
    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(id.index())
    }

    /// Branch by name.
    pub fn find(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|branch| branch.name() == name)
    }

    /// The configured trunk branch.
    pub fn trunk(&self) -> Option<&Branch> {
        self.find(&self.config.trunk)
    }

    /// Latest committed version of the trunk.
    pub fn default_version(&self) -> Option<Version> {
        self.trunk()?.latest()
    }

    /// Latest version tagged `tag`, preferring the trunk.
    pub fn resolve_tag(&self, tag: &str) -> Option<Version> {
        if let Some(version) = self.trunk().and_then(|trunk| trunk.find_tag(tag)) {
            return Some(version);
        }
        self.branches.iter().find_map(|branch| branch.find_tag(tag))
    }

    /// Create a branch with no ancestors.
    pub fn root(&mut self, name: impl Into<String>) -> Result<BranchId, TreeError> {
        let name = self.claim(name.into())?;
        let id = BranchId(self.branches.len() as u32);
        tracing::info!(package = %self.package, branch = %name, id = %id, "Created root branch");
        self.branches.push(Branch::new(id, name, None));
        Ok(id)
    }

    /// Fork a new branch from the committed version `from`.
    pub fn fork(&mut self, name: impl Into<String>, from: Version) -> Result<BranchId, TreeError> {
        let name = self.claim(name.into())?;
        let parent = self
            .branches
            .get_mut(from.branch.index())
            .ok_or(TreeError::UnknownBranch(from.branch))?;
        let ring = parent.ring_at(from.revision).ok_or_else(|| {
            tracing::warn!(branch = %name, from = %from, "Refusing to fork from an uncommitted revision");
            TreeError::UnknownVersion(from)
        })?;
        parent.freeze(from.revision);
        let id = BranchId(self.branches.len() as u32);
        tracing::info!(
            package = %self.package,
            branch = %name,
            id = %id,
            from = %from,
            "Forked branch"
        );
        self.branches.push(Branch::new(id, name, Some((from, ring))));
        Ok(id)
    }

    /// The fork chain ending at `version`, root first.
    pub fn lineage(&self, version: Version) -> Result<Vec<Version>, TreeError> {
        let mut versions = Vec::new();
        let mut cursor = Some(version);
        while let Some(current) = cursor {
            let branch = self.branch(current.branch).ok_or(TreeError::UnknownBranch(current.branch))?;
            versions.push(current);
            cursor = branch.fork();
        }
        versions.reverse();
        Ok(versions)
    }

    /// A read view of everything visible at `version`.
    pub fn fasces(&self, version: Version) -> Result<Fasces<'_>, TreeError> {
        chain(&self.branches, version)
    }

    /// Open `id` for writing.
    pub fn checkout(&mut self, id: BranchId) -> Result<Checkout<'_>, TreeError> {
        if id.index() >= self.branches.len() {
            return Err(TreeError::UnknownBranch(id));
        }
        let (ancestors, rest) = self.branches.split_at_mut(id.index());
        let ancestors: &[Branch] = ancestors;
        let branch = &mut rest[0];
        let trunk = match branch.fork() {
            Some(fork) => chain(ancestors, fork)?,
            None => Fasces::default(),
        };
        Ok(Checkout {
            branch,
            trunk,
            histories: &mut self.histories,
        })
    }

    fn claim(&self, name: String) -> Result<String, TreeError> {
        if self.find(&name).is_some() {
            tracing::warn!(branch = %name, "Duplicate branch name");
            return Err(TreeError::DuplicateBranch(name));
        }
        Ok(name)
    }
}

fn chain(branches: &[Branch], version: Version) -> Result<Fasces<'_>, TreeError> {
    let mut segments = Vec::new();
    let mut cursor = Some(version);
    while let Some(current) = cursor {
        let branch = branches
            .get(current.branch.index())
            .ok_or(TreeError::UnknownBranch(current.branch))?;
        segments.push(Fascis::new(branch, current.revision).ok_or(TreeError::UnknownVersion(current))?);
        cursor = branch.fork();
    }
    segments.reverse();
    Ok(Fasces::new(segments))
}

/// A branch opened for writing, with its ancestors' view at the fork.
#[derive(Debug)]
pub struct Checkout<'t> {
    /// The branch being written.
    pub branch: &'t mut Branch,
    /// Ancestors as of the fork point; empty for a root.
    pub trunk: Fasces<'t>,
    /// Shared field histories.
    pub histories: &'t mut Histories,
}

impl Checkout<'_> {
    /// The revision the next commit will create.
    pub fn next_revision(&self) -> Revision {
        self.branch.next_revision()
    }

    /// See [`Branch::add`].
    pub fn add<E: Element>(
        &mut self,
        id: E::Id,
        culture: E::Culture,
        make: impl FnOnce(Atom<E>) -> E,
    ) -> Result<Position<E>, BranchError> {
        self.branch.add(id, culture, &self.trunk, make)
    }

    /// See [`Branch::update_metadata`].
    pub fn update_metadata<E: Described>(
        &mut self,
        entries: impl IntoIterator<Item = (Atom<E>, E::Metadata)>,
        revision: Revision,
    ) -> Result<UpdateStats, BranchError> {
        self.branch.update_metadata(entries, revision, &self.trunk, self.histories)
    }

    /// See [`Branch::update_declarations`].
    pub fn update_declarations(
        &mut self,
        entries: impl IntoIterator<Item = (SymbolAtom, Declaration)>,
        revision: Revision,
    ) -> Result<UpdateStats, BranchError> {
        self.branch.update_declarations(entries, revision, &self.trunk, self.histories)
    }

    /// See [`Branch::update_documentation`].
    pub fn update_documentation<E: Documented>(
        &mut self,
        entries: impl IntoIterator<Item = (Atom<E>, Documentation)>,
        revision: Revision,
    ) -> Result<UpdateStats, BranchError> {
        self.branch.update_documentation(entries, revision, &self.trunk, self.histories)
    }

    /// See [`Branch::update_top_level_symbols`].
    pub fn update_top_level_symbols(
        &mut self,
        entries: impl IntoIterator<Item = (ModuleAtom, BTreeSet<SymbolAtom>)>,
        revision: Revision,
    ) -> Result<UpdateStats, BranchError> {
        self.branch.update_top_level_symbols(entries, revision, &self.trunk, self.histories)
    }

    /// See [`Branch::update_top_level_articles`].
    pub fn update_top_level_articles(
        &mut self,
        entries: impl IntoIterator<Item = (ModuleAtom, BTreeSet<ArticleAtom>)>,
        revision: Revision,
    ) -> Result<UpdateStats, BranchError> {
        self.branch.update_top_level_articles(entries, revision, &self.trunk, self.histories)
    }

    /// See [`Branch::update_opinions`].
    pub fn update_opinions(
        &mut self,
        entries: impl IntoIterator<Item = (Diacritic, BTreeSet<SymbolAtom>)>,
        revision: Revision,
    ) -> Result<UpdateStats, BranchError> {
        self.branch.update_opinions(entries, revision, &self.trunk, self.histories)
    }

    /// See [`Branch::publish`].
    pub fn publish(&mut self, route: Route, composite: Composite, revision: Revision) -> Result<bool, BranchError> {
        self.branch.publish(route, composite, revision)
    }

    /// See [`Branch::commit`].
    pub fn commit(&mut self, info: CommitInfo, pins: BTreeMap<PackageIndex, Version>) -> Version {
        self.branch.commit(info, pins)
    }
}
