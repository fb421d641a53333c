//! # Graph
//!
//! Nodes live in ordered groups, one group per kind. A node's index is its current position in that group and
//! changes whenever the group is edited, so it is never used as an identity. [`NodeKey`] is the identity.
//!
//! Edges are [selectors](SelectorEntry): a node-owned slot holding the integer literal that is persisted in the
//! file together with the node it resolves to. The literal is kept equal to the resolved node's index, or `-1`
//! when nothing is selected.
//!
//! Nodes are never freed. Removal takes a node out of its group and leaves it in the arena so undo can put it
//! back with its selectors intact.

pub mod commands;
pub mod writer;

use crate::field::{Field, FieldState};
use az::SaturatingAs;
use smallvec::SmallVec;

/// Anything usable to name a group of nodes.
pub trait GroupId: Copy + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static {}
impl<T> GroupId for T where T: Copy + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static {}

/// Stable identity of a node within one [`Graph`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeKey(usize);
/// Stable identity of a selector within one [`Graph`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct SelectorKey(usize);
impl SelectorKey {
    /// Refers to no selector. Only held by payloads still being decoded.
    pub(crate) const DANGLING: Self = Self(usize::MAX);
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node#{}", self.0)
    }
}
impl std::fmt::Display for SelectorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Selector#{}", self.0)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SelectError {
    #[error("selector or target not found")]
    TargetNotFound,
    #[error("target belongs to a different group")]
    WrongGroup,
    #[error("selection would make a node its own descendant")]
    WouldCycle,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GroupError {
    #[error("node not found")]
    TargetNotFound,
    #[error("node is already in its group")]
    AlreadyPresent,
    #[error("node is not in its group")]
    NotPresent,
    #[error("index {idx} is past the end of a group of {len}")]
    IndexOutOfBounds { idx: usize, len: usize },
    #[error("node is still selected by {count} selectors")]
    StillSelected { count: usize },
}

pub struct NodeEntry<G, P> {
    group: G,
    pub payload: P,
    name: Option<String>,
    assigned: bool,
    removed: bool,
    outdated: bool,
    selectors: SmallVec<[SelectorKey; 4]>,
    /// Linked selectors resolving to this node.
    incoming: SmallVec<[SelectorKey; 4]>,
}
impl<G: GroupId, P> NodeEntry<G, P> {
    #[must_use]
    pub fn group(&self) -> G {
        self.group
    }
    /// User-chosen display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    /// Whether the node carries data. An unassigned node is present in its group but encodes no content.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.assigned
    }
    /// Whether the node is currently out of its group.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }
    #[must_use]
    pub fn is_outdated(&self) -> bool {
        self.outdated
    }
    /// Every selector this node owns, linked or not.
    #[must_use]
    pub fn selectors(&self) -> &[SelectorKey] {
        &self.selectors
    }
    /// The selectors currently resolving to this node.
    #[must_use]
    pub fn incoming(&self) -> &[SelectorKey] {
        &self.incoming
    }
}

pub struct SelectorEntry<G> {
    owner: NodeKey,
    target_group: G,
    literal: Field<i32>,
    selected: Option<NodeKey>,
    /// Slot-level switch, off while the item or block holding the selector is absent.
    enabled: bool,
    linked: bool,
}
impl<G: GroupId> SelectorEntry<G> {
    #[must_use]
    pub fn owner(&self) -> NodeKey {
        self.owner
    }
    #[must_use]
    pub fn target_group(&self) -> G {
        self.target_group
    }
    /// The persisted index.
    #[must_use]
    pub fn literal(&self) -> &Field<i32> {
        &self.literal
    }
    /// The remembered reference. Kept while the selector is disabled.
    #[must_use]
    pub fn selected(&self) -> Option<NodeKey> {
        self.selected
    }
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
    /// Whether this selector currently forms an edge and follows changes to its target group.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.linked
    }
    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection {
            target: self.selected,
            literal: self.literal.state().clone(),
        }
    }
}

/// Full state of a selector slot, as recorded by commands.
#[derive(Clone, PartialEq, Debug)]
pub struct Selection {
    pub target: Option<NodeKey>,
    pub literal: FieldState<i32>,
}

#[derive(Default)]
struct NodeGroup {
    order: Vec<NodeKey>,
    /// Linked selectors targeting this group, to be told when positions shift.
    subscribers: hashbrown::HashSet<SelectorKey>,
}

/// Creates selectors. Decoders and item constructors are generic over this,
/// so the same constructor serves both loading and user insertion.
pub trait MakeSelector<G> {
    fn make_selector(&mut self, target_group: G, literal: Field<i32>, enabled: bool) -> SelectorKey;
}

/// Handed to the closure of [`Graph::build_node`]. Creates selectors owned by the node being built.
pub struct SelectorAlloc<'g, G> {
    owner: NodeKey,
    selectors: &'g mut Vec<SelectorEntry<G>>,
    created: SmallVec<[SelectorKey; 4]>,
}
impl<G: GroupId> SelectorAlloc<'_, G> {
    /// Key the node will have once built.
    #[must_use]
    pub fn owner(&self) -> NodeKey {
        self.owner
    }
    /// Literal of a selector made by this allocator.
    pub fn literal_mut(&mut self, key: SelectorKey) -> Option<&mut Field<i32>> {
        if self.created.contains(&key) {
            self.selectors.get_mut(key.0).map(|entry| &mut entry.literal)
        } else {
            None
        }
    }
    /// Toggle a selector made by this allocator. Takes effect when the node is linked into its group.
    pub fn set_enabled(&mut self, key: SelectorKey, enabled: bool) {
        if self.created.contains(&key) {
            if let Some(entry) = self.selectors.get_mut(key.0) {
                entry.enabled = enabled;
            }
        }
    }
}
impl<G: GroupId> MakeSelector<G> for SelectorAlloc<'_, G> {
    fn make_selector(&mut self, target_group: G, literal: Field<i32>, enabled: bool) -> SelectorKey {
        let key = SelectorKey(self.selectors.len());
        self.selectors.push(SelectorEntry {
            owner: self.owner,
            target_group,
            literal,
            selected: None,
            enabled,
            linked: false,
        });
        self.created.push(key);
        key
    }
}

/// Makes disabled selectors for an existing node, for items that have not been inserted yet.
pub struct DetachedSelectors<'g, G, P> {
    graph: &'g mut Graph<G, P>,
    owner: NodeKey,
}
impl<G: GroupId, P> MakeSelector<G> for DetachedSelectors<'_, G, P> {
    fn make_selector(&mut self, target_group: G, literal: Field<i32>, _enabled: bool) -> SelectorKey {
        let key = SelectorKey(self.graph.selectors.len());
        self.graph.selectors.push(SelectorEntry {
            owner: self.owner,
            target_group,
            literal,
            selected: None,
            enabled: false,
            linked: false,
        });
        if let Some(node) = self.graph.nodes.get_mut(self.owner.0) {
            node.selectors.push(key);
        }
        key
    }
}

pub struct Graph<G, P> {
    nodes: Vec<NodeEntry<G, P>>,
    selectors: Vec<SelectorEntry<G>>,
    groups: hashbrown::HashMap<G, NodeGroup>,
}
impl<G, P> Default for Graph<G, P> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            selectors: Vec::new(),
            groups: hashbrown::HashMap::new(),
        }
    }
}
impl<G: GroupId, P> Graph<G, P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Create a node outside of its group. The closure builds the payload, creating the node's selectors
    /// through the allocator. Insert it with [`Self::attach`].
    pub fn build_node<E, F>(&mut self, group: G, assigned: bool, build: F) -> Result<NodeKey, E>
    where
        F: FnOnce(&mut SelectorAlloc<'_, G>) -> Result<P, E>,
    {
        let key = NodeKey(self.nodes.len());
        let first_selector = self.selectors.len();
        let mut alloc = SelectorAlloc {
            owner: key,
            selectors: &mut self.selectors,
            created: SmallVec::new(),
        };
        let result = build(&mut alloc);
        let created = alloc.created;
        let payload = match result {
            Ok(payload) => payload,
            Err(err) => {
                self.selectors.truncate(first_selector);
                return Err(err);
            }
        };
        self.groups.entry(group).or_default();
        self.nodes.push(NodeEntry {
            group,
            payload,
            name: None,
            assigned,
            removed: true,
            outdated: false,
            selectors: created,
            incoming: SmallVec::new(),
        });
        Ok(key)
    }
    /// Build a node and append it to its group. Used while loading, before [`Self::initialize`].
    pub fn build_appended<E, F>(&mut self, group: G, assigned: bool, build: F) -> Result<NodeKey, E>
    where
        F: FnOnce(&mut SelectorAlloc<'_, G>) -> Result<P, E>,
    {
        let key = self.build_node(group, assigned, build)?;
        // Selectors stay unlinked until `initialize`, which owns their literals until then.
        self.groups.entry(group).or_default().order.push(key);
        self.nodes[key.0].removed = false;
        Ok(key)
    }
    /// Selector factory for items of an existing node. The selectors start disabled.
    pub fn detached_selectors(&mut self, owner: NodeKey) -> Option<DetachedSelectors<'_, G, P>> {
        self.nodes.get(owner.0)?;
        Some(DetachedSelectors { graph: self, owner })
    }
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&NodeEntry<G, P>> {
        self.nodes.get(key.0)
    }
    pub fn payload_mut(&mut self, key: NodeKey) -> Option<&mut P> {
        self.nodes.get_mut(key.0).map(|node| &mut node.payload)
    }
    #[must_use]
    pub fn selector(&self, key: SelectorKey) -> Option<&SelectorEntry<G>> {
        self.selectors.get(key.0)
    }
    /// Nodes of a group, in order.
    #[must_use]
    pub fn group(&self, group: G) -> &[NodeKey] {
        self.groups
            .get(&group)
            .map_or(&[], |group| group.order.as_slice())
    }
    /// Current position of a node in its group, or None if removed.
    #[must_use]
    pub fn index_of(&self, key: NodeKey) -> Option<usize> {
        let node = self.nodes.get(key.0).filter(|node| !node.removed)?;
        self.group(node.group).iter().position(|k| *k == key)
    }
    fn is_live(&self, key: NodeKey) -> bool {
        self.nodes.get(key.0).is_some_and(|node| !node.removed)
    }
    /// Selectors pointing at this node.
    #[must_use]
    pub fn incoming(&self, key: NodeKey) -> &[SelectorKey] {
        self.nodes.get(key.0).map_or(&[], |node| node.incoming())
    }
    /// Every selector resolving to this node, including disabled ones that remember it.
    #[must_use]
    pub fn referrers(&self, key: NodeKey) -> Vec<SelectorKey> {
        self.selectors
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.selected == Some(key))
            .map(|(idx, _)| SelectorKey(idx))
            .collect()
    }
    /// Edges leaving this node, as `(selector, target)`.
    pub fn outgoing(&self, key: NodeKey) -> impl Iterator<Item = (SelectorKey, NodeKey)> + '_ {
        self.nodes
            .get(key.0)
            .map_or(&[][..], |node| node.selectors())
            .iter()
            .filter_map(|&sel| {
                let entry = &self.selectors[sel.0];
                let target = entry.selected.filter(|&t| entry.linked && self.is_live(t))?;
                Some((sel, target))
            })
    }
    pub fn set_name(&mut self, key: NodeKey, name: Option<String>) -> Option<Option<String>> {
        let node = self.nodes.get_mut(key.0)?;
        Some(std::mem::replace(&mut node.name, name))
    }

    fn should_link(&self, sel: SelectorKey) -> bool {
        let entry = &self.selectors[sel.0];
        let owner = &self.nodes[entry.owner.0];
        entry.enabled && owner.assigned && !owner.removed
    }
    fn unlink(&mut self, sel: SelectorKey) {
        let entry = &mut self.selectors[sel.0];
        if !entry.linked {
            return;
        }
        entry.linked = false;
        let (selected, group) = (entry.selected, entry.target_group);
        if let Some(target) = selected {
            self.nodes[target.0].incoming.retain(|s| *s != sel);
        }
        if let Some(group) = self.groups.get_mut(&group) {
            group.subscribers.remove(&sel);
        }
    }
    fn link(&mut self, sel: SelectorKey) {
        if self.selectors[sel.0].linked || !self.should_link(sel) {
            return;
        }
        let entry = &mut self.selectors[sel.0];
        entry.linked = true;
        let (selected, group) = (entry.selected, entry.target_group);
        if let Some(target) = selected.filter(|&t| self.is_live(t)) {
            self.nodes[target.0].incoming.push(sel);
        }
        self.groups.entry(group).or_default().subscribers.insert(sel);
        self.refresh_literal(sel);
    }
    fn relink(&mut self, sel: SelectorKey) {
        self.unlink(sel);
        self.link(sel);
    }
    /// Make the literal agree with the selected node's position. A literal already holding the right value
    /// keeps its state, so an unset or default literal is not promoted needlessly.
    fn refresh_literal(&mut self, sel: SelectorKey) {
        let desired = self.selectors[sel.0]
            .selected
            .and_then(|target| self.index_of(target))
            .map_or(-1, |idx| idx.saturating_as::<i32>());
        let literal = &mut self.selectors[sel.0].literal;
        if *literal.value_or_default() != desired {
            literal.set(desired);
        }
    }
    fn refresh_group(&mut self, group: G) {
        let subscribers: Vec<_> = self
            .groups
            .get(&group)
            .map(|g| g.subscribers.iter().copied().collect())
            .unwrap_or_default();
        for sel in subscribers {
            self.refresh_literal(sel);
        }
    }
    fn insert_unchecked(&mut self, key: NodeKey, idx: usize) {
        let group = self.nodes[key.0].group;
        self.groups
            .entry(group)
            .or_default()
            .order
            .insert(idx, key);
        self.nodes[key.0].removed = false;
        for sel in self.nodes[key.0].selectors.clone() {
            self.relink(sel);
        }
        self.refresh_group(group);
    }

    /// Is `to` reachable from `from` along linked edges? A node reaches itself.
    fn reaches(&self, from: NodeKey, to: NodeKey) -> bool {
        let mut visited = hashbrown::HashSet::new();
        let mut stack = vec![from];
        while let Some(key) = stack.pop() {
            if key == to {
                return true;
            }
            if visited.insert(key) {
                stack.extend(self.outgoing(key).map(|(_, target)| target));
            }
        }
        false
    }
    fn check_target(&self, sel: SelectorKey, target: Option<NodeKey>) -> Result<(), SelectError> {
        let entry = self.selectors.get(sel.0).ok_or(SelectError::TargetNotFound)?;
        let Some(target) = target else {
            return Ok(());
        };
        let node = self
            .nodes
            .get(target.0)
            .filter(|node| !node.removed)
            .ok_or(SelectError::TargetNotFound)?;
        if node.group != entry.target_group {
            return Err(SelectError::WrongGroup);
        }
        if self.should_link(sel) && self.reaches(target, entry.owner) {
            return Err(SelectError::WouldCycle);
        }
        Ok(())
    }
    /// Would linking this selector, as it stands, close a cycle?
    fn link_would_cycle(&self, sel: SelectorKey) -> bool {
        let entry = &self.selectors[sel.0];
        entry
            .selected
            .filter(|&t| self.is_live(t))
            .is_some_and(|target| self.reaches(target, entry.owner))
    }

    /// Point a selector at `target`, or at nothing. Returns false if it already did.
    ///
    /// The literal follows the new target, and the new target's descendants (or the owner's, when clearing)
    /// are marked outdated.
    pub fn select(
        &mut self,
        sel: SelectorKey,
        target: Option<NodeKey>,
    ) -> Result<bool, SelectError> {
        let current = self
            .selectors
            .get(sel.0)
            .ok_or(SelectError::TargetNotFound)?
            .selected;
        if current == target {
            return Ok(false);
        }
        self.check_target(sel, target)?;
        self.unlink(sel);
        self.selectors[sel.0].selected = target;
        self.refresh_literal(sel);
        self.link(sel);
        let owner = self.selectors[sel.0].owner;
        self.mark_outdated(target.unwrap_or(owner));
        Ok(true)
    }
    /// The selection `select(sel, target)` would produce, without applying it.
    pub fn selection_for(
        &self,
        sel: SelectorKey,
        target: Option<NodeKey>,
    ) -> Result<Selection, SelectError> {
        self.check_target(sel, target)?;
        let entry = &self.selectors[sel.0];
        let desired = target
            .and_then(|t| self.index_of(t))
            .map_or(-1, |idx| idx.saturating_as::<i32>());
        let literal = if *entry.literal.value_or_default() == desired {
            entry.literal.state().clone()
        } else {
            FieldState::Value(desired)
        };
        Ok(Selection { target, literal })
    }
    /// Put a selector back into a recorded state, literal included.
    pub fn restore_selection(
        &mut self,
        sel: SelectorKey,
        selection: &Selection,
    ) -> Result<(), SelectError> {
        self.check_target(sel, selection.target)?;
        self.unlink(sel);
        let entry = &mut self.selectors[sel.0];
        entry.selected = selection.target;
        entry.literal.set_state(selection.literal.clone());
        let owner = entry.owner;
        self.link(sel);
        self.mark_outdated(selection.target.unwrap_or(owner));
        Ok(())
    }
    /// Toggle a selector slot. Returns false if nothing changed.
    pub fn set_enabled(&mut self, sel: SelectorKey, enabled: bool) -> Result<bool, SelectError> {
        let entry = self.selectors.get(sel.0).ok_or(SelectError::TargetNotFound)?;
        if entry.enabled == enabled {
            return Ok(false);
        }
        if enabled && self.link_would_cycle(sel) {
            return Err(SelectError::WouldCycle);
        }
        self.unlink(sel);
        self.selectors[sel.0].enabled = enabled;
        self.link(sel);
        Ok(true)
    }
    /// Check that all of these selectors can be enabled, without doing so.
    pub fn can_enable(&self, selectors: &[SelectorKey]) -> Result<(), SelectError> {
        for &sel in selectors {
            if self.selectors.get(sel.0).is_none() {
                return Err(SelectError::TargetNotFound);
            }
            if self.link_would_cycle(sel) {
                return Err(SelectError::WouldCycle);
            }
        }
        Ok(())
    }
    /// Set whether a node carries data. Unassigned nodes keep their selectors' references but form no edges.
    pub fn set_assigned(&mut self, key: NodeKey, assigned: bool) -> Result<bool, SelectError> {
        let node = self.nodes.get(key.0).ok_or(SelectError::TargetNotFound)?;
        if node.assigned == assigned {
            return Ok(false);
        }
        let selectors = node.selectors.clone();
        if assigned {
            let enabled: Vec<_> = selectors
                .iter()
                .copied()
                .filter(|&sel| self.selectors[sel.0].enabled)
                .collect();
            self.can_enable(&enabled)?;
        }
        self.nodes[key.0].assigned = assigned;
        for sel in selectors {
            self.relink(sel);
        }
        self.mark_outdated(key);
        Ok(true)
    }

    /// Insert a built or previously removed node into its group at `idx`.
    pub fn attach(&mut self, key: NodeKey, idx: usize) -> Result<(), GroupError> {
        let node = self.nodes.get(key.0).ok_or(GroupError::TargetNotFound)?;
        if !node.removed {
            return Err(GroupError::AlreadyPresent);
        }
        let len = self.group(node.group).len();
        if idx > len {
            return Err(GroupError::IndexOutOfBounds { idx, len });
        }
        self.insert_unchecked(key, idx);
        Ok(())
    }
    /// Take a node out of its group, returning the index it had. Fails while any selector resolves to it,
    /// enabled or not.
    pub fn detach(&mut self, key: NodeKey) -> Result<usize, GroupError> {
        let group = self.nodes.get(key.0).ok_or(GroupError::TargetNotFound)?.group;
        let referrers = self.referrers(key);
        if !referrers.is_empty() {
            return Err(GroupError::StillSelected {
                count: referrers.len(),
            });
        }
        let idx = self.index_of(key).ok_or(GroupError::NotPresent)?;
        if let Some(g) = self.groups.get_mut(&group) {
            g.order.remove(idx);
        }
        self.nodes[key.0].removed = true;
        for sel in self.nodes[key.0].selectors.clone() {
            self.relink(sel);
        }
        self.refresh_group(group);
        Ok(idx)
    }
    /// Remove a node, first clearing every selector that resolves to it, disabled ones included.
    /// Returns the index it had and the selectors that were cleared.
    pub fn remove_node(&mut self, key: NodeKey) -> Result<(usize, Vec<SelectorKey>), GroupError> {
        if !self.is_live(key) {
            return Err(match self.nodes.get(key.0) {
                None => GroupError::TargetNotFound,
                Some(_) => GroupError::NotPresent,
            });
        }
        let cleared = self.referrers(key);
        for &sel in &cleared {
            if let Err(err) = self.select(sel, None) {
                log::warn!("failed to clear {sel} before removing {key}: {err}");
            }
        }
        let idx = self.detach(key)?;
        Ok((idx, cleared))
    }

    /// Resolve every selector's literal against the populated groups. Call once after loading.
    ///
    /// Negative or out of range literals resolve to nothing and are rewritten to `-1`.
    /// Those selectors are returned with the literal they had.
    pub fn initialize(&mut self) -> Vec<(SelectorKey, i32)> {
        let mut issues = Vec::new();
        for idx in 0..self.selectors.len() {
            let sel = SelectorKey(idx);
            let entry = &self.selectors[idx];
            if self.nodes[entry.owner.0].removed {
                continue;
            }
            let literal = *entry.literal.value_or_default();
            let resolved = usize::try_from(literal)
                .ok()
                .and_then(|i| self.group(entry.target_group).get(i).copied());
            self.unlink(sel);
            let entry = &mut self.selectors[idx];
            if resolved.is_none() && literal != -1 {
                issues.push((sel, literal));
                entry.literal.set(-1);
            }
            entry.selected = resolved;
            self.link(sel);
        }
        issues
    }

    /// Mark a node and everything reachable from it as outdated.
    /// Returns the nodes that were not already outdated. Safe in the presence of cycles.
    pub fn mark_outdated(&mut self, key: NodeKey) -> Vec<NodeKey> {
        let mut newly = Vec::new();
        let mut visited = hashbrown::HashSet::new();
        let mut stack = vec![key];
        while let Some(key) = stack.pop() {
            if !visited.insert(key) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(key.0) else {
                continue;
            };
            if !node.outdated {
                node.outdated = true;
                newly.push(key);
            }
            stack.extend(self.outgoing(key).map(|(_, target)| target));
        }
        newly
    }
    /// Clear every outdated flag, returning the nodes that had one.
    pub fn take_outdated(&mut self) -> Vec<NodeKey> {
        self.nodes
            .iter_mut()
            .enumerate()
            .filter(|(_, node)| node.outdated)
            .map(|(idx, node)| {
                node.outdated = false;
                NodeKey(idx)
            })
            .collect()
    }
    /// Every live node. Groups come in no particular order, nodes within a group by position.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &NodeEntry<G, P>)> + '_ {
        self.groups
            .values()
            .flat_map(|group| group.order.iter())
            .map(|&key| (key, &self.nodes[key.0]))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
    enum Kind {
        Parent,
        Child,
    }
    type TestGraph = Graph<Kind, ()>;

    /// A node with `n` selectors into `target`.
    fn node(graph: &mut TestGraph, group: Kind, target: Kind, n: usize) -> (NodeKey, Vec<SelectorKey>) {
        let mut sels = Vec::new();
        let key = graph
            .build_appended(group, true, |alloc| {
                for _ in 0..n {
                    sels.push(alloc.make_selector(target, Field::new("Sel", -1), true));
                }
                Ok::<_, ()>(())
            })
            .unwrap();
        (key, sels)
    }
    fn literal(graph: &TestGraph, sel: SelectorKey) -> i32 {
        *graph.selector(sel).unwrap().literal().value_or_default()
    }
    /// Every linked selector agrees with its target's position.
    fn assert_consistent(graph: &TestGraph) {
        for (idx, entry) in graph.selectors.iter().enumerate() {
            if !entry.is_linked() {
                continue;
            }
            let expected = entry
                .selected()
                .and_then(|t| graph.index_of(t))
                .map_or(-1, |i| i as i32);
            assert_eq!(
                *entry.literal().value_or_default(),
                expected,
                "selector {idx}"
            );
            if let Some(target) = entry.selected() {
                assert!(graph.incoming(target).contains(&SelectorKey(idx)));
            }
        }
    }

    #[test]
    fn literals_follow_group_edits() {
        let mut graph = TestGraph::new();
        let (_, sels) = node(&mut graph, Kind::Parent, Kind::Child, 1);
        let (a, _) = node(&mut graph, Kind::Child, Kind::Child, 0);
        let (b, _) = node(&mut graph, Kind::Child, Kind::Child, 0);
        let sel = sels[0];

        assert!(graph.select(sel, Some(b)).unwrap());
        assert_eq!(literal(&graph, sel), 1);
        assert_consistent(&graph);
        // Same target again is a no-op.
        assert!(!graph.select(sel, Some(b)).unwrap());

        // Insert before b, b shifts to 2.
        let c = graph.build_node(Kind::Child, true, |_| Ok::<_, ()>(())).unwrap();
        graph.attach(c, 0).unwrap();
        assert_eq!(literal(&graph, sel), 2);
        assert_consistent(&graph);

        // Remove a, b shifts to 1.
        graph.remove_node(a).unwrap();
        assert_eq!(literal(&graph, sel), 1);
        assert_consistent(&graph);

        // Removing the target itself clears the selector.
        let (idx, cleared) = graph.remove_node(b).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(cleared, [sel]);
        assert_eq!(graph.selector(sel).unwrap().selected(), None);
        assert_eq!(literal(&graph, sel), -1);
        assert_consistent(&graph);
    }
    #[test]
    fn initialize_resolves_and_normalizes() {
        let mut graph = TestGraph::new();
        let mut sels = Vec::new();
        graph
            .build_appended(Kind::Parent, true, |alloc| {
                for lit in [0, 1, 5, -3, -1] {
                    sels.push(alloc.make_selector(Kind::Child, Field::new("Sel", lit), true));
                }
                Ok::<_, ()>(())
            })
            .unwrap();
        let (a, _) = node(&mut graph, Kind::Child, Kind::Child, 0);
        let (b, _) = node(&mut graph, Kind::Child, Kind::Child, 0);

        let issues = graph.initialize();
        assert_eq!(issues, [(sels[2], 5), (sels[3], -3)]);
        let selected: Vec<_> = sels
            .iter()
            .map(|&s| graph.selector(s).unwrap().selected())
            .collect();
        assert_eq!(selected, [Some(a), Some(b), None, None, None]);
        assert_eq!(literal(&graph, sels[2]), -1);
        assert_eq!(literal(&graph, sels[3]), -1);
        assert_eq!(graph.incoming(a), [sels[0]]);
        assert_consistent(&graph);
    }
    #[test]
    fn unassigned_owner_keeps_reference_without_edge() {
        let mut graph = TestGraph::new();
        let (parent, sels) = node(&mut graph, Kind::Parent, Kind::Child, 1);
        let (child, _) = node(&mut graph, Kind::Child, Kind::Child, 0);
        graph.select(sels[0], Some(child)).unwrap();

        graph.set_assigned(parent, false).unwrap();
        assert!(graph.incoming(child).is_empty());
        assert_eq!(graph.selector(sels[0]).unwrap().selected(), Some(child));
        assert_eq!(graph.outgoing(parent).count(), 0);

        graph.set_assigned(parent, true).unwrap();
        assert_eq!(graph.incoming(child), [sels[0]]);
        assert_eq!(graph.outgoing(parent).collect::<Vec<_>>(), [(sels[0], child)]);
    }
    #[test]
    fn removal_clears_disabled_selectors() {
        let mut graph = TestGraph::new();
        let (parent, sels) = node(&mut graph, Kind::Parent, Kind::Child, 1);
        let (child, _) = node(&mut graph, Kind::Child, Kind::Child, 0);
        graph.select(sels[0], Some(child)).unwrap();
        graph.set_assigned(parent, false).unwrap();

        let (_, cleared) = graph.remove_node(child).unwrap();
        assert_eq!(cleared, [sels[0]]);

        graph.set_assigned(parent, true).unwrap();
        let entry = graph.selector(sels[0]).unwrap();
        assert_eq!(entry.selected(), None);
        assert_eq!(*entry.literal().value_or_default(), -1);
        assert_eq!(graph.outgoing(parent).count(), 0);

        // Re-attaching the node does not bring back a half edge.
        graph.attach(child, 0).unwrap();
        assert_eq!(graph.outgoing(parent).count(), 0);
        assert!(graph.incoming(child).is_empty());
        assert_consistent(&graph);
    }
    #[test]
    fn detach_refuses_while_remembered_by_disabled_selector() {
        let mut graph = TestGraph::new();
        let (parent, sels) = node(&mut graph, Kind::Parent, Kind::Child, 1);
        let (child, _) = node(&mut graph, Kind::Child, Kind::Child, 0);
        graph.select(sels[0], Some(child)).unwrap();
        graph.set_assigned(parent, false).unwrap();
        assert_eq!(
            graph.detach(child),
            Err(GroupError::StillSelected { count: 1 })
        );
    }
    #[test]
    fn outdated_cascades_once_and_cycles_are_rejected() {
        // a -> b -> c, all in one group.
        let mut graph = TestGraph::new();
        let (a, a_sel) = node(&mut graph, Kind::Child, Kind::Child, 1);
        let (b, b_sel) = node(&mut graph, Kind::Child, Kind::Child, 1);
        let (c, c_sel) = node(&mut graph, Kind::Child, Kind::Child, 1);
        graph.select(b_sel[0], Some(c)).unwrap();
        graph.take_outdated();

        graph.select(a_sel[0], Some(b)).unwrap();
        let mut marked = graph.take_outdated();
        marked.sort();
        assert_eq!(marked, [b, c]);
        // A second walk reports nothing new.
        assert_eq!(graph.mark_outdated(a), [a, b, c]);
        assert!(graph.mark_outdated(a).is_empty());

        // c -> a would close a -> b -> c -> a.
        assert_eq!(
            graph.select(c_sel[0], Some(a)),
            Err(SelectError::WouldCycle)
        );
        // So would a node selecting itself.
        assert_eq!(
            graph.select(c_sel[0], Some(c)),
            Err(SelectError::WouldCycle)
        );
        assert_eq!(graph.selector(c_sel[0]).unwrap().selected(), None);
        assert_consistent(&graph);
    }
    #[test]
    fn select_validates_target() {
        let mut graph = TestGraph::new();
        let (_, sels) = node(&mut graph, Kind::Parent, Kind::Child, 1);
        let (other_parent, _) = node(&mut graph, Kind::Parent, Kind::Child, 0);
        let (child, _) = node(&mut graph, Kind::Child, Kind::Child, 0);
        assert_eq!(
            graph.select(sels[0], Some(other_parent)),
            Err(SelectError::WrongGroup)
        );
        graph.remove_node(child).unwrap();
        assert_eq!(
            graph.select(sels[0], Some(child)),
            Err(SelectError::TargetNotFound)
        );
    }
    #[test]
    fn detach_refuses_while_selected() {
        let mut graph = TestGraph::new();
        let (_, sels) = node(&mut graph, Kind::Parent, Kind::Child, 2);
        let (child, _) = node(&mut graph, Kind::Child, Kind::Child, 0);
        graph.select(sels[0], Some(child)).unwrap();
        graph.select(sels[1], Some(child)).unwrap();
        assert_eq!(
            graph.detach(child),
            Err(GroupError::StillSelected { count: 2 })
        );
        assert_eq!(graph.index_of(child), Some(0));
    }
}
