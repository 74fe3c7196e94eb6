//! The proof canvas: an arena of proof nodes addressed by transient mount ids.
//!
//! Every structural change remounts the tree. Mounting walks the roots in pre-order
//! and hands each node two fresh ids from a counter that only grows: `id` is the
//! node's copy target and `id + 1` its rule target. Ids from an earlier mount no
//! longer resolve, so a drop aimed at a node that has since moved is refused rather
//! than applied to whatever took its place.
//!
//! Operations that wait on the checker are split in two. `begin_*` validates the
//! drop and captures what the checker needs; `finish_*` applies the answer only if
//! the node it was computed for is still there and unchanged.

use std::collections::HashMap;

use serde::Serialize;

use crate::derivation::{create_theorem, DerivationLine};
use crate::error::{ProofError, ProofResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeKey(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeState {
    Empty,
    ArgsPending,
    HasSubtree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Copy,
    Rule,
}

/// Which neighbours a variable replacement reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Both,
}

impl Direction {
    fn reaches_up(self) -> bool {
        matches!(self, Direction::Up | Direction::Both)
    }

    fn reaches_down(self) -> bool {
        matches!(self, Direction::Down | Direction::Both)
    }
}

#[derive(Debug, Clone)]
enum Shape {
    Normal,
    /// Conclusion unknown until a rule is dropped on the accumulated premises.
    TopDown { premises: Vec<String> },
}

#[derive(Debug, Clone)]
struct ProofNode {
    conclusion: String,
    name: String,
    rule: Option<String>,
    subtree: Option<DerivationLine>,
    children: Vec<NodeKey>,
    open: bool,
    free: bool,
    shape: Shape,
}

impl ProofNode {
    fn placeholder(conclusion: String, free: bool) -> Self {
        Self {
            conclusion,
            name: String::new(),
            rule: None,
            subtree: None,
            children: Vec::new(),
            open: true,
            free,
            shape: Shape::Normal,
        }
    }

    fn state(&self) -> NodeState {
        if self.subtree.is_some() {
            NodeState::HasSubtree
        } else if self.rule.is_some() {
            NodeState::ArgsPending
        } else {
            NodeState::Empty
        }
    }

    fn is_top_down(&self) -> bool {
        matches!(self.shape, Shape::TopDown { .. })
    }
}

/// Snapshot of a mounted node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub id: u32,
    pub rule_target: u32,
    pub conclusion: String,
    pub name: String,
    pub rule: Option<String>,
    pub state: NodeState,
    pub free: bool,
    pub open: bool,
    pub top_down: bool,
    /// Accumulated premises of a top-down node, or the read-only premises of a
    /// delivered subtree.
    pub premises: Vec<String>,
    pub children: Vec<u32>,
}

/// Change notifications, addressed with the ids of the mount that followed the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeEvent {
    RootAdded { node: u32 },
    RootRemoved { conclusion: String },
    RuleAttached { node: u32, rule: String, premises: Vec<u32> },
    RuleRemoved { node: u32 },
    SubtreeDelivered { node: u32, tree: DerivationLine },
    /// An unfinished node was dragged onto a matching placeholder.
    Seeded { node: u32, conclusion: String },
    PremiseAdded { node: u32, premise: String },
    Promoted { node: u32, conclusion: String, rule: String },
    Substituted { node: u32, conclusion: String },
    /// Sent for a changed node and each of its ancestors.
    DerivationChanged { node: u32, complete: bool },
}

/// A rule drop waiting for the checker's premises.
#[derive(Debug, Clone)]
pub struct RuleRequest {
    key: NodeKey,
    pub conclusion: String,
    pub rule: String,
}

/// A rule drop on a top-down node waiting for the checker's conclusion.
#[derive(Debug, Clone)]
pub struct TopdownRequest {
    key: NodeKey,
    pub premises: Vec<String>,
    pub rule: String,
}

/// Every conclusion a replacement touches, captured before any is rewritten.
#[derive(Debug, Clone)]
pub struct SubstitutionRequest {
    targets: Vec<(NodeKey, String)>,
    pub old: String,
    pub new: String,
}

impl SubstitutionRequest {
    pub fn conclusions(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|(_, conclusion)| conclusion.as_str())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// One theorem to write out: the root to export, its name and its quantifiers.
#[derive(Debug, Clone)]
pub struct TheoremExport {
    pub root: u32,
    pub name: String,
    pub quantifiers: String,
}

#[derive(Debug, Default)]
pub struct ProofTree {
    nodes: HashMap<NodeKey, ProofNode>,
    next_key: usize,
    roots: Vec<NodeKey>,
    next_mount: u32,
    mounts: HashMap<u32, NodeKey>,
    mounted: HashMap<NodeKey, u32>,
    events: Vec<TreeEvent>,
}

impl ProofTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root that must be proved bottom-up. Returns its copy target id.
    pub fn add_conclusion(&mut self, conclusion: impl Into<String>, free: bool) -> u32 {
        let key = self.insert(ProofNode::placeholder(conclusion.into(), free));
        self.add_root(key)
    }

    /// Adds a top-down root seeded with premises. Returns its copy target id.
    pub fn add_premises(&mut self, premises: Vec<String>, free: bool) -> u32 {
        let mut node = ProofNode::placeholder(String::new(), free);
        node.shape = Shape::TopDown {
            premises: premises
                .into_iter()
                .filter(|premise| !premise.trim().is_empty())
                .collect(),
        };
        let key = self.insert(node);
        self.add_root(key)
    }

    pub fn remove_root(&mut self, id: u32) -> ProofResult<()> {
        let (key, _) = self.resolve(id).ok_or(ProofError::UnknownTarget(id))?;
        let Some(index) = self.roots.iter().position(|root| *root == key) else {
            return Err(ProofError::InvalidDrop("only whole proofs can be removed".to_string()));
        };
        self.roots.remove(index);
        let conclusion = self.slot(key).map(|node| node.conclusion.clone()).unwrap_or_default();
        self.release(key);
        self.mount();
        self.events.push(TreeEvent::RootRemoved { conclusion });
        Ok(())
    }

    /// Maps a mount id to its node and the drop target it names.
    pub fn resolve_target(&self, id: u32) -> Option<DropTarget> {
        self.resolve(id).map(|(_, target)| target)
    }

    pub fn root_ids(&self) -> Vec<u32> {
        self.roots.iter().filter_map(|key| self.mounted.get(key).copied()).collect()
    }

    pub fn children_ids(&self, id: u32) -> Vec<u32> {
        self.resolve(id)
            .and_then(|(key, _)| self.slot(key))
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.mounted.get(child).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parent_id(&self, id: u32) -> Option<u32> {
        let (key, _) = self.resolve(id)?;
        let parent = self.parent_of(key)?;
        self.mounted.get(&parent).copied()
    }

    pub fn node(&self, id: u32) -> Option<NodeView> {
        let (key, _) = self.resolve(id)?;
        self.view(key)
    }

    pub fn set_name(&mut self, id: u32, name: impl Into<String>) -> ProofResult<()> {
        let key = self.key_for(id)?;
        if let Some(node) = self.slot_mut(key) {
            node.name = name.into();
        }
        Ok(())
    }

    pub fn toggle_open(&mut self, id: u32) -> ProofResult<bool> {
        let key = self.key_for(id)?;
        let node = self.slot_mut(key).ok_or(ProofError::UnknownTarget(id))?;
        node.open = !node.open;
        Ok(node.open)
    }

    /// The finished derivation below a node, if every step has a rule.
    pub fn derivation(&self, id: u32) -> Option<DerivationLine> {
        let (key, _) = self.resolve(id)?;
        self.derivation_of(key)
    }

    pub fn take_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Validates a rule dropped on a rule target of a bottom-up node.
    pub fn begin_rule(&self, id: u32, rule: &str) -> ProofResult<RuleRequest> {
        let (key, target) = self.resolve(id).ok_or(ProofError::UnknownTarget(id))?;
        if target != DropTarget::Rule {
            return Err(ProofError::InvalidDrop("rules go on the rule target".to_string()));
        }
        let node = self.slot(key).ok_or(ProofError::UnknownTarget(id))?;
        if node.is_top_down() {
            return Err(ProofError::InvalidDrop(
                "this proof is built top-down; its rule needs the premises' arity".to_string(),
            ));
        }
        Ok(RuleRequest {
            key,
            conclusion: node.conclusion.clone(),
            rule: rule.to_string(),
        })
    }

    /// Attaches the rule and one placeholder child per premise.
    ///
    /// Anything the node held before, children or a delivered subtree, is dropped.
    pub fn finish_rule(&mut self, request: RuleRequest, premises: Vec<String>) -> ProofResult<()> {
        let fresh = matches!(
            self.slot(request.key),
            Some(node) if !node.is_top_down() && node.conclusion == request.conclusion
        );
        if !fresh {
            return Err(ProofError::Stale);
        }

        let (old_children, free) = match self.slot_mut(request.key) {
            Some(node) => {
                node.subtree = None;
                node.rule = Some(request.rule.clone());
                node.open = true;
                (std::mem::take(&mut node.children), node.free)
            }
            None => return Err(ProofError::Stale),
        };
        for child in old_children {
            self.release(child);
        }
        let children: Vec<NodeKey> = premises
            .into_iter()
            .map(|premise| self.insert(ProofNode::placeholder(premise, free)))
            .collect();
        if let Some(node) = self.slot_mut(request.key) {
            node.children = children.clone();
        }

        self.mount();
        let node = self.mount_id(request.key);
        let premises = children.iter().map(|child| self.mount_id(*child)).collect();
        self.events.push(TreeEvent::RuleAttached {
            node,
            rule: request.rule,
            premises,
        });
        self.notify_ancestors(request.key);
        Ok(())
    }

    /// Validates a rule dropped on a top-down node.
    ///
    /// `arity` is the rule's premise count as declared in the loaded unit; the checker
    /// is only consulted once the accumulated premises match it.
    pub fn begin_topdown(
        &self,
        id: u32,
        rule: &str,
        arity: Option<usize>,
    ) -> ProofResult<TopdownRequest> {
        let (key, target) = self.resolve(id).ok_or(ProofError::UnknownTarget(id))?;
        if target != DropTarget::Rule {
            return Err(ProofError::InvalidDrop("rules go on the rule target".to_string()));
        }
        let node = self.slot(key).ok_or(ProofError::UnknownTarget(id))?;
        let Shape::TopDown { premises } = &node.shape else {
            return Err(ProofError::InvalidDrop(
                "this proof already has a conclusion".to_string(),
            ));
        };
        let expected = arity.ok_or_else(|| ProofError::UnknownRule(rule.to_string()))?;
        if expected != premises.len() {
            return Err(ProofError::ArityMismatch {
                rule: rule.to_string(),
                expected,
                actual: premises.len(),
            });
        }
        Ok(TopdownRequest {
            key,
            premises: premises.clone(),
            rule: rule.to_string(),
        })
    }

    /// Promotes a top-down node to a normal node concluding `conclusion`.
    pub fn finish_topdown(
        &mut self,
        request: TopdownRequest,
        conclusion: String,
    ) -> ProofResult<()> {
        let fresh = matches!(
            self.slot(request.key),
            Some(ProofNode {
                shape: Shape::TopDown { premises },
                ..
            }) if *premises == request.premises
        );
        if !fresh {
            return Err(ProofError::Stale);
        }

        let free = self.slot(request.key).map(|node| node.free).unwrap_or(false);
        let children: Vec<NodeKey> = request
            .premises
            .iter()
            .map(|premise| self.insert(ProofNode::placeholder(premise.clone(), free)))
            .collect();
        if let Some(node) = self.slot_mut(request.key) {
            node.shape = Shape::Normal;
            node.conclusion = conclusion.clone();
            node.rule = Some(request.rule.clone());
            node.subtree = None;
            node.children = children;
        }

        self.mount();
        let node = self.mount_id(request.key);
        self.events.push(TreeEvent::Promoted {
            node,
            conclusion,
            rule: request.rule,
        });
        self.notify_ancestors(request.key);
        Ok(())
    }

    /// Removes a node's rule, its delivered subtree and all children.
    pub fn delete_rule(&mut self, id: u32) -> ProofResult<()> {
        let key = self.key_for(id)?;
        let children = match self.slot_mut(key) {
            Some(node) if node.state() != NodeState::Empty => {
                node.rule = None;
                node.subtree = None;
                std::mem::take(&mut node.children)
            }
            _ => return Ok(()),
        };
        for child in children {
            self.release(child);
        }

        self.mount();
        let node = self.mount_id(key);
        self.events.push(TreeEvent::RuleRemoved { node });
        self.notify_ancestors(key);
        Ok(())
    }

    /// Drags the node at `source` onto the copy target `target`.
    ///
    /// A top-down target takes the source's conclusion as another premise. An empty
    /// bottom-up target accepts any source proving the same conclusion: a finished
    /// derivation is delivered as a read-only subtree, an unfinished one only seeds
    /// the placeholder, which stays empty.
    pub fn drop_copy(&mut self, target: u32, source: u32) -> ProofResult<()> {
        let (target_key, drop) = self.resolve(target).ok_or(ProofError::UnknownTarget(target))?;
        if drop != DropTarget::Copy {
            return Err(ProofError::InvalidDrop("nodes go on the copy target".to_string()));
        }
        let source_key = self.key_for(source)?;
        if source_key == target_key {
            return Err(ProofError::InvalidDrop("a node cannot be copied onto itself".to_string()));
        }
        let source_node = self.slot(source_key).ok_or(ProofError::UnknownTarget(source))?;
        let target_node = self.slot(target_key).ok_or(ProofError::UnknownTarget(target))?;

        if target_node.is_top_down() {
            let premise = source_node.conclusion.clone();
            if premise.trim().is_empty() {
                return Err(ProofError::InvalidDrop(
                    "the dragged proof has no conclusion yet".to_string(),
                ));
            }
            return self.push_premise(target_key, premise);
        }

        if target_node.state() != NodeState::Empty {
            return Err(ProofError::InvalidDrop(
                "delete this node's rule before copying onto it".to_string(),
            ));
        }
        if source_node.conclusion.trim() != target_node.conclusion.trim() {
            return Err(ProofError::ConclusionMismatch {
                expected: target_node.conclusion.clone(),
                delivered: source_node.conclusion.clone(),
            });
        }
        match self.derivation_of(source_key) {
            Some(tree) => self.deliver(target_key, tree),
            None => {
                let node = self.mount_id(target_key);
                let conclusion = target_node.conclusion.clone();
                self.events.push(TreeEvent::Seeded { node, conclusion });
            }
        }
        Ok(())
    }

    /// Drops free text into a top-down node's premise list.
    pub fn drop_premise(&mut self, target: u32, premise: &str) -> ProofResult<()> {
        let key = self.key_for(target)?;
        let top_down = self.slot(key).map(ProofNode::is_top_down).unwrap_or(false);
        if !top_down {
            return Err(ProofError::InvalidDrop(
                "premises can only be added to a top-down proof".to_string(),
            ));
        }
        if premise.trim().is_empty() {
            return Err(ProofError::InvalidDrop("a premise cannot be empty".to_string()));
        }
        self.push_premise(key, premise.trim().to_string())
    }

    /// Captures the node and its reachable neighbours for a variable replacement.
    pub fn begin_substitution(
        &self,
        id: u32,
        old: &str,
        new: &str,
        direction: Direction,
    ) -> ProofResult<SubstitutionRequest> {
        let key = self.key_for(id)?;
        let node = self.slot(key).ok_or(ProofError::UnknownTarget(id))?;
        if !node.free {
            return Err(ProofError::NotFree(node.conclusion.clone()));
        }

        let mut keys = vec![key];
        if direction.reaches_up() {
            let mut current = key;
            while let Some(parent) = self.parent_of(current) {
                keys.push(parent);
                current = parent;
            }
        }
        if direction.reaches_down() {
            let mut stack: Vec<NodeKey> = node.children.clone();
            while let Some(child) = stack.pop() {
                keys.push(child);
                if let Some(child_node) = self.slot(child) {
                    stack.extend(child_node.children.iter().copied());
                }
            }
        }

        let targets = keys
            .into_iter()
            .filter_map(|key| {
                self.slot(key)
                    .filter(|node| !node.conclusion.is_empty())
                    .map(|node| (key, node.conclusion.clone()))
            })
            .collect();
        Ok(SubstitutionRequest {
            targets,
            old: old.to_string(),
            new: new.to_string(),
        })
    }

    /// Applies replacements computed for every target of `request`, in order.
    ///
    /// `None` leaves that conclusion alone. Nothing is applied if any target changed
    /// while the replacements were computed.
    pub fn finish_substitution(
        &mut self,
        request: SubstitutionRequest,
        results: Vec<Option<String>>,
    ) -> ProofResult<()> {
        if results.len() != request.targets.len() {
            return Err(ProofError::Stale);
        }
        let unchanged = request.targets.iter().all(|(key, conclusion)| {
            matches!(self.slot(*key), Some(node) if node.conclusion == *conclusion)
        });
        if !unchanged {
            return Err(ProofError::Stale);
        }

        let mut changed = Vec::new();
        for ((key, _), result) in request.targets.into_iter().zip(results) {
            let Some(conclusion) = result else { continue };
            if let Some(node) = self.slot_mut(key) {
                if node.conclusion != conclusion {
                    node.conclusion = conclusion.clone();
                    changed.push((key, conclusion));
                }
            }
        }
        for (key, conclusion) in changed {
            let node = self.mount_id(key);
            self.events.push(TreeEvent::Substituted { node, conclusion });
        }
        Ok(())
    }

    /// Renders the requested roots as theorems, in request order.
    pub fn export(&self, theorems: &[TheoremExport]) -> ProofResult<String> {
        let mut content = String::new();
        for theorem in theorems {
            let key = self.key_for(theorem.root)?;
            if !self.roots.contains(&key) {
                return Err(ProofError::InvalidDrop(format!(
                    "{} is not the root of a proof",
                    theorem.root
                )));
            }
            let derivation = self.derivation_of(key).ok_or_else(|| {
                ProofError::Incomplete(
                    self.slot(key)
                        .map(|node| node.conclusion.clone())
                        .unwrap_or_default(),
                )
            })?;
            content.push_str(&create_theorem(&theorem.name, &theorem.quantifiers, &derivation));
        }
        Ok(content)
    }

    fn add_root(&mut self, key: NodeKey) -> u32 {
        self.roots.push(key);
        self.mount();
        let node = self.mount_id(key);
        self.events.push(TreeEvent::RootAdded { node });
        node
    }

    fn push_premise(&mut self, key: NodeKey, premise: String) -> ProofResult<()> {
        match self.slot_mut(key) {
            Some(ProofNode {
                shape: Shape::TopDown { premises },
                ..
            }) => premises.push(premise.clone()),
            _ => return Err(ProofError::Stale),
        }
        let node = self.mount_id(key);
        self.events.push(TreeEvent::PremiseAdded { node, premise });
        Ok(())
    }

    fn deliver(&mut self, key: NodeKey, tree: DerivationLine) {
        if let Some(node) = self.slot_mut(key) {
            node.rule = None;
            node.subtree = Some(tree.clone());
        }
        let node = self.mount_id(key);
        self.events.push(TreeEvent::SubtreeDelivered { node, tree });
        self.notify_ancestors(key);
    }

    fn notify_ancestors(&mut self, key: NodeKey) {
        let mut current = Some(key);
        while let Some(key) = current {
            let node = self.mount_id(key);
            let complete = self.derivation_of(key).is_some();
            self.events.push(TreeEvent::DerivationChanged { node, complete });
            current = self.parent_of(key);
        }
    }

    fn derivation_of(&self, key: NodeKey) -> Option<DerivationLine> {
        let node = self.slot(key)?;
        if let Some(subtree) = &node.subtree {
            let mut line = subtree.clone();
            if !node.name.trim().is_empty() {
                line.name = node.name.clone();
            }
            return Some(line);
        }
        let rule = node.rule.clone()?;
        let premises = node
            .children
            .iter()
            .map(|child| self.derivation_of(*child))
            .collect::<Option<Vec<_>>>()?;
        Some(DerivationLine {
            conclusion: node.conclusion.clone(),
            name: node.name.clone(),
            rule,
            premises,
        })
    }

    fn view(&self, key: NodeKey) -> Option<NodeView> {
        let node = self.slot(key)?;
        let id = *self.mounted.get(&key)?;
        let (rule, premises) = match (&node.shape, &node.subtree) {
            (Shape::TopDown { premises }, _) => (None, premises.clone()),
            (Shape::Normal, Some(subtree)) => (
                Some(subtree.rule.clone()),
                subtree
                    .premises
                    .iter()
                    .map(|premise| premise.conclusion.clone())
                    .collect(),
            ),
            (Shape::Normal, None) => (node.rule.clone(), Vec::new()),
        };
        Some(NodeView {
            id,
            rule_target: id + 1,
            conclusion: node.conclusion.clone(),
            name: node.name.clone(),
            rule,
            state: node.state(),
            free: node.free,
            open: node.open,
            top_down: node.is_top_down(),
            premises,
            children: node
                .children
                .iter()
                .filter_map(|child| self.mounted.get(child).copied())
                .collect(),
        })
    }

    fn mount(&mut self) {
        self.mounts.clear();
        self.mounted.clear();
        let mut stack: Vec<NodeKey> = self.roots.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            let id = self.next_mount;
            self.next_mount += 2;
            self.mounts.insert(id, key);
            self.mounted.insert(key, id);
            if let Some(node) = self.slot(key) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    fn mount_id(&self, key: NodeKey) -> u32 {
        self.mounted.get(&key).copied().unwrap_or(u32::MAX)
    }

    fn resolve(&self, id: u32) -> Option<(NodeKey, DropTarget)> {
        if let Some(key) = self.mounts.get(&id) {
            return Some((*key, DropTarget::Copy));
        }
        let copy = id.checked_sub(1)?;
        self.mounts.get(&copy).map(|key| (*key, DropTarget::Rule))
    }

    fn key_for(&self, id: u32) -> ProofResult<NodeKey> {
        self.resolve(id)
            .map(|(key, _)| key)
            .ok_or(ProofError::UnknownTarget(id))
    }

    fn parent_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes
            .iter()
            .find_map(|(parent, node)| node.children.contains(&key).then_some(*parent))
    }

    fn insert(&mut self, node: ProofNode) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        self.nodes.insert(key, node);
        key
    }

    /// Drops a node and everything below it.
    fn release(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.remove(&key) else {
            return;
        };
        for child in node.children {
            self.release(child);
        }
    }

    fn slot(&self, key: NodeKey) -> Option<&ProofNode> {
        self.nodes.get(&key)
    }

    fn slot_mut(&mut self, key: NodeKey) -> Option<&mut ProofNode> {
        self.nodes.get_mut(&key)
    }
}
