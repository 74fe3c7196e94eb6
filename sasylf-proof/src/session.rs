use std::path::{Path, PathBuf};
use std::sync::Arc;

use sasylf_analysis::ast::CompilationUnit;
use tracing::{debug, warn};

use crate::bank::RuleBank;
use crate::bridge::ProofBridge;
use crate::derivation::save_theorems;
use crate::error::{ProofError, ProofResult};
use crate::tree::{Direction, ProofTree, TheoremExport, TreeEvent};

/// One open proof canvas: the loaded unit, its rule bank and the tree being built.
///
/// Every refused operation leaves the tree as it was and queues the text of a
/// blocking modal, drained with [`ProofSession::take_modals`].
pub struct ProofSession<B: ProofBridge> {
    bridge: Arc<B>,
    file: PathBuf,
    unit: CompilationUnit,
    bank: RuleBank,
    tree: ProofTree,
    modals: Vec<String>,
}

impl<B: ProofBridge> ProofSession<B> {
    pub fn new(bridge: Arc<B>, file: impl Into<PathBuf>, unit: CompilationUnit) -> Self {
        let bank = RuleBank::from_unit(&unit);
        Self {
            bridge,
            file: file.into(),
            unit,
            bank,
            tree: ProofTree::new(),
            modals: Vec::new(),
        }
    }

    /// Replaces the unit after the file was checked again. The tree is kept.
    pub fn reload(&mut self, unit: CompilationUnit) {
        self.bank = RuleBank::from_unit(&unit);
        self.unit = unit;
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    pub fn bank(&self) -> &RuleBank {
        &self.bank
    }

    pub fn tree(&self) -> &ProofTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ProofTree {
        &mut self.tree
    }

    pub fn take_modals(&mut self) -> Vec<String> {
        std::mem::take(&mut self.modals)
    }

    pub fn take_events(&mut self) -> Vec<TreeEvent> {
        self.tree.take_events()
    }

    /// A rule dragged from the bank onto the rule target `target`.
    pub async fn drop_rule(&mut self, target: u32, rule: &str) -> ProofResult<()> {
        let result = self.attach_rule(target, rule).await;
        self.report(result)
    }

    async fn attach_rule(&mut self, target: u32, rule: &str) -> ProofResult<()> {
        let top_down = self
            .tree
            .node(target)
            .ok_or(ProofError::UnknownTarget(target))?
            .top_down;

        if top_down {
            let arity = self.unit.rule_arity(rule);
            let request = self.tree.begin_topdown(target, rule, arity)?;
            debug!(rule, premises = request.premises.len(), "top-down rule drop");
            let conclusion = self
                .bridge
                .topdown_parse(&request.premises, &request.rule, &self.file)
                .await?;
            self.tree.finish_topdown(request, conclusion)
        } else {
            let request = self.tree.begin_rule(target, rule)?;
            debug!(rule, conclusion = %request.conclusion, "rule drop");
            let premises = self
                .bridge
                .parse(&request.conclusion, &request.rule, &self.file)
                .await?;
            self.tree.finish_rule(request, premises)
        }
    }

    pub fn drop_copy(&mut self, target: u32, source: u32) -> ProofResult<()> {
        let result = self.tree.drop_copy(target, source);
        self.report(result)
    }

    pub fn drop_premise(&mut self, target: u32, premise: &str) -> ProofResult<()> {
        let result = self.tree.drop_premise(target, premise);
        self.report(result)
    }

    pub fn delete_rule(&mut self, target: u32) -> ProofResult<()> {
        let result = self.tree.delete_rule(target);
        self.report(result)
    }

    /// Replaces `old` with `new` in the node at `target` and its neighbours.
    ///
    /// All replacements are computed before any is applied; one refusal cancels
    /// the lot.
    pub async fn replace_variable(
        &mut self,
        target: u32,
        old: &str,
        new: &str,
        direction: Direction,
    ) -> ProofResult<()> {
        let result = self.substitute(target, old, new, direction).await;
        self.report(result)
    }

    async fn substitute(
        &mut self,
        target: u32,
        old: &str,
        new: &str,
        direction: Direction,
    ) -> ProofResult<()> {
        let request = self.tree.begin_substitution(target, old, new, direction)?;
        let mut results = Vec::with_capacity(request.len());
        for conclusion in request.conclusions() {
            results.push(
                self.bridge
                    .substitute(conclusion, &request.old, &request.new, &self.file)
                    .await?,
            );
        }
        self.tree.finish_substitution(request, results)
    }

    pub fn export(&mut self, theorems: &[TheoremExport]) -> ProofResult<String> {
        let result = self.tree.export(theorems);
        self.report(result)
    }

    /// Exports and writes the theorems to `path`.
    pub fn save(&mut self, path: &Path, theorems: &[TheoremExport]) -> ProofResult<String> {
        let result = self.tree.export(theorems).and_then(|content| {
            save_theorems(path, &content)?;
            Ok(content)
        });
        self.report(result)
    }

    fn report<T>(&mut self, result: ProofResult<T>) -> ProofResult<T> {
        if let Err(error) = &result {
            warn!(error = %error, "proof operation refused");
            self.modals.push(error.modal_text());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sasylf_analysis::test_support::sample_unit;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockBridge {
        arguments: HashMap<String, Vec<String>>,
        conclusions: HashMap<String, String>,
        parse_calls: AtomicUsize,
        topdown_calls: AtomicUsize,
        substituted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProofBridge for MockBridge {
        async fn parse(&self, conclusion: &str, rule: &str, _: &Path) -> ProofResult<Vec<String>> {
            self.parse_calls.fetch_add(1, Ordering::SeqCst);
            self.arguments
                .get(rule)
                .cloned()
                .ok_or_else(|| {
                    ProofError::Rejected(vec![format!("rule {rule} cannot conclude {conclusion}")])
                })
        }

        async fn topdown_parse(&self, _: &[String], rule: &str, _: &Path) -> ProofResult<String> {
            self.topdown_calls.fetch_add(1, Ordering::SeqCst);
            self.conclusions
                .get(rule)
                .cloned()
                .ok_or_else(|| ProofError::Rejected(vec!["no".to_string()]))
        }

        async fn substitute(
            &self,
            text: &str,
            old: &str,
            new: &str,
            _: &Path,
        ) -> ProofResult<Option<String>> {
            self.substituted.lock().unwrap().push(text.to_string());
            if text.contains("fail") {
                return Err(ProofError::Rejected(vec!["cannot substitute".to_string()]));
            }
            Ok(text
                .split(' ')
                .any(|token| token == old)
                .then(|| {
                    text.split(' ')
                        .map(|token| if token == old { new } else { token })
                        .collect::<Vec<_>>()
                        .join(" ")
                }))
        }
    }

    fn nat_bridge() -> MockBridge {
        let mut bridge = MockBridge::default();
        bridge
            .arguments
            .insert("plus-s".to_string(), vec!["z + z = z".to_string()]);
        bridge.arguments.insert("plus-z".to_string(), Vec::new());
        bridge
            .conclusions
            .insert("plus-s".to_string(), "s n1 + n2 = s n3".to_string());
        bridge
    }

    fn session(bridge: MockBridge) -> (ProofSession<MockBridge>, Arc<MockBridge>) {
        let bridge = Arc::new(bridge);
        let session = ProofSession::new(bridge.clone(), "nat.slf", sample_unit());
        (session, bridge)
    }

    #[tokio::test]
    async fn rule_drop_asks_the_checker_for_premises() {
        let (mut session, bridge) = session(nat_bridge());
        let root = session.tree_mut().add_conclusion("s z + z = s z", false);
        session.drop_rule(root + 1, "plus-s").await.unwrap();

        assert_eq!(bridge.parse_calls.load(Ordering::SeqCst), 1);
        let root = session.tree().root_ids()[0];
        let child = session.tree().children_ids(root)[0];
        assert_eq!(session.tree().node(child).unwrap().conclusion, "z + z = z");

        session.drop_rule(child + 1, "plus-z").await.unwrap();
        let root = session.tree().root_ids()[0];
        assert!(session.tree().derivation(root).is_some());
        assert!(session.take_modals().is_empty());
    }

    #[tokio::test]
    async fn rejection_raises_a_modal_and_changes_nothing() {
        let (mut session, _) = session(nat_bridge());
        let root = session.tree_mut().add_conclusion("z + z = z", false);
        let error = session.drop_rule(root + 1, "bogus").await.unwrap_err();
        assert!(matches!(error, ProofError::Rejected(_)));
        assert_eq!(
            session.take_modals(),
            vec!["Rule bogus cannot conclude z + z = z".to_string()]
        );
        let view = session.tree().node(root).unwrap();
        assert!(view.children.is_empty());
        assert_eq!(view.rule, None);
    }

    #[tokio::test]
    async fn attach_then_delete_returns_to_empty() {
        let (mut session, _) = session(nat_bridge());
        let root = session.tree_mut().add_conclusion("s z + z = s z", false);
        session.drop_rule(root + 1, "plus-s").await.unwrap();
        let root = session.tree().root_ids()[0];
        let child = session.tree().children_ids(root)[0];
        session.drop_rule(child + 1, "plus-z").await.unwrap();

        let root = session.tree().root_ids()[0];
        session.delete_rule(root).unwrap();
        let view = session.tree().node(session.tree().root_ids()[0]).unwrap();
        assert_eq!(view.state, crate::tree::NodeState::Empty);
        assert!(view.children.is_empty());
    }

    #[tokio::test]
    async fn top_down_arity_mismatch_never_reaches_the_checker() {
        let (mut session, bridge) = session(nat_bridge());
        let top = session.tree_mut().add_premises(Vec::new(), false);

        // plus-s takes one premise; none and two are both refused locally.
        assert!(session.drop_rule(top + 1, "plus-s").await.is_err());
        session.drop_premise(top, "n1 + n2 = n3").unwrap();
        session.drop_premise(top, "z + z = z").unwrap();
        assert!(session.drop_rule(top + 1, "plus-s").await.is_err());
        assert!(session.drop_rule(top + 1, "no-such-rule").await.is_err());
        assert_eq!(bridge.topdown_calls.load(Ordering::SeqCst), 0);

        let modals = session.take_modals();
        assert_eq!(modals.len(), 3);
        assert_eq!(modals[0], "Rule plus-s takes 1 premise(s) but 0 were supplied");
        assert_eq!(modals[2], "Unknown rule no-such-rule");
    }

    #[tokio::test]
    async fn top_down_promotion_with_matching_arity() {
        let (mut session, bridge) = session(nat_bridge());
        let top = session
            .tree_mut()
            .add_premises(vec!["n1 + n2 = n3".to_string()], false);
        session.drop_rule(top + 1, "plus-s").await.unwrap();
        assert_eq!(bridge.topdown_calls.load(Ordering::SeqCst), 1);

        let root = session.tree().node(session.tree().root_ids()[0]).unwrap();
        assert!(!root.top_down);
        assert_eq!(root.conclusion, "s n1 + n2 = s n3");
        assert_eq!(root.rule.as_deref(), Some("plus-s"));
        assert_eq!(root.children.len(), 1);
    }

    #[tokio::test]
    async fn theorem_arity_comes_from_foralls() {
        let (mut session, bridge) = session(nat_bridge());
        let top = session
            .tree_mut()
            .add_premises(vec!["n1".to_string(), "n2".to_string()], false);
        // Arity matches, but the mock refuses: the checker was asked exactly once.
        assert!(session.drop_rule(top + 1, "plus-total").await.is_err());
        assert_eq!(bridge.topdown_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.take_modals(), vec!["No".to_string()]);
        assert!(session.tree().node(top).unwrap().top_down);
    }

    #[tokio::test]
    async fn replacement_is_all_or_nothing() {
        let (mut session, bridge) = session(nat_bridge());
        let root = session.tree_mut().add_conclusion("s n + z = s n", true);
        session.drop_rule(root + 1, "plus-s").await.unwrap();
        let root = session.tree().root_ids()[0];
        let child = session.tree().children_ids(root)[0];

        session
            .replace_variable(child, "z", "n", Direction::Up)
            .await
            .unwrap();
        assert_eq!(session.tree().node(child).unwrap().conclusion, "n + n = n");
        assert_eq!(session.tree().node(root).unwrap().conclusion, "s n + n = s n");
        assert_eq!(bridge.substituted.lock().unwrap().len(), 2);

        session.tree_mut().add_conclusion("fail n", true);
        let root = session.tree().root_ids()[0];
        let before = session.tree().node(root).unwrap().conclusion;
        let failing = session.tree().root_ids()[1];
        assert!(session
            .replace_variable(failing, "n", "z", Direction::Both)
            .await
            .is_err());
        assert_eq!(session.tree().node(root).unwrap().conclusion, before);
        assert_eq!(session.take_modals(), vec!["Cannot substitute".to_string()]);
    }

    #[tokio::test]
    async fn export_and_save() {
        let (mut session, _) = session(nat_bridge());
        let root = session.tree_mut().add_conclusion("s z + z = s z", false);
        session.drop_rule(root + 1, "plus-s").await.unwrap();
        let root = session.tree().root_ids()[0];
        let child = session.tree().children_ids(root)[0];
        session.drop_rule(child + 1, "plus-z").await.unwrap();
        let root = session.tree().root_ids()[0];

        let request = vec![TheoremExport {
            root,
            name: "one-plus-zero".to_string(),
            quantifiers: "forall n".to_string(),
        }];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.slf");
        let content = session.save(&path, &request).unwrap();
        assert!(content.starts_with("theorem one-plus-zero : forall n exists s z + z = s z.\n"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
        assert_eq!(session.export(&request).unwrap(), content);
    }

    #[test]
    fn bank_follows_reloads() {
        let (mut session, _) = session(MockBridge::default());
        assert!(session.bank().find("plus-s").is_some());
        session.reload(CompilationUnit::default());
        assert!(session.bank().is_empty());
        assert_eq!(session.file(), Path::new("nat.slf"));
    }
}
