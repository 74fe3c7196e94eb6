//! Proof-tree editing core for SASyLF derivations
//!
//! A proof canvas holds one tree per proof being built. Nodes start as empty
//! placeholders for a conclusion; dropping a rule on a node asks the checker which
//! premises that rule needs and grows one placeholder per premise. When every node
//! has a rule the tree is a finished derivation and can be exported as a theorem.
//!
//! Node States
//!
//! 1. Empty: a conclusion with no justification. Accepts a rule on its rule target
//!    and a finished derivation of the same conclusion on its copy target.
//! 2. Args pending: a rule is attached and its premises are child placeholders.
//! 3. Has subtree: a finished derivation was copied in; its premises are read-only.
//!
//! Top-down nodes run the other way: premises are dropped first, then a rule whose
//! declared arity matches them. The checker supplies the conclusion and the node
//! becomes an ordinary node with the rule attached.
//!
//! Identity
//!
//! Nodes are addressed by mount ids, two per node (copy target, rule target). Any
//! structural change remounts the tree with fresh ids, and parent or child links
//! are read from the tree as it stands. See [`tree`].
//!
//! Checker Bridge
//!
//! [`bridge::ProofBridge`] is the seam to the checker (`parse`, `topdown_parse`,
//! `substitute`). [`bridge::CheckerBridge`] runs the real checker as a subprocess;
//! tests substitute their own implementation.
//!
//! Failures
//!
//! A refused drop or rejected request changes nothing. [`session::ProofSession`]
//! turns each one into modal text built from the checker's errors.
//!
//! Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sasylf_proof::bridge::CheckerBridge;
//! use sasylf_proof::session::ProofSession;
//!
//! let mut session = ProofSession::new(Arc::new(CheckerBridge::default()), "nat.slf", unit);
//! let root = session.tree_mut().add_conclusion("s z + z = s z", false);
//! session.drop_rule(root + 1, "plus-s").await?;
//! ```
//!

pub mod bank;
pub mod bridge;
pub mod derivation;
pub mod error;
pub mod session;
pub mod tree;

pub use bank::RuleBank;
pub use derivation::DerivationLine;
pub use error::{ProofError, ProofResult};
pub use session::ProofSession;
pub use tree::{Direction, NodeState, ProofTree, TheoremExport, TreeEvent};
