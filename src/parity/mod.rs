//! Parity core: normalization, template matching, diffing and remediation decisions.
//!
//! Everything here is pure and synchronous; network access lives in
//! [`crate::extract`].

pub mod diff;
pub mod normalize;
pub mod pattern;
pub mod strategy;

pub use diff::{diff, DiffEngine, DiffOptions};
pub use normalize::normalize;
pub use pattern::{matches, RouteTemplate, TemplateError, TemplateSet};
pub use strategy::{
    LocalTargets, RedirectTarget, RuleConfig, RuleError, RuleSet, StrategyEngine,
};
