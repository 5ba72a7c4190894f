//! Merging per-member findings into one cluster-level answer
//!
//! Both `union` and `intersection` are pure functions over the per-member
//! lists, ordered the same way as the members they came from. The value kept
//! for a key is always the first one seen in that order; values are never
//! combined.

use std::collections::HashSet;

use super::diagnostic::Finding;

/// Rule for reconciling findings collected from several members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconciliationPolicy {
    /// Only the primary's findings count
    PrimaryOnly,
    /// A finding reported by any member qualifies
    UnionAcrossMembers,
    /// A finding qualifies only when every member reports it
    IntersectionAcrossMembers,
}

impl ReconciliationPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PrimaryOnly => "primary_only",
            Self::UnionAcrossMembers => "union",
            Self::IntersectionAcrossMembers => "intersection",
        }
    }

    pub fn reconcile<F: Finding>(&self, per_member: Vec<Vec<F>>) -> Vec<F> {
        match self {
            Self::PrimaryOnly => per_member.into_iter().next().unwrap_or_default(),
            Self::UnionAcrossMembers => union(&per_member),
            Self::IntersectionAcrossMembers => intersection(&per_member),
        }
    }
}

/// Findings reported by at least one member, deduplicated by key
pub fn union<F: Finding>(per_member: &[Vec<F>]) -> Vec<F> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for findings in per_member {
        for finding in findings {
            if seen.insert(finding.key()) {
                result.push(finding.clone());
            }
        }
    }
    result
}

/// Findings reported by every member, deduplicated by key
pub fn intersection<F: Finding>(per_member: &[Vec<F>]) -> Vec<F> {
    let Some((first, rest)) = per_member.split_first() else {
        return Vec::new();
    };
    let others: Vec<HashSet<F::Key>> = rest
        .iter()
        .map(|findings| findings.iter().map(Finding::key).collect())
        .collect();

    let mut seen = HashSet::new();
    first
        .iter()
        .filter(|finding| {
            let key = finding.key();
            others.iter().all(|keys| keys.contains(&key)) && seen.insert(key)
        })
        .cloned()
        .collect()
}
