//! Running a diagnostic across the cluster
//!
//! The diagnostic runs on each target member in its own task. Results are
//! only reconciled when every member succeeded; a single failure fails the
//! whole check, since a missing member would skew union and intersection
//! answers. The caller's filter runs on the reconciled list.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{info, warn};

use crate::error::CheckExecutionError;
use crate::health::ClusterConnection;
use crate::metrics::metrics;
use crate::pool::MemberConnection;

use super::context::CheckContext;
use super::diagnostic::{Diagnostic, ExecutionTopology};
use super::reconcile::ReconciliationPolicy;
use super::runner::{run_on_member, MemberFindings};

/// Which members a check runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMembers {
    /// The primary snapshot taken when the check starts
    Primary,
    /// Every member of the cluster
    All,
}

impl TargetMembers {
    pub fn for_topology(topology: ExecutionTopology) -> Self {
        match topology {
            ExecutionTopology::OnPrimary => Self::Primary,
            ExecutionTopology::AcrossCluster => Self::All,
        }
    }
}

/// Runs diagnostics against a cluster connection
pub struct ClusterChecker {
    cluster: Arc<ClusterConnection>,
    context: CheckContext,
}

impl ClusterChecker {
    pub fn new(cluster: Arc<ClusterConnection>, context: CheckContext) -> Self {
        Self { cluster, context }
    }

    pub fn cluster(&self) -> &Arc<ClusterConnection> {
        &self.cluster
    }

    pub fn context(&self) -> &CheckContext {
        &self.context
    }

    /// Run a diagnostic with the targets and policy its kind calls for
    pub async fn check<D, P>(
        &self,
        diagnostic: Arc<D>,
        filter: P,
    ) -> Result<Vec<D::Finding>, CheckExecutionError>
    where
        D: Diagnostic,
        P: Fn(&D::Finding) -> bool,
    {
        let kind = diagnostic.kind();
        let targets = TargetMembers::for_topology(kind.execution_topology());
        self.run(diagnostic, targets, kind.default_policy(), filter)
            .await
    }

    /// Run a diagnostic on `targets`, reconcile with `policy`, then apply `filter`
    pub async fn run<D, P>(
        &self,
        diagnostic: Arc<D>,
        targets: TargetMembers,
        policy: ReconciliationPolicy,
        filter: P,
    ) -> Result<Vec<D::Finding>, CheckExecutionError>
    where
        D: Diagnostic,
        P: Fn(&D::Finding) -> bool,
    {
        let kind = diagnostic.kind();
        if targets == TargetMembers::All && policy == ReconciliationPolicy::PrimaryOnly {
            return Err(CheckExecutionError::IncompatiblePolicy {
                diagnostic: kind,
                policy,
                targets,
            });
        }
        // Held until the check returns so `close` leaves member pools open
        let _registration = self.cluster.register_operation()?;

        let members: Vec<Arc<MemberConnection>> = match targets {
            TargetMembers::Primary => vec![self.cluster.primary()],
            TargetMembers::All => self.cluster.members().to_vec(),
        };

        let started = Instant::now();
        let result = self.execute_on_members(&diagnostic, &members).await;
        let label = if result.is_ok() { "success" } else { "failure" };
        metrics().record_check(kind.name(), label, started.elapsed());
        let per_member = result?;

        let reconciled = policy.reconcile(
            per_member
                .into_iter()
                .map(|member| member.findings)
                .collect(),
        );
        let reconciled_count = reconciled.len();
        let findings: Vec<D::Finding> = reconciled.into_iter().filter(|f| filter(f)).collect();

        info!(
            diagnostic = %kind,
            policy = policy.name(),
            members = members.len(),
            reconciled = reconciled_count,
            findings = findings.len(),
            "Cluster check completed"
        );
        Ok(findings)
    }

    /// Run on every member concurrently; fails with the first error in member order
    async fn execute_on_members<D: Diagnostic>(
        &self,
        diagnostic: &Arc<D>,
        members: &[Arc<MemberConnection>],
    ) -> Result<Vec<MemberFindings<D::Finding>>, CheckExecutionError> {
        let kind = diagnostic.kind();
        let handles = members.iter().map(|member| {
            let diagnostic = Arc::clone(diagnostic);
            let member = Arc::clone(member);
            let context = self.context.clone();
            tokio::spawn(async move { run_on_member(diagnostic.as_ref(), &member, &context).await })
        });
        let results = join_all(handles).await;

        let mut collected = Vec::with_capacity(members.len());
        let mut first_error = None;
        for (member, joined) in members.iter().zip(results) {
            let outcome = joined.unwrap_or_else(|e| {
                Err(CheckExecutionError::Aborted {
                    diagnostic: kind,
                    endpoint: member.endpoint().clone(),
                    reason: e.to_string(),
                })
            });
            match outcome {
                Ok(findings) => collected.push(findings),
                Err(e) => {
                    warn!(diagnostic = %kind, endpoint = %member.endpoint(), error = %e, "Diagnostic failed on member");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(collected),
        }
    }
}
