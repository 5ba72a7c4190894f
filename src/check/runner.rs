use tracing::debug;

use crate::error::CheckExecutionError;
use crate::pool::MemberConnection;
use crate::topology::Endpoint;

use super::context::CheckContext;
use super::diagnostic::Diagnostic;

/// Findings produced by one member
#[derive(Debug, Clone)]
pub struct MemberFindings<F> {
    pub endpoint: Endpoint,
    pub findings: Vec<F>,
}

/// Run a diagnostic against a single member, tagging failures with the member
pub async fn run_on_member<D: Diagnostic>(
    diagnostic: &D,
    member: &MemberConnection,
    context: &CheckContext,
) -> Result<MemberFindings<D::Finding>, CheckExecutionError> {
    let kind = diagnostic.kind();
    let wrap = |source: sqlx::Error| CheckExecutionError::Execution {
        diagnostic: kind,
        endpoint: member.endpoint().clone(),
        source,
    };

    diagnostic.before_execute(member).await.map_err(wrap)?;
    let findings = diagnostic.execute(member, context).await.map_err(wrap)?;

    debug!(
        diagnostic = %kind,
        endpoint = %member.endpoint(),
        findings = findings.len(),
        "Diagnostic executed on member"
    );
    Ok(MemberFindings {
        endpoint: member.endpoint().clone(),
        findings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::check::{DiagnosticKind, Finding};
    use crate::pool::test_member;

    #[derive(Debug, Clone, PartialEq)]
    struct Table(String);

    impl Finding for Table {
        type Key = String;

        fn key(&self) -> String {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct TablesDiagnostic {
        hooks: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Diagnostic for TablesDiagnostic {
        type Finding = Table;

        fn kind(&self) -> DiagnosticKind {
            DiagnosticKind::TablesWithoutPrimaryKey
        }

        async fn before_execute(&self, _member: &MemberConnection) -> Result<(), sqlx::Error> {
            self.hooks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn execute(
            &self,
            member: &MemberConnection,
            context: &CheckContext,
        ) -> Result<Vec<Table>, sqlx::Error> {
            if self.fail {
                return Err(sqlx::Error::PoolClosed);
            }
            Ok(vec![Table(format!(
                "{}@{}",
                context.enrich_with_schema("orders"),
                member.endpoint().name()
            ))])
        }
    }

    #[tokio::test]
    async fn test_runs_hook_then_diagnostic() {
        let diagnostic = TablesDiagnostic::default();
        let member = test_member("pg-1");

        let result = run_on_member(&diagnostic, &member, &CheckContext::default())
            .await
            .unwrap();
        assert_eq!(result.endpoint.name(), "pg-1");
        assert_eq!(result.findings, vec![Table("orders@pg-1".to_string())]);
        assert_eq!(diagnostic.hooks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_names_member() {
        let diagnostic = TablesDiagnostic {
            fail: true,
            ..Default::default()
        };
        let member = test_member("pg-2");

        let err = run_on_member(&diagnostic, &member, &CheckContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.endpoint().map(|e| e.name()), Some("pg-2"));
        assert!(matches!(
            err,
            CheckExecutionError::Execution {
                diagnostic: DiagnosticKind::TablesWithoutPrimaryKey,
                ..
            }
        ));
    }
}
