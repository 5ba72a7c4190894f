//! Built-in catalog diagnostics

use async_trait::async_trait;

use crate::pool::MemberConnection;

use super::context::CheckContext;
use super::diagnostic::{Diagnostic, DiagnosticKind, Finding};
use super::stats::log_last_stats_reset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIndex {
    pub table_name: String,
    pub index_name: String,
}

impl Finding for InvalidIndex {
    type Key = String;

    fn key(&self) -> String {
        self.index_name.clone()
    }
}

/// Indexes left invalid by a failed concurrent build
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidIndexes;

#[async_trait]
impl Diagnostic for InvalidIndexes {
    type Finding = InvalidIndex;

    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::InvalidIndexes
    }

    async fn execute(
        &self,
        member: &MemberConnection,
        context: &CheckContext,
    ) -> Result<Vec<InvalidIndex>, sqlx::Error> {
        const SQL: &str = "select x.indrelid::regclass::text as table_name, \
                x.indexrelid::regclass::text as index_name \
            from pg_catalog.pg_index x \
            join pg_catalog.pg_stat_all_indexes psai on x.indexrelid = psai.indexrelid \
            where psai.schemaname = $1::text and not x.indisvalid \
            order by table_name, index_name";

        let rows = sqlx::query_as::<_, (String, String)>(SQL)
            .bind(context.schema_name())
            .fetch_all(member.pool())
            .await?;
        Ok(rows
            .into_iter()
            .map(|(table_name, index_name)| InvalidIndex {
                table_name,
                index_name,
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWithoutPrimaryKey {
    pub table_name: String,
    pub table_size_bytes: i64,
}

impl Finding for TableWithoutPrimaryKey {
    type Key = String;

    fn key(&self) -> String {
        self.table_name.clone()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TablesWithoutPrimaryKey;

#[async_trait]
impl Diagnostic for TablesWithoutPrimaryKey {
    type Finding = TableWithoutPrimaryKey;

    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::TablesWithoutPrimaryKey
    }

    async fn execute(
        &self,
        member: &MemberConnection,
        context: &CheckContext,
    ) -> Result<Vec<TableWithoutPrimaryKey>, sqlx::Error> {
        const SQL: &str = "select psat.relid::regclass::text as table_name, \
                pg_catalog.pg_table_size(psat.relid) as table_size \
            from pg_catalog.pg_stat_all_tables psat \
            where psat.schemaname = $1::text \
                and not exists ( \
                    select 1 from pg_catalog.pg_constraint c \
                    where c.conrelid = psat.relid and c.contype = 'p') \
            order by table_name";

        let rows = sqlx::query_as::<_, (String, i64)>(SQL)
            .bind(context.schema_name())
            .fetch_all(member.pool())
            .await?;
        Ok(rows
            .into_iter()
            .map(|(table_name, table_size_bytes)| TableWithoutPrimaryKey {
                table_name,
                table_size_bytes,
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedIndex {
    pub table_name: String,
    pub index_name: String,
    pub index_size_bytes: i64,
    pub index_scans: i64,
}

impl Finding for UnusedIndex {
    type Key = String;

    fn key(&self) -> String {
        self.index_name.clone()
    }
}

/// Non-unique indexes with almost no scans since the last statistics reset
#[derive(Debug, Clone, Copy, Default)]
pub struct UnusedIndexes;

#[async_trait]
impl Diagnostic for UnusedIndexes {
    type Finding = UnusedIndex;

    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::UnusedIndexes
    }

    async fn before_execute(&self, member: &MemberConnection) -> Result<(), sqlx::Error> {
        log_last_stats_reset(member).await
    }

    async fn execute(
        &self,
        member: &MemberConnection,
        context: &CheckContext,
    ) -> Result<Vec<UnusedIndex>, sqlx::Error> {
        const SQL: &str = "select psui.relid::regclass::text as table_name, \
                psui.indexrelid::regclass::text as index_name, \
                pg_catalog.pg_relation_size(psui.indexrelid) as index_size, \
                psui.idx_scan as index_scans \
            from pg_catalog.pg_stat_all_indexes psui \
            join pg_catalog.pg_index i on i.indexrelid = psui.indexrelid \
            where psui.schemaname = $1::text \
                and not i.indisunique \
                and i.indisvalid \
                and psui.idx_scan < 50 \
            order by table_name, index_name";

        let rows = sqlx::query_as::<_, (String, String, i64, i64)>(SQL)
            .bind(context.schema_name())
            .fetch_all(member.pool())
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(table_name, index_name, index_size_bytes, index_scans)| UnusedIndex {
                    table_name,
                    index_name,
                    index_size_bytes,
                    index_scans,
                },
            )
            .collect())
    }
}
