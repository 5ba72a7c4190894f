//! Diagnostic identifiers and the traits a diagnostic implements

use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;

use crate::pool::MemberConnection;

use super::context::CheckContext;
use super::reconcile::ReconciliationPolicy;

/// One reported anti-pattern instance
///
/// Findings from different members are matched by `key`, never by the
/// member that produced them.
pub trait Finding: Clone + Send + Sync + 'static {
    type Key: Eq + Hash + Clone + Send;

    fn key(&self) -> Self::Key;
}

/// A named catalog query producing findings for one member
#[async_trait]
pub trait Diagnostic: Send + Sync + 'static {
    type Finding: Finding;

    fn kind(&self) -> DiagnosticKind;

    /// Hook run on a member right before `execute`
    async fn before_execute(&self, _member: &MemberConnection) -> Result<(), sqlx::Error> {
        Ok(())
    }

    async fn execute(
        &self,
        member: &MemberConnection,
        context: &CheckContext,
    ) -> Result<Vec<Self::Finding>, sqlx::Error>;
}

/// Where a diagnostic has to run to give a correct answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionTopology {
    /// Catalog metadata, identical on every member
    OnPrimary,
    /// Runtime statistics, collected per member
    AcrossCluster,
}

/// Closed set of supported diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    BloatedIndexes,
    BloatedTables,
    DuplicatedIndexes,
    ForeignKeysWithoutIndex,
    IndexesWithNullValues,
    IntersectedIndexes,
    InvalidIndexes,
    TablesWithMissingIndexes,
    TablesWithoutPrimaryKey,
    UnusedIndexes,
    TablesWithoutDescription,
    ColumnsWithoutDescription,
    ColumnsWithJsonType,
    ColumnsWithSerialTypes,
    FunctionsWithoutDescription,
    IndexesWithBoolean,
    NotValidConstraints,
    BtreeIndexesOnArrayColumns,
    SequenceOverflow,
    PrimaryKeysWithSerialTypes,
    DuplicatedForeignKeys,
    IntersectedForeignKeys,
    PossibleObjectNameOverflow,
    TablesNotLinkedToOthers,
    ForeignKeysWithUnmatchedColumnType,
    TablesWithZeroOrOneColumn,
    ObjectsNotFollowingNamingConvention,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 27] = [
        Self::BloatedIndexes,
        Self::BloatedTables,
        Self::DuplicatedIndexes,
        Self::ForeignKeysWithoutIndex,
        Self::IndexesWithNullValues,
        Self::IntersectedIndexes,
        Self::InvalidIndexes,
        Self::TablesWithMissingIndexes,
        Self::TablesWithoutPrimaryKey,
        Self::UnusedIndexes,
        Self::TablesWithoutDescription,
        Self::ColumnsWithoutDescription,
        Self::ColumnsWithJsonType,
        Self::ColumnsWithSerialTypes,
        Self::FunctionsWithoutDescription,
        Self::IndexesWithBoolean,
        Self::NotValidConstraints,
        Self::BtreeIndexesOnArrayColumns,
        Self::SequenceOverflow,
        Self::PrimaryKeysWithSerialTypes,
        Self::DuplicatedForeignKeys,
        Self::IntersectedForeignKeys,
        Self::PossibleObjectNameOverflow,
        Self::TablesNotLinkedToOthers,
        Self::ForeignKeysWithUnmatchedColumnType,
        Self::TablesWithZeroOrOneColumn,
        Self::ObjectsNotFollowingNamingConvention,
    ];

    /// Stable snake_case name, used in logs and metric labels
    pub fn name(&self) -> &'static str {
        match self {
            Self::BloatedIndexes => "bloated_indexes",
            Self::BloatedTables => "bloated_tables",
            Self::DuplicatedIndexes => "duplicated_indexes",
            Self::ForeignKeysWithoutIndex => "foreign_keys_without_index",
            Self::IndexesWithNullValues => "indexes_with_null_values",
            Self::IntersectedIndexes => "intersected_indexes",
            Self::InvalidIndexes => "invalid_indexes",
            Self::TablesWithMissingIndexes => "tables_with_missing_indexes",
            Self::TablesWithoutPrimaryKey => "tables_without_primary_key",
            Self::UnusedIndexes => "unused_indexes",
            Self::TablesWithoutDescription => "tables_without_description",
            Self::ColumnsWithoutDescription => "columns_without_description",
            Self::ColumnsWithJsonType => "columns_with_json_type",
            Self::ColumnsWithSerialTypes => "columns_with_serial_types",
            Self::FunctionsWithoutDescription => "functions_without_description",
            Self::IndexesWithBoolean => "indexes_with_boolean",
            Self::NotValidConstraints => "not_valid_constraints",
            Self::BtreeIndexesOnArrayColumns => "btree_indexes_on_array_columns",
            Self::SequenceOverflow => "sequence_overflow",
            Self::PrimaryKeysWithSerialTypes => "primary_keys_with_serial_types",
            Self::DuplicatedForeignKeys => "duplicated_foreign_keys",
            Self::IntersectedForeignKeys => "intersected_foreign_keys",
            Self::PossibleObjectNameOverflow => "possible_object_name_overflow",
            Self::TablesNotLinkedToOthers => "tables_not_linked_to_others",
            Self::ForeignKeysWithUnmatchedColumnType => "foreign_keys_with_unmatched_column_type",
            Self::TablesWithZeroOrOneColumn => "tables_with_zero_or_one_column",
            Self::ObjectsNotFollowingNamingConvention => "objects_not_following_naming_convention",
        }
    }

    pub fn execution_topology(&self) -> ExecutionTopology {
        match self {
            Self::TablesWithMissingIndexes | Self::UnusedIndexes => ExecutionTopology::AcrossCluster,
            _ => ExecutionTopology::OnPrimary,
        }
    }

    pub fn is_across_cluster(&self) -> bool {
        self.execution_topology() == ExecutionTopology::AcrossCluster
    }

    /// Whether the diagnostic reads runtime statistics rather than static metadata
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::BloatedIndexes
                | Self::BloatedTables
                | Self::SequenceOverflow
                | Self::TablesWithMissingIndexes
                | Self::UnusedIndexes
        )
    }

    /// Policy used when the caller does not choose one
    pub fn default_policy(&self) -> ReconciliationPolicy {
        match self {
            // Scan counters are zero on a freshly restarted replica
            Self::UnusedIndexes => ReconciliationPolicy::IntersectionAcrossMembers,
            Self::TablesWithMissingIndexes => ReconciliationPolicy::UnionAcrossMembers,
            _ => ReconciliationPolicy::PrimaryOnly,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
