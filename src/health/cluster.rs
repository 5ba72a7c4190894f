//! Cluster connection and primary tracking
//!
//! A `ClusterConnection` owns one pooled handle per member and a swappable
//! reference to the member currently accepting writes. The primary is seeded
//! by probing every member at construction; afterwards a background task
//! re-probes the members on a fixed interval and swaps the reference when
//! exactly one member reports itself as primary.
//!
//! Readers take a snapshot through `primary()` and never block on the
//! refresh task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::{CheckExecutionError, ConfigurationError, Result};
use crate::metrics::metrics;
use crate::pool::{Credentials, MemberConnection, MemberConnectionFactory};
use crate::topology::{parse_connection_urls, Endpoint};

use super::primary::{probe_with_timeout, PrimaryDetector};

/// Timing of the background primary refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Delay between two refresh cycles
    pub refresh_interval: Duration,
    /// Upper bound for a single member probe
    pub probe_timeout: Duration,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(3),
        }
    }
}

impl RefreshOptions {
    pub fn new(
        refresh_interval: Duration,
        probe_timeout: Duration,
    ) -> std::result::Result<Self, ConfigurationError> {
        let options = Self {
            refresh_interval,
            probe_timeout,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigurationError::NonPositiveDuration {
                argument: "refresh_interval",
            });
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigurationError::NonPositiveDuration {
                argument: "probe_timeout",
            });
        }
        Ok(())
    }
}

/// Lifecycle of a cluster connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    /// Members opened, primary not yet seeded
    Initializing,
    /// Primary known, refresh running (for multi-member clusters)
    Active,
    /// Refresh stopped and member pools closed
    Closed,
}

/// Result of one refresh cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The reported primary is the one already tracked
    Unchanged,
    /// Exactly one other member reported primary and was swapped in
    Switched { from: Endpoint, to: Endpoint },
    /// No member reported primary; last known primary kept
    NoPrimary,
    /// Several members reported primary; last known primary kept
    MultiplePrimaries(usize),
}

impl RefreshOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Switched { .. } => "switched",
            Self::NoPrimary => "no_primary",
            Self::MultiplePrimaries(_) => "multiple_primaries",
        }
    }
}

/// State shared between the connection and its refresh task
struct ClusterInner {
    members: Vec<Arc<MemberConnection>>,
    primary: ArcSwap<MemberConnection>,
    detector: Arc<dyn PrimaryDetector>,
    probe_timeout: Duration,
}

impl ClusterInner {
    /// Probe every member concurrently and swap the primary if exactly one reports it
    async fn refresh_primary(&self) -> RefreshOutcome {
        let results = join_all(self.members.iter().map(|member| {
            probe_with_timeout(self.detector.as_ref(), member, self.probe_timeout)
        }))
        .await;

        let mut primaries: Vec<&Arc<MemberConnection>> = Vec::new();
        for (member, result) in self.members.iter().zip(results) {
            match result {
                Ok(true) => primaries.push(member),
                Ok(false) => {}
                Err(e) => {
                    warn!(endpoint = %member.endpoint(), error = %e, "Primary probe failed during refresh");
                }
            }
        }

        let outcome = match primaries.as_slice() {
            [candidate] => self.swap_primary(candidate),
            [] => {
                warn!(
                    primary = %self.primary.load().endpoint(),
                    "No primary found during refresh, keeping last known primary"
                );
                RefreshOutcome::NoPrimary
            }
            several => {
                let reported: Vec<String> =
                    several.iter().map(|m| m.endpoint().to_string()).collect();
                warn!(
                    primary = %self.primary.load().endpoint(),
                    reported = ?reported,
                    "Multiple primaries reported during refresh, keeping last known primary"
                );
                RefreshOutcome::MultiplePrimaries(several.len())
            }
        };

        metrics().record_refresh(outcome.label());
        outcome
    }

    fn swap_primary(&self, candidate: &Arc<MemberConnection>) -> RefreshOutcome {
        let current = self.primary.load();
        if current.endpoint() == candidate.endpoint() {
            debug!(primary = %current.endpoint(), "Primary unchanged");
            return RefreshOutcome::Unchanged;
        }

        let previous = self
            .primary
            .compare_and_swap(&current, Arc::clone(candidate));
        if !Arc::ptr_eq(&previous, &current) {
            // A concurrent refresh already replaced it
            debug!(primary = %previous.endpoint(), "Primary updated concurrently");
            return RefreshOutcome::Unchanged;
        }

        info!(
            from = %current.endpoint(),
            to = %candidate.endpoint(),
            "Primary switched"
        );
        metrics().record_primary_switch();
        RefreshOutcome::Switched {
            from: current.endpoint().clone(),
            to: candidate.endpoint().clone(),
        }
    }
}

/// Connection to every member of a replicated cluster
pub struct ClusterConnection {
    inner: Arc<ClusterInner>,
    state: Mutex<ClusterState>,
    cancel_token: CancellationToken,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    /// Checks and maintenance operations that `close` waits for
    operations: TaskTracker,
}

impl ClusterConnection {
    /// Parse the credential URLs, open one member per distinct host and seed the primary
    pub async fn connect(
        credentials: &Credentials,
        options: RefreshOptions,
        factory: &dyn MemberConnectionFactory,
        detector: Arc<dyn PrimaryDetector>,
    ) -> Result<Self> {
        options.validate()?;
        let hosts = parse_connection_urls(credentials.connection_urls())?;
        if hosts.is_empty() {
            return Err(ConfigurationError::NoHosts.into());
        }

        let members = hosts
            .iter()
            .map(|host| factory.connect(host, credentials))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Self::from_members(members, detector, options).await
    }

    /// Build a cluster from already opened members
    ///
    /// Members sharing an endpoint are collapsed, keeping the first.
    pub async fn from_members(
        members: Vec<MemberConnection>,
        detector: Arc<dyn PrimaryDetector>,
        options: RefreshOptions,
    ) -> Result<Self> {
        options.validate()?;

        let mut seen = HashSet::new();
        let members: Vec<Arc<MemberConnection>> = members
            .into_iter()
            .filter(|member| seen.insert(member.endpoint().clone()))
            .map(Arc::new)
            .collect();
        if members.is_empty() {
            return Err(ConfigurationError::NoHosts.into());
        }

        let primary =
            match seed_primary(&members, detector.as_ref(), options.probe_timeout).await {
                Ok(primary) => primary,
                Err(e) => {
                    for member in &members {
                        member.close().await;
                    }
                    return Err(e);
                }
            };

        let connection = Self {
            inner: Arc::new(ClusterInner {
                members,
                primary: ArcSwap::new(primary),
                detector,
                probe_timeout: options.probe_timeout,
            }),
            state: Mutex::new(ClusterState::Initializing),
            cancel_token: CancellationToken::new(),
            refresh_task: Mutex::new(None),
            operations: TaskTracker::new(),
        };

        connection.spawn_refresh_task(options.refresh_interval);
        *connection.state.lock() = ClusterState::Active;

        let member_count = connection.inner.members.len();
        metrics().set_cluster_members(member_count);
        info!(
            primary = %connection.primary().endpoint(),
            members = member_count,
            "Cluster connection active"
        );
        Ok(connection)
    }

    /// Spawn the periodic refresh task, unless there is nothing to fail over to
    fn spawn_refresh_task(&self, refresh_interval: Duration) {
        if self.inner.members.len() < 2 {
            debug!("Single member cluster, primary refresh not started");
            return;
        }

        let inner = Arc::clone(&self.inner);
        let cancel_token = self.cancel_token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + refresh_interval, refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("Primary refresh task cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        inner.refresh_primary().await;
                    }
                }
            }
        });

        *self.refresh_task.lock() = Some(handle);
        debug!(interval = ?refresh_interval, "Spawned primary refresh task");
    }

    /// Snapshot of the current primary
    pub fn primary(&self) -> Arc<MemberConnection> {
        self.inner.primary.load_full()
    }

    pub fn members(&self) -> &[Arc<MemberConnection>] {
        &self.inner.members
    }

    /// Member with the given endpoint
    pub fn member(&self, endpoint: &Endpoint) -> Option<&Arc<MemberConnection>> {
        self.inner
            .members
            .iter()
            .find(|member| member.endpoint() == endpoint)
    }

    pub fn state(&self) -> ClusterState {
        *self.state.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ClusterState::Closed
    }

    /// Whether the background refresh task was started
    pub fn has_refresh_task(&self) -> bool {
        self.refresh_task.lock().is_some()
    }

    /// Run one refresh cycle now, independently of the background schedule
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.inner.refresh_primary().await
    }

    /// Probe a single member on demand
    pub async fn probe(&self, endpoint: &Endpoint) -> Result<bool> {
        let member = self
            .member(endpoint)
            .ok_or_else(|| ConfigurationError::UnknownEndpoint {
                endpoint: endpoint.clone(),
            })?;
        let is_primary = probe_with_timeout(
            self.inner.detector.as_ref(),
            member,
            self.inner.probe_timeout,
        )
        .await?;
        Ok(is_primary)
    }

    /// Register an operation that must finish before member pools close
    ///
    /// The returned token keeps `close` waiting until it is dropped.
    pub fn register_operation(
        &self,
    ) -> std::result::Result<TaskTrackerToken, CheckExecutionError> {
        let state = self.state.lock();
        if *state == ClusterState::Closed {
            return Err(CheckExecutionError::ClusterClosed);
        }
        Ok(self.operations.token())
    }

    /// Number of registered operations still running
    pub fn running_operations(&self) -> usize {
        self.operations.len()
    }

    /// Stop the refresh task, wait for running checks and close every member pool
    ///
    /// New checks are rejected as soon as this starts. Calling it again is a no-op.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state == ClusterState::Closed {
                debug!("Cluster connection already closed");
                return;
            }
            *state = ClusterState::Closed;
        }

        self.cancel_token.cancel();
        let handle = self.refresh_task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Primary refresh task ended abnormally");
            }
        }

        self.operations.close();
        if !self.operations.is_empty() {
            debug!(
                running = self.operations.len(),
                "Waiting for running checks before closing pools"
            );
        }
        self.operations.wait().await;

        for member in &self.inner.members {
            member.close().await;
        }
        info!(members = self.inner.members.len(), "Cluster connection closed");
    }
}

impl Drop for ClusterConnection {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Probe all members once and pick the primary
async fn seed_primary(
    members: &[Arc<MemberConnection>],
    detector: &dyn PrimaryDetector,
    probe_timeout: Duration,
) -> Result<Arc<MemberConnection>> {
    let results = join_all(
        members
            .iter()
            .map(|member| probe_with_timeout(detector, member, probe_timeout)),
    )
    .await;

    let mut primary: Option<&Arc<MemberConnection>> = None;
    for (member, result) in members.iter().zip(results) {
        if !result? {
            continue;
        }
        if !member.endpoint().can_be_primary() {
            warn!(endpoint = %member.endpoint(), "Member configured as replica-only reports primary");
        }
        match primary {
            None => primary = Some(member),
            Some(chosen) => warn!(
                chosen = %chosen.endpoint(),
                ignored = %member.endpoint(),
                "Several primaries found at startup, keeping the first"
            ),
        }
    }

    primary.cloned().ok_or_else(|| {
        let endpoints: Vec<String> = members.iter().map(|m| m.endpoint().to_string()).collect();
        ConfigurationError::NoPrimaryFound {
            endpoints: endpoints.join(", "),
        }
        .into()
    })
}
