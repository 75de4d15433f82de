//! Change detection for scheduled rebuilds.
//!
//! A scheduled cycle only rebuilds snapshots when the append-only event log
//! records a mutation to one of the watched tables within the recent window.
//! The window is wider than the scheduling period so a delayed or drifting
//! schedule never misses a change. An unreachable log fails open.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use sqlx::{PgPool, Postgres};
use thiserror::Error;

/// Event-log table names whose mutations invalidate snapshots.
pub const WATCHED_TABLES: [&str; 12] = [
    "challenges",
    "communities",
    "content_bundles",
    "events",
    "organizations",
    "points_of_interest",
    "tags",
    "areas",
    "outings",
    "stewardships",
    "image_attachments",
    "trails",
];

/// Look-back window: 1.1 hours.
pub const CHANGE_WINDOW: Duration = Duration::from_secs(66 * 60);

/// Errors raised while reading the event log.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// The count query failed.
    #[error("failed to count recent events")]
    Query {
        #[source]
        source: sqlx::Error,
    },
}

/// Read access to the append-only event log.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Count entries for `tables` created within `window` of now.
    async fn count_changes(&self, tables: &[&str], window: Duration)
    -> Result<i64, EventLogError>;
}

/// [`EventLog`] backed by the `hasura_events` table.
#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    /// Read the event log through `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn count_changes(
        &self,
        tables: &[&str],
        window: Duration,
    ) -> Result<i64, EventLogError> {
        let tables: Vec<String> = tables.iter().map(|table| (*table).to_owned()).collect();
        sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM hasura_events \
             WHERE table_name = ANY($1) \
             AND created_at > NOW() - make_interval(secs => $2)",
        )
        .bind(tables)
        .bind(window.as_secs_f64())
        .fetch_one(&self.pool)
        .await
        .map_err(|source| EventLogError::Query { source })
    }
}

/// Decides whether a rebuild cycle is worthwhile.
#[derive(Clone)]
pub struct ChangeGate {
    log: Arc<dyn EventLog>,
    window: Duration,
}

impl std::fmt::Debug for ChangeGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeGate")
            .field("log", &"<dyn EventLog>")
            .field("window", &self.window)
            .finish()
    }
}

impl ChangeGate {
    /// Gate over `log` using [`CHANGE_WINDOW`].
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self {
            log,
            window: CHANGE_WINDOW,
        }
    }

    /// Override the look-back window.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Return whether a rebuild should run.
    ///
    /// `force` bypasses the log entirely. Otherwise the answer is `true` iff
    /// the log holds at least one watched change in the window, or the log
    /// could not be read.
    pub async fn should_rebuild(&self, force: bool) -> bool {
        if force {
            info!("rebuild forced; change check skipped");
            return true;
        }
        match self.log.count_changes(&WATCHED_TABLES, self.window).await {
            Ok(count) if count > 0 => {
                info!("{count} watched changes in the last {:?}; rebuilding", self.window);
                true
            }
            Ok(_) => {
                info!("no watched changes in the last {:?}; skipping", self.window);
                false
            }
            Err(err) => {
                warn!("change check failed, rebuilding anyway: {err}");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubEventLog;
    use rstest::rstest;

    fn gate(log: &Arc<StubEventLog>) -> ChangeGate {
        ChangeGate::new(Arc::clone(log) as Arc<dyn EventLog>)
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(42, true)]
    #[tokio::test]
    async fn rebuilds_only_when_changes_exist(#[case] count: i64, #[case] expected: bool) {
        let log = Arc::new(StubEventLog::with_count(count));

        assert_eq!(gate(&log).should_rebuild(false).await, expected);
        assert_eq!(log.calls(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn force_skips_the_log() {
        let log = Arc::new(StubEventLog::with_count(0));

        assert!(gate(&log).should_rebuild(true).await);
        assert_eq!(log.calls(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_log_fails_open() {
        let log = Arc::new(StubEventLog::failing());

        assert!(gate(&log).should_rebuild(false).await);
        assert_eq!(log.calls(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn queries_watched_tables_over_the_window() {
        let log = Arc::new(StubEventLog::with_count(0));

        gate(&log)
            .with_window(Duration::from_secs(60))
            .should_rebuild(false)
            .await;

        let (tables, window) = log.last_request().expect("request recorded");
        assert_eq!(tables.len(), WATCHED_TABLES.len());
        assert!(tables.iter().any(|table| table == "trails"));
        assert_eq!(window, Duration::from_secs(60));
    }

    #[rstest]
    fn window_exceeds_an_hourly_schedule() {
        assert!(CHANGE_WINDOW > Duration::from_secs(3600));
    }
}
