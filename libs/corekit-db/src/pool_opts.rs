//! Pool option application shared by every backend.

use crate::ConnectOpts;

/// Apply [`ConnectOpts`] to an sqlx pool builder.
pub trait ApplyPoolOpts {
    #[must_use]
    fn apply(self, opts: &ConnectOpts) -> Self;
}

impl<DB: sqlx::Database> ApplyPoolOpts for sqlx::pool::PoolOptions<DB> {
    fn apply(mut self, opts: &ConnectOpts) -> Self {
        if let Some(n) = opts.max_conns {
            self = self.max_connections(n);
        }
        if let Some(n) = opts.min_conns {
            self = self.min_connections(n);
        }
        if let Some(t) = opts.acquire_timeout {
            self = self.acquire_timeout(t);
        }
        if let Some(t) = opts.idle_timeout {
            self = self.idle_timeout(t);
        }
        if let Some(t) = opts.max_lifetime {
            self = self.max_lifetime(t);
        }
        self.test_before_acquire(opts.test_before_acquire)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(feature = "sqlite")]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn applies_pool_limits() {
        let opts = ConnectOpts {
            max_conns: Some(3),
            min_conns: Some(1),
            acquire_timeout: Some(Duration::from_secs(2)),
            ..ConnectOpts::default()
        };
        let pool = sqlx::sqlite::SqlitePoolOptions::new().apply(&opts);
        assert_eq!(pool.get_max_connections(), 3);
        assert_eq!(pool.get_min_connections(), 1);
        assert_eq!(pool.get_acquire_timeout(), Duration::from_secs(2));
    }
}
