use std::collections::BTreeMap;

use crate::config::{ConfigError, RetrydConfig};

/// Immutable retry policy: exception taxonomy, permanent failure topic and
/// the attempt -> delay table.
///
/// The delay table is kept in ascending attempt order; the sweep walks the
/// buckets in that order. Attempt numbers need not be contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retriable_exception: String,
    pub fatal_exception: String,
    pub droppable_exception: String,
    pub permanent_failure_topic: String,
    delays_ms: BTreeMap<u32, u64>,
}

impl RetryPolicy {
    pub fn new(
        retriable_exception: impl Into<String>,
        fatal_exception: impl Into<String>,
        droppable_exception: impl Into<String>,
        permanent_failure_topic: impl Into<String>,
        delays_ms: impl IntoIterator<Item = (u32, u64)>,
    ) -> Result<Self, ConfigError> {
        let permanent_failure_topic = permanent_failure_topic.into();
        if permanent_failure_topic.trim().is_empty() {
            return Err(ConfigError::BlankPermanentFailureTopic);
        }
        let mut table = BTreeMap::new();
        for (attempt, delay) in delays_ms {
            if attempt == 0 {
                return Err(ConfigError::InvalidAttempt(attempt.to_string()));
            }
            table.insert(attempt, delay);
        }
        if table.is_empty() {
            return Err(ConfigError::EmptyDelayTable);
        }
        Ok(Self {
            retriable_exception: retriable_exception.into(),
            fatal_exception: fatal_exception.into(),
            droppable_exception: droppable_exception.into(),
            permanent_failure_topic,
            delays_ms: table,
        })
    }

    /// Build the policy from loaded configuration, parsing the string-keyed
    /// delay table.
    pub fn from_config(cfg: &RetrydConfig) -> Result<Self, ConfigError> {
        let delays = cfg
            .retry_delays_ms
            .iter()
            .map(|(key, delay)| {
                key.trim()
                    .parse::<u32>()
                    .map(|attempt| (attempt, *delay))
                    .map_err(|_| ConfigError::InvalidAttempt(key.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(
            cfg.retriable_exception.clone(),
            cfg.fatal_exception.clone(),
            cfg.droppable_exception.clone(),
            cfg.permanent_failure_topic.clone(),
            delays,
        )
    }

    /// Maximum number of retries: the size of the delay table.
    pub fn max_retries(&self) -> u32 {
        self.delays_ms.len() as u32
    }

    /// True once `completed_retries` has reached the configured maximum.
    pub fn is_exhausted(&self, completed_retries: u32) -> bool {
        completed_retries >= self.max_retries()
    }

    /// Minimum delay configured for `attempt`, if that attempt is enabled.
    pub fn delay_ms(&self, attempt: u32) -> Option<u64> {
        self.delays_ms.get(&attempt).copied()
    }

    /// Earliest time a record produced at `timestamp_ms` may be re-dispatched
    /// for `attempt`. `None` when the attempt is not in the delay table.
    /// Saturates instead of overflowing.
    pub fn due_at(&self, attempt: u32, timestamp_ms: i64) -> Option<i64> {
        self.delay_ms(attempt).map(|delay| {
            timestamp_ms.saturating_add(i64::try_from(delay).unwrap_or(i64::MAX))
        })
    }

    /// `(attempt, delay_ms)` pairs in ascending attempt order.
    pub fn delays(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.delays_ms.iter().map(|(a, d)| (*a, *d))
    }
}
