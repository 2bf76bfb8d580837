use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::common::{DEFAULT_REGEX_CACHE_CAPACITY, DEFAULT_REGEX_CACHE_TTL_SECS};
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};

use super::Evaluator;

/// Settings of an [`Evaluator`].
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use telemetra::evaluator::Evaluator;
///
/// # fn main() -> telemetra::errors::TelemetraResult<()> {
/// let evaluator = Evaluator::builder()
///     .regex_cache_capacity(64)
///     .regex_cache_ttl(Duration::from_secs(30))
///     .build()?;
/// assert_eq!(evaluator.config().regex_cache_capacity(), 64);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct EvaluatorConfig {
    inner: Arc<EvaluatorConfigInner>,
}

#[derive(Debug)]
struct EvaluatorConfigInner {
    regex_cache_capacity: NonZeroUsize,
    regex_cache_ttl: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            inner: Arc::new(EvaluatorConfigInner {
                regex_cache_capacity: NonZeroUsize::new(DEFAULT_REGEX_CACHE_CAPACITY)
                    .unwrap_or(NonZeroUsize::MIN),
                regex_cache_ttl: Duration::from_secs(DEFAULT_REGEX_CACHE_TTL_SECS),
            }),
        }
    }
}

impl EvaluatorConfig {
    /// Maximum number of compiled patterns kept by the regex cache.
    pub fn regex_cache_capacity(&self) -> usize {
        self.inner.regex_cache_capacity.get()
    }

    /// Time after its last access at which a cached pattern expires.
    pub fn regex_cache_ttl(&self) -> Duration {
        self.inner.regex_cache_ttl
    }

    pub(crate) fn regex_cache_capacity_non_zero(&self) -> NonZeroUsize {
        self.inner.regex_cache_capacity
    }
}

/// Builder for an [`Evaluator`].
///
/// Invalid settings are captured and reported by [`EvaluatorBuilder::build`],
/// so the chain itself never fails.
pub struct EvaluatorBuilder {
    error: Option<TelemetraError>,
    regex_cache_capacity: usize,
    regex_cache_ttl: Duration,
}

impl Default for EvaluatorBuilder {
    fn default() -> Self {
        EvaluatorBuilder::new()
    }
}

impl EvaluatorBuilder {
    pub fn new() -> Self {
        EvaluatorBuilder {
            error: None,
            regex_cache_capacity: DEFAULT_REGEX_CACHE_CAPACITY,
            regex_cache_ttl: Duration::from_secs(DEFAULT_REGEX_CACHE_TTL_SECS),
        }
    }

    /// Sets the number of compiled patterns the regex cache keeps.
    ///
    /// A capacity of zero is reported as a config error by `build`.
    pub fn regex_cache_capacity(mut self, capacity: usize) -> Self {
        if capacity == 0 && self.error.is_none() {
            log::error!("Regex cache capacity must be greater than zero");
            self.error = Some(TelemetraError::new(
                "Regex cache capacity must be greater than zero",
                ErrorKind::ConfigError,
            ));
        }
        self.regex_cache_capacity = capacity;
        self
    }

    /// Sets how long a cached pattern lives after its last access.
    pub fn regex_cache_ttl(mut self, ttl: Duration) -> Self {
        self.regex_cache_ttl = ttl;
        self
    }

    /// Builds the evaluator.
    ///
    /// # Errors
    ///
    /// The first configuration error captured by the chain.
    pub fn build(self) -> TelemetraResult<Evaluator> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let capacity = NonZeroUsize::new(self.regex_cache_capacity).ok_or_else(|| {
            TelemetraError::new(
                "Regex cache capacity must be greater than zero",
                ErrorKind::ConfigError,
            )
        })?;

        let config = EvaluatorConfig {
            inner: Arc::new(EvaluatorConfigInner {
                regex_cache_capacity: capacity,
                regex_cache_ttl: self.regex_cache_ttl,
            }),
        };
        Ok(Evaluator::with_config(config))
    }
}
