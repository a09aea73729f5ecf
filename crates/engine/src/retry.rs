use configuration::UpdaterSettings;
use rand::Rng;
use std::time::Duration;

/// Bounded exponential backoff for the compare-and-swap loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    /// Upper bound of the pause after the `conflicts`-th lost swap:
    /// `base * 2^(conflicts - 1)`, capped at `max_backoff`.
    pub fn backoff_ceiling(&self, conflicts: u32) -> Duration {
        let factor = 2u32.saturating_pow(conflicts.saturating_sub(1));
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// The pause to actually take. With jitter it is drawn uniformly from
    /// `[0, ceiling]`.
    pub fn delay(&self, conflicts: u32) -> Duration {
        let ceiling = self.backoff_ceiling(conflicts);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }
        let micros = u64::try_from(ceiling.as_micros()).unwrap_or(u64::MAX);
        Duration::from_micros(rand::thread_rng().gen_range(0..=micros))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&UpdaterSettings::default())
    }
}

impl From<&UpdaterSettings> for RetryPolicy {
    fn from(settings: &UpdaterSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_backoff: settings.base_backoff(),
            max_backoff: settings.max_backoff(),
            jitter: settings.jitter,
        }
    }
}
