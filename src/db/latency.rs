use crate::config::LatencyConfig;
use rand::Rng;
use std::time::Duration;
use tracing::trace;

/// Kind of data-layer operation, each with its own configured delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

/// Artificial response time standing in for a remote backend
#[derive(Debug, Clone)]
pub struct SimulatedLatency {
    config: LatencyConfig,
}

impl SimulatedLatency {
    pub fn new(config: LatencyConfig) -> Self {
        Self { config }
    }

    pub fn disabled() -> Self {
        Self::new(LatencyConfig::disabled())
    }

    /// Delay for one call of `op`, jitter included
    pub fn delay_for(&self, op: Operation) -> Duration {
        if !self.config.enabled {
            return Duration::ZERO;
        }

        let base = match op {
            Operation::List => self.config.list_ms,
            Operation::Get => self.config.get_ms,
            Operation::Create => self.config.create_ms,
            Operation::Update => self.config.update_ms,
            Operation::Delete => self.config.delete_ms,
        };
        let jitter = if self.config.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.jitter_ms)
        } else {
            0
        };

        Duration::from_millis(base + jitter)
    }

    /// Suspend the caller for the simulated response time
    pub async fn wait(&self, op: Operation) {
        let delay = self.delay_for(op);
        if delay.is_zero() {
            return;
        }
        trace!("Simulating {:?} latency of {:?}", op, delay);
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_latency_is_zero() {
        let latency = SimulatedLatency::disabled();
        assert_eq!(latency.delay_for(Operation::Create), Duration::ZERO);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let latency = SimulatedLatency::new(LatencyConfig {
            jitter_ms: 50,
            ..LatencyConfig::default()
        });
        for _ in 0..100 {
            let delay = latency.delay_for(Operation::Update);
            assert!(delay >= Duration::from_millis(250));
            assert!(delay <= Duration::from_millis(300));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_configured_delay() {
        let latency = SimulatedLatency::new(LatencyConfig::default());
        let started = tokio::time::Instant::now();
        latency.wait(Operation::Get).await;
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }
}
