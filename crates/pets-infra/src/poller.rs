use std::thread;
use std::time::Duration;

use pets_command::CommandError;
use tracing::debug;

use crate::status::ReadinessStatus;

/// One readiness check of a resource that is being created
#[cfg_attr(test, mockall::automock)]
pub trait ReadinessProbe {
    fn probe(&self) -> Result<ReadinessStatus, CommandError>;
}

/// The probe budget was spent without the resource becoming ready
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("not ready after {attempts} attempts")]
pub struct PollTimeout {
    pub attempts: u32,
}

/// Probes until ready.
///
/// A failed probe counts as "not ready yet", it never ends the loop. Without
/// `max_attempts` the loop only ends when the resource is ready. At least one
/// probe is made, so a `max_attempts` of 0 behaves like 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPoller {
    interval: Duration,
    max_attempts: Option<u32>,
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

impl ReadinessPoller {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// No delay between probes
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, None)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Returns the number of probes it took
    pub fn wait_until_ready<P>(&self, probe: &P) -> Result<u32, PollTimeout>
    where
        P: ReadinessProbe + ?Sized,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            match probe.probe() {
                Ok(status) if status.ready => {
                    debug!(attempts, "ready");
                    return Ok(attempts);
                }
                Ok(_) => debug!(attempts, "not ready yet"),
                Err(err) => debug!(attempts, %err, "probe failed, not ready yet"),
            }

            if let Some(max_attempts) = self.max_attempts {
                if attempts >= max_attempts {
                    return Err(PollTimeout { attempts });
                }
            }

            if !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;
    use pets_command::CommandErrorKind;

    use super::*;

    fn probe_error() -> CommandError {
        CommandError {
            command: "kubectl get pod/zookeeper-pets-zookeeper-0".to_string(),
            source: CommandErrorKind::ExitError(1, "connection refused".to_string()),
        }
    }

    #[test]
    fn test_polls_until_ready() {
        let mut probe = MockReadinessProbe::new();
        let mut seq = Sequence::new();
        probe
            .expect_probe()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|| Ok(ReadinessStatus::NOT_READY));
        probe
            .expect_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ReadinessStatus::READY));

        let attempts = ReadinessPoller::immediate()
            .wait_until_ready(&probe)
            .expect("ready");
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_probe_errors_do_not_abort() {
        let mut probe = MockReadinessProbe::new();
        let mut seq = Sequence::new();
        probe
            .expect_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(probe_error()));
        probe
            .expect_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ReadinessStatus::READY));

        let attempts = ReadinessPoller::immediate()
            .wait_until_ready(&probe)
            .expect("ready");
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_max_attempts() {
        let mut probe = MockReadinessProbe::new();
        probe
            .expect_probe()
            .times(4)
            .returning(|| Ok(ReadinessStatus::NOT_READY));

        let timeout = ReadinessPoller::immediate()
            .with_max_attempts(4)
            .wait_until_ready(&probe)
            .unwrap_err();
        assert_eq!(timeout, PollTimeout { attempts: 4 });
    }

    #[test]
    fn test_zero_budget_probes_once() {
        let mut probe = MockReadinessProbe::new();
        probe
            .expect_probe()
            .times(1)
            .returning(|| Ok(ReadinessStatus::NOT_READY));

        let timeout = ReadinessPoller::immediate()
            .with_max_attempts(0)
            .wait_until_ready(&probe)
            .unwrap_err();
        assert_eq!(timeout, PollTimeout { attempts: 1 });
    }

    #[test]
    fn test_waits_between_probes() {
        let mut probe = MockReadinessProbe::new();
        let mut seq = Sequence::new();
        probe
            .expect_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ReadinessStatus::NOT_READY));
        probe
            .expect_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ReadinessStatus::READY));

        let interval = Duration::from_millis(20);
        let started = std::time::Instant::now();
        ReadinessPoller::new(interval, None)
            .wait_until_ready(&probe)
            .expect("ready");
        assert!(started.elapsed() >= interval);
    }
}
