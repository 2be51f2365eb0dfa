//! Upload progress and ETA estimation.

use std::{fmt, time::Duration};
use tokio::time::Instant;

/// Snapshot of an upload in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub uploaded: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl Progress {
    /// Completed fraction in `[0, 1]`. An empty upload is complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.uploaded as f64 / self.total as f64
    }

    /// Remaining time estimated as `elapsed / fraction - elapsed`, or `None`
    /// before anything was uploaded.
    pub fn eta(&self) -> Option<Duration> {
        let fraction = self.fraction();
        if fraction <= 0.0 {
            return None;
        }
        let total = self.elapsed.as_secs_f64() / fraction;
        Some(Duration::from_secs_f64((total - self.elapsed.as_secs_f64()).max(0.0)))
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Uploading chunks ({:.2}%) {} chunks of {}.",
            self.fraction() * 100.0,
            self.uploaded,
            self.total
        )?;
        if let Some(eta) = self.eta() {
            write!(f, " ETA: {}", format_hms(eta))?;
        }
        Ok(())
    }
}

/// Formats a duration as `hh:mm:ss`.
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

/// Emits progress at most once per interval.
#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    start: Instant,
    last: Instant,
    interval: Duration,
}

impl ProgressThrottle {
    pub(crate) fn new(start: Instant, interval: Duration) -> Self {
        Self {
            start,
            last: start,
            interval,
        }
    }

    /// Returns a snapshot when more than the interval passed since the last
    /// one.
    pub(crate) fn tick(&mut self, now: Instant, uploaded: usize, total: usize) -> Option<Progress> {
        if now.saturating_duration_since(self.last) <= self.interval {
            return None;
        }
        self.last = now;
        Some(Progress {
            uploaded,
            total,
            elapsed: now.saturating_duration_since(self.start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eta() {
        let progress = Progress {
            uploaded: 25,
            total: 100,
            elapsed: Duration::from_secs(60),
        };
        assert_eq!(progress.eta(), Some(Duration::from_secs(180)));

        let none = Progress {
            uploaded: 0,
            ..progress
        };
        assert_eq!(none.eta(), None);
    }

    #[test]
    fn test_display() {
        let progress = Progress {
            uploaded: 1,
            total: 3,
            elapsed: Duration::from_secs(3723),
        };
        assert_eq!(
            progress.to_string(),
            "Uploading chunks (33.33%) 1 chunks of 3. ETA: 02:04:06"
        );

        let started = Progress {
            uploaded: 0,
            ..progress
        };
        assert_eq!(started.to_string(), "Uploading chunks (0.00%) 0 chunks of 3.");
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::ZERO), "00:00:00");
        assert_eq!(format_hms(Duration::from_secs(86_399)), "23:59:59");
        assert_eq!(format_hms(Duration::from_secs(90_061)), "25:01:01");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(start, Duration::from_secs(1));

        assert!(throttle.tick(start, 0, 10).is_none());
        assert!(throttle.tick(start + Duration::from_millis(1000), 1, 10).is_none());

        let later = start + Duration::from_millis(1500);
        let progress = throttle.tick(later, 2, 10).unwrap();
        assert_eq!(progress.elapsed, Duration::from_millis(1500));
        assert!(throttle.tick(later + Duration::from_millis(500), 3, 10).is_none());
        assert!(throttle.tick(later + Duration::from_millis(1001), 3, 10).is_some());
    }
}
