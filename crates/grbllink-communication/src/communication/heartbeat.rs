//! Liveness monitoring
//!
//! The monitor only counts; the controller actor drives it from a
//! `tokio::time::interval` and performs whatever action a tick returns.
//! A period counts as missed when no status report arrived since the
//! previous query. The link is declared dead once `threshold` consecutive
//! queries go unanswered, which is never sooner than `period * threshold`
//! after the last report and never later than one period beyond that.

/// What the controller should do on a heartbeat tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Monitor is stopped
    Idle,
    /// Send a status query
    Query,
    /// No report for too long
    Dead {
        /// Consecutive unanswered periods
        missed: u32,
    },
}

/// Counts consecutive heartbeat periods without a status report
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    threshold: u32,
    missed: u32,
    answered: bool,
    active: bool,
}

impl LivenessMonitor {
    /// Create a stopped monitor declaring death after `threshold` silent periods
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            missed: 0,
            answered: false,
            active: false,
        }
    }

    /// Start counting from zero. The caller sends the first query.
    pub fn start(&mut self) {
        self.active = true;
        self.missed = 0;
        self.answered = false;
    }

    /// Stop; further ticks are [`HeartbeatAction::Idle`]
    pub fn stop(&mut self) {
        self.active = false;
        self.missed = 0;
        self.answered = false;
    }

    /// Whether ticks are being counted
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Consecutive unanswered periods
    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// A status report arrived
    pub fn on_status_report(&mut self) {
        self.missed = 0;
        self.answered = true;
    }

    /// One heartbeat period elapsed
    pub fn on_tick(&mut self) -> HeartbeatAction {
        if !self.active {
            return HeartbeatAction::Idle;
        }
        if self.answered {
            self.answered = false;
            return HeartbeatAction::Query;
        }
        self.missed += 1;
        if self.missed >= self.threshold {
            self.active = false;
            return HeartbeatAction::Dead {
                missed: self.missed,
            };
        }
        HeartbeatAction::Query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourth_heartbeat_declares_dead() {
        // Query on start, then three silent periods at threshold 3
        let mut monitor = LivenessMonitor::new(3);
        monitor.start();
        assert_eq!(monitor.on_tick(), HeartbeatAction::Query);
        assert_eq!(monitor.on_tick(), HeartbeatAction::Query);
        assert_eq!(monitor.on_tick(), HeartbeatAction::Dead { missed: 3 });
        assert!(!monitor.is_active());
        assert_eq!(monitor.on_tick(), HeartbeatAction::Idle);
    }

    #[test]
    fn test_report_resets_count() {
        let mut monitor = LivenessMonitor::new(3);
        monitor.start();
        for _ in 0..10 {
            assert_eq!(monitor.on_tick(), HeartbeatAction::Query);
            assert_eq!(monitor.on_tick(), HeartbeatAction::Query);
            monitor.on_status_report();
            assert_eq!(monitor.missed(), 0);
        }
    }

    #[test]
    fn test_answered_period_is_not_a_miss() {
        let mut monitor = LivenessMonitor::new(3);
        monitor.start();
        monitor.on_status_report();

        // The answered period queries again without counting
        assert_eq!(monitor.on_tick(), HeartbeatAction::Query);
        assert_eq!(monitor.missed(), 0);

        // Then three unanswered queries
        assert_eq!(monitor.on_tick(), HeartbeatAction::Query);
        assert_eq!(monitor.on_tick(), HeartbeatAction::Query);
        assert_eq!(monitor.on_tick(), HeartbeatAction::Dead { missed: 3 });
    }

    #[test]
    fn test_report_between_ticks_keeps_count_at_zero() {
        let mut monitor = LivenessMonitor::new(2);
        monitor.start();
        for _ in 0..10 {
            monitor.on_status_report();
            assert_eq!(monitor.on_tick(), HeartbeatAction::Query);
            assert_eq!(monitor.missed(), 0);
        }
    }

    #[test]
    fn test_stopped_monitor_is_idle() {
        let mut monitor = LivenessMonitor::new(3);
        assert_eq!(monitor.on_tick(), HeartbeatAction::Idle);
        monitor.start();
        monitor.on_tick();
        monitor.stop();
        assert_eq!(monitor.on_tick(), HeartbeatAction::Idle);
    }

    #[test]
    fn test_threshold_of_one() {
        let mut monitor = LivenessMonitor::new(1);
        monitor.start();
        assert_eq!(monitor.on_tick(), HeartbeatAction::Dead { missed: 1 });
    }
}
