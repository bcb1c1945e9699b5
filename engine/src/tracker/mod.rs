//! Follow Tracker
//!
//! Keeps the latest user position and, while following, polls on a fixed
//! interval and sends the robot toward the user when it is far enough away.
//!
//! A position is valid for `staleness` after it was received (10 s by
//! default). The loop runs only while the following flag is set; it checks
//! the flag once per tick, so an in-flight robot call always completes.

use crate::config::FollowConfig;
use crate::robot::{Point, RobotControl};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Last reported user position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserPosition {
    pub x: i64,
    pub y: i64,
    /// Monotonic receive time, used for staleness
    pub observed_at: Instant,
    /// Wall-clock receive time, for display
    pub received_at: DateTime<Utc>,
}

impl UserPosition {
    pub fn point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowState {
    pub active: bool,
    pub last_position: Option<UserPosition>,
}

/// What a single poll tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No position, or the last one is stale
    NoValidPosition,
    /// Robot is within the follow distance
    TooClose { distance: f64 },
    /// A goto command was sent
    Moved { target: (i64, i64) },
    /// A robot call failed; the loop carries on
    Failed,
}

struct Inner {
    position: Mutex<Option<UserPosition>>,
    following: AtomicBool,
    running: AtomicBool,
    poll_interval: Duration,
    staleness: Duration,
    follow_distance: f64,
}

/// Cheaply cloneable handle; clones share state.
#[derive(Clone)]
pub struct FollowTracker {
    inner: Arc<Inner>,
}

impl Default for FollowTracker {
    fn default() -> Self {
        Self::new(&FollowConfig::default())
    }
}

impl FollowTracker {
    pub fn new(config: &FollowConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                position: Mutex::new(None),
                following: AtomicBool::new(false),
                running: AtomicBool::new(false),
                poll_interval: config.poll_interval(),
                staleness: config.staleness(),
                follow_distance: config.follow_distance,
            }),
        }
    }

    fn stored(&self) -> Option<UserPosition> {
        *self
            .inner
            .position
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the stored user position
    pub fn update_position(&self, x: i64, y: i64) {
        let position = UserPosition {
            x,
            y,
            observed_at: Instant::now(),
            received_at: Utc::now(),
        };

        *self
            .inner
            .position
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(position);

        tracing::debug!("User position updated: ({}, {})", x, y);
    }

    /// The stored position, if it is still within the staleness window
    pub fn position(&self) -> Option<UserPosition> {
        self.stored()
            .filter(|p| p.observed_at.elapsed() <= self.inner.staleness)
    }

    pub fn start_following(&self) {
        if !self.inner.following.swap(true, Ordering::SeqCst) {
            tracing::info!("Follow mode started");
        }
    }

    pub fn stop_following(&self) {
        if self.inner.following.swap(false, Ordering::SeqCst) {
            tracing::info!("Follow mode stopped");
        }
    }

    pub fn is_following(&self) -> bool {
        self.inner.following.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> FollowState {
        FollowState {
            active: self.is_following(),
            last_position: self.stored(),
        }
    }

    /// Whether the robot should head to the user. An unknown robot position
    /// counts as far away.
    pub fn should_move_to_user(&self, robot: Option<Point>) -> bool {
        let Some(user) = self.position() else {
            return false;
        };

        match robot {
            Some(robot) => robot.distance_to(&user.point()) > self.inner.follow_distance,
            None => true,
        }
    }

    /// One poll step
    pub async fn tick(&self, robot: &dyn RobotControl) -> TickOutcome {
        let Some(user) = self.position() else {
            tracing::debug!("No valid user position, waiting");
            return TickOutcome::NoValidPosition;
        };

        match robot.robot_position().await {
            Ok(Some(robot_at)) => {
                let distance = robot_at.distance_to(&user.point());
                if distance <= self.inner.follow_distance {
                    tracing::debug!("Robot is {:.0} units from user, staying", distance);
                    return TickOutcome::TooClose { distance };
                }
            }
            Ok(None) => {
                tracing::debug!("Robot position unknown, moving to user");
            }
            Err(e) => {
                tracing::warn!("Failed to read robot position: {}", e);
                return TickOutcome::Failed;
            }
        }

        match robot.goto_location(user.x, user.y).await {
            Ok(()) => {
                tracing::info!("Moving robot to user at ({}, {})", user.x, user.y);
                TickOutcome::Moved {
                    target: (user.x, user.y),
                }
            }
            Err(e) => {
                tracing::warn!("Goto command failed: {}", e);
                TickOutcome::Failed
            }
        }
    }

    /// Poll until following stops.
    pub async fn run(&self, robot: Arc<dyn RobotControl>) {
        self.inner.running.store(true, Ordering::SeqCst);
        tracing::info!(
            "Follow loop running (interval {:?}, distance {})",
            self.inner.poll_interval,
            self.inner.follow_distance
        );

        loop {
            while self.is_following() {
                self.tick(robot.as_ref()).await;
                tokio::time::sleep(self.inner.poll_interval).await;
            }

            if !self.resume_after_exit() {
                break;
            }
            tracing::debug!("Following restarted while the loop was exiting");
        }

        tracing::info!("Follow loop exited");
    }

    /// Release the running flag, then take it back if following was started
    /// again in the meantime. A `spawn` in that window saw the flag set and
    /// started nothing, so the exiting loop has to carry on. Returns whether
    /// the loop should keep going.
    fn resume_after_exit(&self) -> bool {
        self.inner.running.store(false, Ordering::SeqCst);
        self.is_following() && !self.inner.running.swap(true, Ordering::SeqCst)
    }

    /// Start the loop on a tokio task unless one is already running.
    pub fn spawn(&self, robot: Arc<dyn RobotControl>) -> Option<JoinHandle<()>> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return None;
        }

        let tracker = self.clone();
        Some(tokio::spawn(async move { tracker.run(robot).await }))
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_position_staleness() {
        let tracker = FollowTracker::default();
        assert!(tracker.position().is_none());

        tracker.update_position(100, 200);
        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(tracker.position().map(|p| (p.x, p.y)), Some((100, 200)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(tracker.position().is_none());
        // The raw value is still reported in the state
        assert!(tracker.state().last_position.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_replaces_previous_position() {
        let tracker = FollowTracker::default();
        tracker.update_position(1, 1);
        tokio::time::advance(Duration::from_secs(8)).await;
        tracker.update_position(2, 2);
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(tracker.position().map(|p| (p.x, p.y)), Some((2, 2)));
    }

    #[tokio::test]
    async fn test_should_move_to_user() {
        let tracker = FollowTracker::default();
        assert!(!tracker.should_move_to_user(Some(Point::new(0.0, 0.0))));

        tracker.update_position(600, 0);
        assert!(tracker.should_move_to_user(Some(Point::new(0.0, 0.0))));
        assert!(tracker.should_move_to_user(None));

        tracker.update_position(400, 0);
        assert!(!tracker.should_move_to_user(Some(Point::new(0.0, 0.0))));

        tracker.update_position(500, 0);
        assert!(!tracker.should_move_to_user(Some(Point::new(0.0, 0.0))));
    }

    #[test]
    fn test_exiting_loop_resumes_when_following_restarts() {
        let tracker = FollowTracker::default();
        tracker.inner.running.store(true, Ordering::SeqCst);

        // Following was re-enabled after the loop condition failed
        tracker.start_following();
        assert!(tracker.resume_after_exit());
        assert!(tracker.is_running());

        tracker.stop_following();
        assert!(!tracker.resume_after_exit());
        assert!(!tracker.is_running());
    }

    #[test]
    fn test_start_stop_following() {
        let tracker = FollowTracker::default();
        assert!(!tracker.is_following());

        tracker.start_following();
        let clone = tracker.clone();
        assert!(clone.is_following());

        clone.stop_following();
        assert!(!tracker.state().active);
    }
}
