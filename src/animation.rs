//! Animated properties driven by the frame tick.
//!
//! An [`AnimatedVar`] holds a current value and a goal.  It can move towards
//! the goal along an eased timeline ([`set_target`](AnimatedVar::set_target))
//! or jump there immediately ([`warp`](AnimatedVar::warp)).  Gesture-tracked
//! geometry always warps so the overview follows the fingers 1:1.
//!
//! Completion is reported by [`advance`](AnimatedVar::advance) returning
//! [`AnimationStep::Completed`]; the owner of the variable decides what that
//! means (the session maps it to a registered completion action).

use crate::bezier::CubicBezier;
use crate::geometry::{lerp, lerp_vec, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timing profile shared by every property the session creates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Length of an eased transition (ms).  `0` completes on the next tick.
    pub duration_ms: u64,
    /// Easing curve applied to normalised time.
    pub curve: CubicBezier,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 300,
            curve: CubicBezier::EASE,
        }
    }
}

impl AnimationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// A value that can be interpolated by an [`AnimatedVar`].
pub trait Animatable: Copy + PartialEq + fmt::Debug {
    fn interpolate(from: Self, to: Self, t: f64) -> Self;
}

impl Animatable for f64 {
    fn interpolate(from: f64, to: f64, t: f64) -> f64 {
        lerp(from, to, t)
    }
}

impl Animatable for Vec2 {
    fn interpolate(from: Vec2, to: Vec2, t: f64) -> Vec2 {
        lerp_vec(from, to, t)
    }
}

/// What happened to a variable during one [`advance`](AnimatedVar::advance).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStep {
    /// Not animating; nothing changed.
    Idle,
    /// The value moved but has not reached the goal.
    Updated,
    /// The value reached the goal on this step.
    Completed,
}

/// A property animated towards a goal along an eased timeline.
#[derive(Debug, Clone)]
pub struct AnimatedVar<T: Animatable> {
    begun: T,
    value: T,
    goal: T,
    elapsed: Duration,
    config: AnimationConfig,
    running: bool,
}

impl<T: Animatable> AnimatedVar<T> {
    /// Create a resting variable at `initial`.
    pub fn new(initial: T, config: AnimationConfig) -> Self {
        Self {
            begun: initial,
            value: initial,
            goal: initial,
            elapsed: Duration::ZERO,
            config,
            running: false,
        }
    }

    /// Current (possibly mid-transition) value.
    pub fn value(&self) -> T {
        self.value
    }

    /// The value the variable is heading towards.
    pub fn goal(&self) -> T {
        self.goal
    }

    pub fn is_animating(&self) -> bool {
        self.running
    }

    /// Set the value immediately, cancelling any running transition.
    pub fn warp(&mut self, value: T) {
        self.begun = value;
        self.value = value;
        self.goal = value;
        self.running = false;
    }

    /// Start an eased transition from the current value to `goal`.
    ///
    /// A transition is started even when `goal` equals the current value, so
    /// a completion is always reported once the timeline elapses.
    pub fn set_target(&mut self, goal: T) {
        self.begun = self.value;
        self.goal = goal;
        self.elapsed = Duration::ZERO;
        self.running = true;
    }

    /// Timeline progress in `[0.0, 1.0]`; `1.0` when resting.
    pub fn percent(&self) -> f64 {
        if !self.running {
            return 1.0;
        }
        let total = self.config.duration();
        if total.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / total.as_secs_f64()).min(1.0)
    }

    /// Move the timeline forward by `dt`.
    pub fn advance(&mut self, dt: Duration) -> AnimationStep {
        if !self.running {
            return AnimationStep::Idle;
        }
        self.elapsed += dt;
        let t = self.percent();
        if t >= 1.0 {
            self.value = self.goal;
            self.running = false;
            return AnimationStep::Completed;
        }
        let eased = self.config.curve.ease(t);
        self.value = T::interpolate(self.begun, self.goal, eased);
        AnimationStep::Updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(ms: u64) -> AnimationConfig {
        AnimationConfig {
            duration_ms: ms,
            curve: CubicBezier::LINEAR,
        }
    }

    #[test]
    fn warp_is_immediate_and_complete() {
        let mut v = AnimatedVar::new(0.0, linear(100));
        v.warp(5.0);
        assert_eq!(v.value(), 5.0);
        assert_eq!(v.goal(), 5.0);
        assert!(!v.is_animating());
        assert_eq!(v.percent(), 1.0);
        assert_eq!(v.advance(Duration::from_millis(16)), AnimationStep::Idle);
    }

    #[test]
    fn set_target_eases_towards_goal() {
        let mut v = AnimatedVar::new(0.0, linear(100));
        v.set_target(10.0);
        assert_eq!(v.value(), 0.0);
        assert_eq!(v.percent(), 0.0);

        assert_eq!(v.advance(Duration::from_millis(50)), AnimationStep::Updated);
        assert!((v.value() - 5.0).abs() < 1e-6);
        assert!((v.percent() - 0.5).abs() < 1e-9);

        assert_eq!(v.advance(Duration::from_millis(50)), AnimationStep::Completed);
        assert_eq!(v.value(), 10.0);
        assert_eq!(v.advance(Duration::from_millis(50)), AnimationStep::Idle);
    }

    #[test]
    fn same_goal_still_completes() {
        let mut v = AnimatedVar::new(Vec2::new(1.0, 1.0), linear(10));
        v.set_target(Vec2::new(1.0, 1.0));
        assert!(v.is_animating());
        assert_eq!(v.advance(Duration::from_millis(10)), AnimationStep::Completed);
    }

    #[test]
    fn zero_duration_completes_on_next_tick() {
        let mut v = AnimatedVar::new(0.0, linear(0));
        v.set_target(3.0);
        assert_eq!(v.advance(Duration::ZERO), AnimationStep::Completed);
        assert_eq!(v.value(), 3.0);
    }

    #[test]
    fn warp_cancels_running_transition() {
        let mut v = AnimatedVar::new(0.0, linear(100));
        v.set_target(10.0);
        v.advance(Duration::from_millis(30));
        v.warp(2.0);
        assert!(!v.is_animating());
        assert_eq!(v.advance(Duration::from_millis(100)), AnimationStep::Idle);
        assert_eq!(v.value(), 2.0);
    }
}
