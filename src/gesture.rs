//! Swipe/drag classification and pointer bookkeeping.
//!
//! Raw listener wiring lives with the host; this module only sees the start
//! and end of a drag and decides whether it amounts to a rotation.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::ring::Rotation;

/// Page coordinates of a pointer or touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Limits a drag must respect to count as a horizontal swipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeThresholds {
    /// Minimum horizontal travel.
    pub threshold: f32,
    /// Maximum vertical drift.
    pub restraint: f32,
    /// Maximum time between contact and release.
    pub max_duration: Duration,
}

impl Default for SwipeThresholds {
    fn default() -> Self {
        Self {
            threshold: 50.0,
            restraint: 100.0,
            max_duration: Duration::from_millis(500),
        }
    }
}

/// Turn a finished drag into a rotation, or `None` when it is not a swipe.
///
/// Dragging left reveals the next slide; dragging right the previous one.
#[must_use]
pub fn classify_swipe(
    start: Point,
    end: Point,
    elapsed: Duration,
    limits: &SwipeThresholds,
) -> Option<Rotation> {
    if elapsed > limits.max_duration {
        return None;
    }
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dy.abs() > limits.restraint || dx.abs() < limits.threshold {
        return None;
    }
    if dx < 0.0 {
        Some(Rotation::Advance)
    } else if dx > 0.0 {
        Some(Rotation::Retreat)
    } else {
        None
    }
}

/// Platform input capabilities, probed once by the host at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Listeners can be registered as passive, so handlers never cancel the
    /// default action.
    pub passive_listeners: bool,
}

/// What an input handler should do after forwarding an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerOutcome {
    /// Rotation that was dispatched, if the event completed a swipe.
    pub command: Option<Rotation>,
    /// The handler must cancel the platform default action.
    pub prevent_default: bool,
}

/// Keyboard navigation keys recognized by the carousel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    ArrowLeft,
    ArrowRight,
}

impl NavKey {
    #[must_use]
    pub const fn rotation(self) -> Rotation {
        match self {
            Self::ArrowLeft => Rotation::Retreat,
            Self::ArrowRight => Rotation::Advance,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    at: Instant,
    point: Point,
}

/// Tracks one drag from contact to release.
#[derive(Debug, Default)]
pub struct SwipeTracker {
    contact: Option<Contact>,
}

impl SwipeTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self { contact: None }
    }

    /// Record first contact, replacing any unfinished drag.
    pub fn start(&mut self, point: Point, now: Instant) {
        self.contact = Some(Contact { at: now, point });
    }

    /// Finish the drag and classify it. A release without a recorded contact
    /// classifies as nothing.
    pub fn finish(
        &mut self,
        point: Point,
        now: Instant,
        limits: &SwipeThresholds,
    ) -> Option<Rotation> {
        let contact = self.contact.take()?;
        let elapsed = now.saturating_duration_since(contact.at);
        let rotation = classify_swipe(contact.point, point, elapsed, limits);
        trace!(
            dx = point.x - contact.point.x,
            dy = point.y - contact.point.y,
            elapsed_ms = elapsed.as_millis() as u64,
            ?rotation,
            "swipe finished"
        );
        rotation
    }

    /// Drop any drag in progress.
    pub fn cancel(&mut self) {
        self.contact = None;
    }

    #[must_use]
    pub const fn in_progress(&self) -> bool {
        self.contact.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(dx: f32, dy: f32, elapsed_ms: u64) -> Option<Rotation> {
        classify_swipe(
            Point::new(200.0, 100.0),
            Point::new(200.0 + dx, 100.0 + dy),
            Duration::from_millis(elapsed_ms),
            &SwipeThresholds::default(),
        )
    }

    #[test]
    fn boundary_cases() {
        assert_eq!(classify(-60.0, 10.0, 300), Some(Rotation::Advance));
        assert_eq!(classify(60.0, 10.0, 300), Some(Rotation::Retreat));
        assert_eq!(classify(40.0, 10.0, 300), None);
        assert_eq!(classify(-60.0, 150.0, 300), None);
        assert_eq!(classify(-60.0, 10.0, 600), None);
    }

    #[test]
    fn limits_are_inclusive() {
        assert_eq!(classify(-50.0, 100.0, 500), Some(Rotation::Advance));
        assert_eq!(classify(-49.9, 0.0, 100), None);
        assert_eq!(classify(-50.0, -100.1, 100), None);
    }

    #[test]
    fn tracker_needs_a_start() {
        let limits = SwipeThresholds::default();
        let t0 = Instant::now();
        let mut tracker = SwipeTracker::new();
        assert_eq!(tracker.finish(Point::new(0.0, 0.0), t0, &limits), None);

        tracker.start(Point::new(300.0, 50.0), t0);
        assert!(tracker.in_progress());
        let rotation = tracker.finish(
            Point::new(200.0, 60.0),
            t0 + Duration::from_millis(120),
            &limits,
        );
        assert_eq!(rotation, Some(Rotation::Advance));
        assert!(!tracker.in_progress(), "release consumes the contact");
    }

    #[test]
    fn arrow_keys_map_to_rotations() {
        assert_eq!(NavKey::ArrowLeft.rotation(), Rotation::Retreat);
        assert_eq!(NavKey::ArrowRight.rotation(), Rotation::Advance);
    }
}
