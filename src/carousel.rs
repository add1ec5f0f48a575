//! The carousel dispatcher: turns commands, swipes, keys, hover and autoplay
//! ticks into rotations of a [`SlideRing`] and mirrors the result onto a
//! [`DisplaySurface`].
//!
//! The dispatcher is a synchronous state machine. Time only enters through the
//! `now` arguments; deferred work (re-arming transitions, autoplay ticks) is
//! exposed as deadlines via [`Carousel::next_deadline`] and executed by
//! [`Carousel::poll`]. The async driver in [`crate::tasks::driver`] sleeps on
//! those deadlines.
//!
//! Phases: `Uninitialized -> Ready <-> Transitioning`, and `Destroyed` from
//! anywhere. A destroyed carousel rejects every command with
//! [`Error::Destroyed`].

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::config::{Animation, CarouselOptions, OptionOverrides};
use crate::error::Error;
use crate::events::{READY, SLIDE_AFTER, SLIDE_BEFORE, SlideState};
use crate::gesture::{Capabilities, NavKey, Point, PointerOutcome, SwipeTracker};
use crate::ring::{Direction, Rotation, SlideRing, track_offset};
use crate::surface::{DisplaySurface, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    /// A reorder happened and transitions are waiting to be re-armed.
    Transitioning,
    Destroyed,
}

/// Repeating autoplay schedule.
///
/// `deadline` is present iff autoplay is enabled and not suspended.
#[derive(Debug, Default)]
struct Autoplay {
    delay: Option<Duration>,
    deadline: Option<Instant>,
    suspended: bool,
}

impl Autoplay {
    fn start(&mut self, delay: Duration, now: Instant) {
        self.stop();
        self.delay = Some(delay);
        if !self.suspended {
            self.deadline = Some(now + delay);
        }
    }

    fn stop(&mut self) {
        self.delay = None;
        self.deadline = None;
    }

    /// Push the pending tick out to a full delay from `now`.
    fn reschedule(&mut self, now: Instant) {
        if let (Some(delay), Some(_)) = (self.delay, self.deadline) {
            self.deadline = Some(now + delay);
        }
    }

    fn suspend(&mut self) {
        self.suspended = true;
        self.deadline = None;
    }

    fn resume(&mut self, now: Instant) {
        self.suspended = false;
        if let Some(delay) = self.delay {
            self.deadline = Some(now + delay);
        }
    }

    /// Consume a due tick and schedule the following one without drifting.
    /// Missed ticks collapse into one.
    fn take_due(&mut self, now: Instant) -> bool {
        let (Some(delay), Some(deadline)) = (self.delay, self.deadline) else {
            return false;
        };
        if deadline > now {
            return false;
        }
        let mut next = deadline + delay;
        if next <= now {
            next = now + delay;
        }
        self.deadline = Some(next);
        true
    }
}

/// How one slide step moves the active pointer.
#[derive(Debug, Clone, Copy)]
enum Movement {
    Step(Rotation),
    Jump(usize),
}

/// One carousel bound to its display surface.
#[derive(Debug)]
pub struct Carousel<D: DisplaySurface> {
    surface: D,
    options: CarouselOptions,
    capabilities: Capabilities,
    ring: SlideRing<D::Slide>,
    bus: EventBus<SlideState<D::Slide>>,
    phase: Phase,
    autoplay: Autoplay,
    /// Pending re-arm of transitions; replaced by every reorder.
    settle: Option<Instant>,
    swipe: SwipeTracker,
    offset: f32,
}

impl<D: DisplaySurface> Carousel<D> {
    /// Bind a carousel to `surface`, reading its slides and attributes.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOptions`] when the merged options are invalid.
    pub fn new(
        surface: D,
        overrides: &OptionOverrides,
        capabilities: Capabilities,
    ) -> Result<Self, Error> {
        let options = CarouselOptions::resolve(overrides, &surface.attributes())?;
        let ring = SlideRing::new(surface.slides(), options.looping);
        debug!(
            slides = ring.len(),
            visible = options.visible_count,
            autoplay = options.autoplay,
            "carousel attached"
        );
        Ok(Self {
            surface,
            options,
            capabilities,
            ring,
            bus: EventBus::new(),
            phase: Phase::Uninitialized,
            autoplay: Autoplay::default(),
            settle: None,
            swipe: SwipeTracker::new(),
            offset: 0.0,
        })
    }

    /// Bind to the first root in `document` matching `selector`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTarget`] when nothing matches.
    pub fn from_selector<Doc>(
        document: &Doc,
        selector: &str,
        overrides: &OptionOverrides,
        capabilities: Capabilities,
    ) -> Result<Self, Error>
    where
        Doc: Document<Surface = D>,
    {
        let surface = document
            .query_all(selector)
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidTarget(selector.to_owned()))?;
        Self::new(surface, overrides, capabilities)
    }

    /// Lifecycle notification bus. Register listeners before [`Self::initialize`]
    /// to observe `carousel:ready`.
    pub fn events_mut(&mut self) -> &mut EventBus<SlideState<D::Slide>> {
        &mut self.bus
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus<SlideState<D::Slide>> {
        &self.bus
    }

    /// Establish the initial order, arm transitions, start autoplay if
    /// configured and announce readiness.
    ///
    /// Re-initializing re-renders the same assignment and does not announce
    /// readiness again.
    ///
    /// # Errors
    /// [`Error::Destroyed`] after teardown, [`Error::Surface`] if the surface
    /// rejects the initial render.
    pub fn initialize(&mut self, now: Instant) -> Result<(), Error> {
        if self.phase == Phase::Destroyed {
            return Err(Error::Destroyed);
        }
        let first_time = self.phase == Phase::Uninitialized;
        let marker = self
            .surface
            .active_marker()
            .unwrap_or(self.options.initial_slide);
        self.ring.initialize(Some(marker));

        let len = self.ring.len();
        self.offset = track_offset(self.surface.width(), self.options.visible_count, len);
        self.render().map_err(Error::Surface)?;
        self.surface
            .set_navigation_visible(len > 1)
            .map_err(Error::Surface)?;
        self.surface
            .set_track_offset(self.offset)
            .map_err(Error::Surface)?;
        self.surface
            .set_transitions_enabled(true)
            .map_err(Error::Surface)?;
        self.settle = None;
        self.phase = Phase::Ready;

        if self.options.autoplay {
            self.autoplay.start(self.options.delay, now);
        }

        info!(
            slides = len,
            active = ?self.ring.active_index(),
            autoplay = self.autoplay.deadline.is_some(),
            "carousel ready"
        );
        if first_time {
            if let Some(state) = self.active_state() {
                self.bus.emit(READY, state);
            }
        }
        Ok(())
    }

    /// Rotate forward as if the "next" control was pressed.
    pub fn next(&mut self, now: Instant) -> Result<(), Error> {
        self.on_manual_command(Rotation::Advance, now)
    }

    /// Rotate backward as if the "previous" control was pressed.
    pub fn previous(&mut self, now: Instant) -> Result<(), Error> {
        self.on_manual_command(Rotation::Retreat, now)
    }

    /// Explicit user rotation by `slides_to_scroll` slides: slide, then
    /// restart the autoplay countdown.
    ///
    /// # Errors
    /// [`Error::Destroyed`] / [`Error::NotInitialized`] outside the live
    /// phases, [`Error::Surface`] if the surface rejects the reorder.
    pub fn on_manual_command(&mut self, rotation: Rotation, now: Instant) -> Result<(), Error> {
        self.manual(Movement::Step(rotation), now)
    }

    /// Make slide `index` active directly, as pagination does.
    ///
    /// Showing the slide that is already active still announces it.
    ///
    /// # Errors
    /// [`Error::SlideOutOfRange`] for an index past the last slide, otherwise
    /// as [`Self::on_manual_command`].
    pub fn show(&mut self, index: usize, now: Instant) -> Result<(), Error> {
        self.ensure_live()?;
        let len = self.ring.len();
        if index >= len {
            return Err(Error::SlideOutOfRange { index, len });
        }
        self.manual(Movement::Jump(index), now)
    }

    /// Record the first contact of a drag.
    pub fn swipe_start(&mut self, point: Point, now: Instant) -> Result<PointerOutcome, Error> {
        self.ensure_live()?;
        self.swipe.start(point, now);
        Ok(self.pointer_outcome(None))
    }

    /// Release a drag; a qualifying swipe rotates like a manual command.
    pub fn swipe_end(&mut self, point: Point, now: Instant) -> Result<PointerOutcome, Error> {
        self.ensure_live()?;
        let limits = self.options.swipe_thresholds();
        let command = self
            .swipe
            .finish(point, now, &limits)
            .filter(|_| self.options.navigation_swipe);
        if let Some(rotation) = command {
            self.on_manual_command(rotation, now)?;
        }
        Ok(self.pointer_outcome(command))
    }

    /// Arrow-key navigation. Ignored when navigation keys are disabled.
    pub fn key(&mut self, key: NavKey, now: Instant) -> Result<Option<Rotation>, Error> {
        self.ensure_live()?;
        if !self.options.navigation_keys {
            return Ok(None);
        }
        let rotation = key.rotation();
        self.on_manual_command(rotation, now)?;
        Ok(Some(rotation))
    }

    /// Pointer entered (`true`) or left (`false`) the carousel.
    pub fn hover(&mut self, entered: bool, now: Instant) -> Result<(), Error> {
        self.ensure_live()?;
        if !self.options.pause_on_hover {
            return Ok(());
        }
        if entered {
            self.autoplay.suspend();
        } else {
            self.autoplay.resume(now);
        }
        debug!(entered, "hover changed autoplay suspension");
        Ok(())
    }

    /// Start ticking every `delay`, replacing any running schedule.
    pub fn start_autoplay(&mut self, delay: Duration, now: Instant) -> Result<(), Error> {
        self.ensure_live()?;
        if delay.is_zero() {
            return Err(Error::InvalidOptions(
                "autoplay delay must be greater than zero".to_owned(),
            ));
        }
        self.autoplay.start(delay, now);
        debug!(delay_ms = delay.as_millis() as u64, "autoplay started");
        Ok(())
    }

    pub fn stop_autoplay(&mut self) -> Result<(), Error> {
        if self.phase == Phase::Destroyed {
            return Err(Error::Destroyed);
        }
        self.autoplay.stop();
        debug!("autoplay stopped");
        Ok(())
    }

    /// Run deferred work that is due at `now`.
    ///
    /// Never fails: a surface that has gone away only skips the re-arm, and a
    /// failing autoplay tick stops autoplay.
    pub fn poll(&mut self, now: Instant) {
        if self.phase == Phase::Destroyed {
            return;
        }
        if self.settle.is_some_and(|due| due <= now) {
            self.settle = None;
            if let Err(err) = self.surface.set_transitions_enabled(true) {
                debug!(error = %err, "skipping transition re-arm");
            }
            if self.phase == Phase::Transitioning {
                self.phase = Phase::Ready;
            }
        }
        if self.autoplay.take_due(now) {
            let steps = self.options.slides_to_scroll;
            if !self.ring.looping() && !self.ring.can_rotate(Rotation::Advance, steps) {
                info!("last slide reached; stopping autoplay");
                self.autoplay.stop();
                return;
            }
            if let Err(err) = self.slide(Movement::Step(Rotation::Advance), now) {
                warn!(error = %err, "autoplay tick failed; stopping autoplay");
                self.autoplay.stop();
            }
        }
    }

    /// Earliest instant at which [`Self::poll`] has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.settle, self.autoplay.deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Cancel timers, drop listeners and refuse further commands.
    pub fn destroy(&mut self) {
        if self.phase == Phase::Destroyed {
            return;
        }
        self.autoplay.stop();
        self.settle = None;
        self.swipe.cancel();
        self.bus.remove_listeners(None, true);
        self.phase = Phase::Destroyed;
        info!("carousel destroyed");
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn options(&self) -> &CarouselOptions {
        &self.options
    }

    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[must_use]
    pub const fn ring(&self) -> &SlideRing<D::Slide> {
        &self.ring
    }

    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.ring.active_index()
    }

    #[must_use]
    pub fn active_slide(&self) -> Option<&D::Slide> {
        self.ring.active_slide()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<usize> {
        self.ring.orders()
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.ring.direction()
    }

    #[must_use]
    pub const fn autoplay_deadline(&self) -> Option<Instant> {
        self.autoplay.deadline
    }

    #[must_use]
    pub const fn surface(&self) -> &D {
        &self.surface
    }

    /// Host-side access to the surface, e.g. when its root is removed.
    pub fn surface_mut(&mut self) -> &mut D {
        &mut self.surface
    }

    fn ensure_live(&self) -> Result<(), Error> {
        match self.phase {
            Phase::Destroyed => Err(Error::Destroyed),
            Phase::Uninitialized => Err(Error::NotInitialized),
            Phase::Ready | Phase::Transitioning => Ok(()),
        }
    }

    fn pointer_outcome(&self, command: Option<Rotation>) -> PointerOutcome {
        PointerOutcome {
            command,
            prevent_default: !self.capabilities.passive_listeners,
        }
    }

    fn active_state(&self) -> Option<SlideState<D::Slide>> {
        let index = self.ring.active_index()?;
        let slide = self.ring.active_slide()?.clone();
        Some(SlideState { index, slide })
    }

    fn manual(&mut self, movement: Movement, now: Instant) -> Result<(), Error> {
        self.ensure_live()?;
        self.slide(movement, now)?;
        if self.autoplay.deadline.is_some() {
            self.autoplay.reschedule(now);
            debug!("autoplay countdown restarted by manual command");
        }
        Ok(())
    }

    /// Announce, move, reorder and announce again. Empty carousels stay
    /// silent; a single slide announces itself unchanged.
    ///
    /// `slide:after` is emitted even when the surface rejects the reorder,
    /// carrying the slide that is still active.
    fn slide(&mut self, movement: Movement, now: Instant) -> Result<bool, Error> {
        let Some(before) = self.active_state() else {
            return Ok(false);
        };
        self.bus.emit(SLIDE_BEFORE, before);
        let result = self.move_and_render(movement, now);
        debug!(?movement, ok = result.is_ok(), active = ?self.ring.active_index(), "slide");
        if let Some(after) = self.active_state() {
            self.bus.emit(SLIDE_AFTER, after);
        }
        result.map_err(Error::Surface)
    }

    /// Move the ring and push the result to the surface. If the surface
    /// refuses, the ring goes back to its previous position and the surface is
    /// brought back in line with it.
    fn move_and_render(&mut self, movement: Movement, now: Instant) -> anyhow::Result<bool> {
        let previous = self.ring.position();
        let moved = match movement {
            Movement::Step(rotation) => self
                .ring
                .rotate_by(rotation, self.options.slides_to_scroll),
            Movement::Jump(index) => self.ring.jump_to(index),
        };
        if !moved {
            return Ok(false);
        }
        if let Err(err) = self.present_move(now) {
            self.ring.restore(previous);
            self.recover_surface(now);
            return Err(err);
        }
        Ok(true)
    }

    /// Disable transitions, apply the new order, and schedule the re-arm.
    fn present_move(&mut self, now: Instant) -> anyhow::Result<()> {
        self.apply_direction()?;
        self.surface.set_transitions_enabled(false)?;
        self.render()?;
        self.settle = Some(now + self.options.settle_delay);
        self.phase = Phase::Transitioning;
        Ok(())
    }

    fn apply_direction(&mut self) -> anyhow::Result<()> {
        match self.ring.direction() {
            Direction::Forward => {
                self.surface.set_reversing(false)?;
                self.surface.set_track_offset(self.offset.abs())?;
            }
            Direction::Reverse => {
                if self.options.animation != Animation::Fade {
                    self.surface.set_reversing(true)?;
                    self.surface.set_track_offset(-self.offset.abs())?;
                }
            }
        }
        Ok(())
    }

    /// Best-effort rewrite of the surface after a rejected reorder: every
    /// slide gets the order of the restored ring and transitions are re-armed.
    /// A re-arm the surface still refuses is left to the settle deadline.
    fn recover_surface(&mut self, now: Instant) {
        if let Err(err) = self.apply_direction() {
            debug!(error = %err, "could not restore direction markers");
        }
        let visible_count = self.options.visible_count;
        for (slide, order) in self.ring.iter_orders() {
            if let Err(err) =
                self.surface
                    .apply_order(slide, order, order == 0, order < visible_count)
            {
                debug!(error = %err, order, "could not restore slide order");
            }
        }
        match self.surface.set_transitions_enabled(true) {
            Ok(()) => {
                self.settle = None;
                self.phase = Phase::Ready;
            }
            Err(err) => {
                debug!(error = %err, "transition re-arm deferred");
                self.settle = Some(now + self.options.settle_delay);
                self.phase = Phase::Transitioning;
            }
        }
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let visible_count = self.options.visible_count;
        for (slide, order) in self.ring.iter_orders() {
            self.surface
                .apply_order(slide, order, order == 0, order < visible_count)?;
        }
        Ok(())
    }
}

/// Bind a carousel to every root in `document` matching `selector`.
///
/// An empty match yields an empty list rather than an error.
///
/// # Errors
/// Propagates [`Error::InvalidOptions`] from any matched root.
pub fn attach_all<Doc: Document>(
    document: &Doc,
    selector: &str,
    overrides: &OptionOverrides,
    capabilities: Capabilities,
) -> Result<Vec<Carousel<Doc::Surface>>, Error> {
    document
        .query_all(selector)
        .into_iter()
        .map(|surface| Carousel::new(surface, overrides, capabilities))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MemoryDocument, MemorySurface};

    fn ready(labels: &[&str]) -> (Carousel<MemorySurface>, Instant) {
        let mut carousel = Carousel::new(
            MemorySurface::new(labels.iter().copied()),
            &OptionOverrides::default(),
            Capabilities::default(),
        )
        .unwrap();
        let t0 = Instant::now();
        carousel.initialize(t0).unwrap();
        (carousel, t0)
    }

    #[test]
    fn commands_before_initialize_are_rejected() {
        let mut carousel = Carousel::new(
            MemorySurface::new(["a", "b"]),
            &OptionOverrides::default(),
            Capabilities::default(),
        )
        .unwrap();
        assert_eq!(carousel.phase(), Phase::Uninitialized);
        assert!(matches!(
            carousel.next(Instant::now()),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn rotation_passes_through_transitioning() {
        let (mut carousel, t0) = ready(&["a", "b", "c"]);
        assert_eq!(carousel.phase(), Phase::Ready);
        carousel.next(t0).unwrap();
        assert_eq!(carousel.phase(), Phase::Transitioning);
        assert!(!carousel.surface().transitions_enabled());

        carousel.poll(t0 + Duration::from_millis(49));
        assert_eq!(carousel.phase(), Phase::Transitioning);
        carousel.poll(t0 + Duration::from_millis(50));
        assert_eq!(carousel.phase(), Phase::Ready);
        assert!(carousel.surface().transitions_enabled());
    }

    #[test]
    fn later_rotation_supersedes_pending_settle() {
        let (mut carousel, t0) = ready(&["a", "b", "c"]);
        carousel.next(t0).unwrap();
        carousel.next(t0 + Duration::from_millis(30)).unwrap();
        assert_eq!(carousel.next_deadline(), Some(t0 + Duration::from_millis(80)));

        carousel.poll(t0 + Duration::from_millis(60));
        assert!(!carousel.surface().transitions_enabled());
        carousel.poll(t0 + Duration::from_millis(80));
        assert!(carousel.surface().transitions_enabled());
    }

    #[test]
    fn reverse_rotation_marks_reversing() {
        let (mut carousel, t0) = ready(&["a", "b", "c"]);
        carousel.previous(t0).unwrap();
        assert!(carousel.surface().reversing());
        assert_eq!(carousel.direction(), Direction::Reverse);
        carousel.next(t0).unwrap();
        assert!(!carousel.surface().reversing());
    }

    #[test]
    fn single_slide_hides_navigation() {
        let (carousel, _) = ready(&["only"]);
        assert!(!carousel.surface().navigation_visible());
        let (carousel, _) = ready(&["a", "b"]);
        assert!(carousel.surface().navigation_visible());
    }

    #[test]
    fn empty_carousel_is_inert() {
        let (mut carousel, t0) = ready(&[]);
        assert_eq!(carousel.active_index(), None);
        carousel.next(t0).unwrap();
        carousel.previous(t0).unwrap();
        assert_eq!(carousel.active_index(), None);
        assert_eq!(carousel.next_deadline(), None);
    }

    #[test]
    fn missed_autoplay_ticks_collapse() {
        let mut autoplay = Autoplay::default();
        let t0 = Instant::now();
        let delay = Duration::from_millis(100);
        autoplay.start(delay, t0);
        assert!(!autoplay.take_due(t0 + Duration::from_millis(99)));
        assert!(autoplay.take_due(t0 + Duration::from_millis(100)));
        assert_eq!(autoplay.deadline, Some(t0 + Duration::from_millis(200)));
        assert!(autoplay.take_due(t0 + Duration::from_millis(450)));
        assert_eq!(autoplay.deadline, Some(t0 + Duration::from_millis(550)));
    }

    #[test]
    fn from_selector_requires_a_match() {
        let doc = MemoryDocument::new(vec![MemorySurface::new(["a"])]);
        let err = Carousel::from_selector(
            &doc,
            ".slider",
            &OptionOverrides::default(),
            Capabilities::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(ref s) if s == ".slider"));
    }

    #[test]
    fn pointer_outcome_reflects_passive_support() {
        let mut carousel = Carousel::new(
            MemorySurface::new(["a", "b"]),
            &OptionOverrides::default(),
            Capabilities {
                passive_listeners: true,
            },
        )
        .unwrap();
        let t0 = Instant::now();
        carousel.initialize(t0).unwrap();
        let outcome = carousel.swipe_start(Point::new(10.0, 10.0), t0).unwrap();
        assert!(!outcome.prevent_default);
    }
}
