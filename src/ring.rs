//! Circular slide ring used to implement an endlessly rotating carousel.
//!
//! The ring owns the slide handles and a single active pointer. Every order
//! value is derived from that pointer: the active slide sits at order `0` and
//! the rest follow by walking the cycle forward, so the assignment is always a
//! permutation of `0..len`.

/// A single step through the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Move the active pointer to the next slide.
    Advance,
    /// Move the active pointer to the previous slide.
    Retreat,
}

impl Rotation {
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Advance => Direction::Forward,
            Self::Retreat => Direction::Reverse,
        }
    }
}

/// Direction of the most recent rotation; selects the transition style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// Active pointer and direction, captured so a rejected move can be undone
/// without rotating again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingPosition {
    active: Option<usize>,
    direction: Direction,
}

/// Ring of slides with exactly one active member once initialized.
#[derive(Debug, Clone)]
pub struct SlideRing<S> {
    slides: Vec<S>,
    active: Option<usize>,
    direction: Direction,
    looping: bool,
}

impl<S> SlideRing<S> {
    /// Build a ring over `slides`. No slide is active until [`Self::initialize`].
    #[must_use]
    pub fn new(slides: Vec<S>, looping: bool) -> Self {
        Self {
            slides,
            active: None,
            direction: Direction::Forward,
            looping,
        }
    }

    /// Number of slides contained.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.slides.len()
    }

    /// Whether the ring holds no slides.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Make `initial_active` the foreground slide, falling back to the first
    /// slide when it is missing or out of range.
    ///
    /// Calling this twice with the same argument yields the same assignment.
    /// Returns the active index, or `None` for an empty ring.
    pub fn initialize(&mut self, initial_active: Option<usize>) -> Option<usize> {
        if self.slides.is_empty() {
            return None;
        }
        let idx = initial_active
            .filter(|idx| *idx < self.slides.len())
            .unwrap_or(0);
        self.active = Some(idx);
        self.direction = Direction::Forward;
        self.active
    }

    /// Step the active pointer once in the given direction.
    ///
    /// Returns `false` when there is nothing to rotate to: an empty or
    /// single-slide ring, an uninitialized ring, or a non-looping ring already
    /// at the matching end. None of these are errors.
    pub fn rotate(&mut self, rotation: Rotation) -> bool {
        self.rotate_by(rotation, 1)
    }

    /// Step the active pointer `steps` slides at once.
    ///
    /// A looping ring wraps around; a non-looping ring stops at its first or
    /// last slide.
    pub fn rotate_by(&mut self, rotation: Rotation, steps: usize) -> bool {
        let Some(next) = self.target(rotation, steps) else {
            return false;
        };
        self.active = Some(next);
        self.direction = rotation.direction();
        true
    }

    /// Whether [`Self::rotate_by`] would move the active pointer.
    #[must_use]
    pub fn can_rotate(&self, rotation: Rotation, steps: usize) -> bool {
        self.target(rotation, steps).is_some()
    }

    /// Make the slide at `index` active directly. The direction reflects
    /// whether the jump went up or down the list.
    ///
    /// Returns `false` for an uninitialized ring, an out-of-range index, or
    /// the slide that is already active.
    pub fn jump_to(&mut self, index: usize) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        if index >= self.slides.len() || index == active {
            return false;
        }
        self.direction = if index > active {
            Direction::Forward
        } else {
            Direction::Reverse
        };
        self.active = Some(index);
        true
    }

    #[must_use]
    pub const fn position(&self) -> RingPosition {
        RingPosition {
            active: self.active,
            direction: self.direction,
        }
    }

    /// Put the active pointer and direction back to a captured position.
    pub fn restore(&mut self, position: RingPosition) {
        self.active = position.active.filter(|idx| *idx < self.slides.len());
        self.direction = position.direction;
    }

    fn target(&self, rotation: Rotation, steps: usize) -> Option<usize> {
        let len = self.slides.len();
        let active = self.active?;
        if len <= 1 || steps == 0 {
            return None;
        }
        let next = if self.looping {
            let steps = steps % len;
            match rotation {
                Rotation::Advance => (active + steps) % len,
                Rotation::Retreat => (active + len - steps) % len,
            }
        } else {
            match rotation {
                Rotation::Advance => active.saturating_add(steps).min(len - 1),
                Rotation::Retreat => active.saturating_sub(steps),
            }
        };
        (next != active).then_some(next)
    }

    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Borrow the active slide.
    #[must_use]
    pub fn active_slide(&self) -> Option<&S> {
        self.active.and_then(|idx| self.slides.get(idx))
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub const fn looping(&self) -> bool {
        self.looping
    }

    /// Order value of the slide at `index`: its distance forward from the
    /// active slide.
    #[must_use]
    pub fn order_of(&self, index: usize) -> Option<usize> {
        let len = self.slides.len();
        if index >= len {
            return None;
        }
        self.active.map(|active| (index + len - active) % len)
    }

    /// Order values for every slide, indexed like the slides themselves.
    #[must_use]
    pub fn orders(&self) -> Vec<usize> {
        (0..self.slides.len())
            .filter_map(|idx| self.order_of(idx))
            .collect()
    }

    /// The slide currently holding order value `order`.
    #[must_use]
    pub fn slide_at_order(&self, order: usize) -> Option<&S> {
        let len = self.slides.len();
        if order >= len {
            return None;
        }
        self.active
            .and_then(|active| self.slides.get((active + order) % len))
    }

    /// Whether the slide at `index` falls inside the first `visible_count`
    /// order slots.
    #[must_use]
    pub fn is_visible(&self, index: usize, visible_count: usize) -> bool {
        self.order_of(index)
            .is_some_and(|order| order < visible_count.max(1))
    }

    /// Iterate `(slide, order)` pairs in slide order.
    pub fn iter_orders(&self) -> impl Iterator<Item = (&S, usize)> + '_ {
        self.slides
            .iter()
            .enumerate()
            .filter_map(|(idx, slide)| self.order_of(idx).map(|order| (slide, order)))
    }

    /// Borrow the internal list (read-only).
    #[must_use]
    pub fn as_slice(&self) -> &[S] {
        &self.slides
    }
}

/// Horizontal translation for multi-item layouts.
///
/// Single-item layouts, and layouts that already show every slide, never move
/// the track.
#[must_use]
pub fn track_offset(width: f32, visible_count: usize, len: usize) -> f32 {
    if visible_count <= 1 || visible_count >= len {
        0.0
    } else {
        width / visible_count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: usize) -> SlideRing<char> {
        SlideRing::new(('A'..).take(n).collect(), true)
    }

    fn assert_permutation(ring: &SlideRing<char>) {
        let mut orders = ring.orders();
        orders.sort_unstable();
        assert_eq!(orders, (0..ring.len()).collect::<Vec<_>>());
        let foreground = ring.iter_orders().filter(|(_, o)| *o == 0).count();
        assert_eq!(foreground, usize::from(!ring.is_empty()));
    }

    #[test]
    fn advance_then_retreat_scenario() {
        let mut r = ring(5);
        r.initialize(None);
        assert_eq!(r.active_slide(), Some(&'A'));

        assert!(r.rotate(Rotation::Advance));
        assert_eq!(r.active_slide(), Some(&'B'));
        let by_order: Vec<char> = (0..5).filter_map(|o| r.slide_at_order(o)).copied().collect();
        assert_eq!(by_order, vec!['B', 'C', 'D', 'E', 'A']);
        assert_eq!(r.direction(), Direction::Forward);

        assert!(r.rotate(Rotation::Retreat));
        assert_eq!(r.active_slide(), Some(&'A'));
        assert_eq!(r.orders(), vec![0, 1, 2, 3, 4]);
        assert_eq!(r.direction(), Direction::Reverse);
    }

    #[test]
    fn invariants_hold_across_many_rotations() {
        for n in 1..8 {
            let mut r = ring(n);
            r.initialize(Some(n / 2));
            assert_permutation(&r);
            for step in 0..(3 * n) {
                let rotation = if step % 3 == 2 {
                    Rotation::Retreat
                } else {
                    Rotation::Advance
                };
                r.rotate(rotation);
                assert_permutation(&r);
            }
        }
    }

    #[test]
    fn retreat_undoes_advance() {
        for n in 1..7 {
            for start in 0..n {
                let mut r = ring(n);
                r.initialize(Some(start));
                let before = r.orders();
                r.rotate(Rotation::Advance);
                r.rotate(Rotation::Retreat);
                assert_eq!(r.active_index(), Some(start));
                assert_eq!(r.orders(), before);
            }
        }
    }

    #[test]
    fn initialize_is_idempotent_and_clamps() {
        let mut r = ring(4);
        r.initialize(Some(2));
        let first = r.orders();
        r.initialize(Some(2));
        assert_eq!(r.orders(), first);
        assert_eq!(first, vec![2, 3, 0, 1]);

        assert_eq!(r.initialize(Some(9)), Some(0));
    }

    #[test]
    fn degenerate_rings_do_not_move() {
        let mut empty = ring(0);
        assert_eq!(empty.initialize(Some(0)), None);
        assert!(!empty.rotate(Rotation::Advance));
        assert_eq!(empty.active_index(), None);
        assert!(empty.orders().is_empty());

        let mut single = ring(1);
        single.initialize(None);
        assert!(!single.rotate(Rotation::Advance));
        assert!(!single.rotate(Rotation::Retreat));
        assert_eq!(single.active_slide(), Some(&'A'));
        assert_eq!(single.orders(), vec![0]);
    }

    #[test]
    fn uninitialized_ring_has_no_orders() {
        let mut r = ring(3);
        assert!(!r.rotate(Rotation::Advance));
        assert_eq!(r.order_of(0), None);
    }

    #[test]
    fn non_looping_ring_stops_at_ends() {
        let mut r = SlideRing::new(vec!['A', 'B', 'C'], false);
        r.initialize(None);
        assert!(!r.rotate(Rotation::Retreat));
        assert!(r.rotate(Rotation::Advance));
        assert!(r.rotate(Rotation::Advance));
        assert!(!r.rotate(Rotation::Advance));
        assert_eq!(r.active_slide(), Some(&'C'));
    }

    #[test]
    fn multi_step_rotation_wraps_or_clamps() {
        let mut r = ring(5);
        r.initialize(None);
        assert!(r.rotate_by(Rotation::Advance, 3));
        assert_eq!(r.active_index(), Some(3));
        assert!(r.rotate_by(Rotation::Advance, 3));
        assert_eq!(r.active_index(), Some(1));
        assert!(!r.rotate_by(Rotation::Advance, 5), "a full lap lands on the same slide");

        let mut bounded = SlideRing::new(vec!['A', 'B', 'C', 'D'], false);
        bounded.initialize(Some(1));
        assert!(bounded.rotate_by(Rotation::Advance, 3));
        assert_eq!(bounded.active_index(), Some(3));
        assert!(!bounded.can_rotate(Rotation::Advance, 1));
        assert!(bounded.rotate_by(Rotation::Retreat, 9));
        assert_eq!(bounded.active_index(), Some(0));
    }

    #[test]
    fn jump_sets_direction_from_target() {
        let mut r = ring(5);
        r.initialize(Some(2));
        assert!(r.jump_to(4));
        assert_eq!(r.direction(), Direction::Forward);
        assert!(r.jump_to(1));
        assert_eq!(r.direction(), Direction::Reverse);
        assert!(!r.jump_to(1));
        assert!(!r.jump_to(5));
        assert_eq!(r.active_index(), Some(1));
    }

    #[test]
    fn restore_undoes_a_move_including_direction() {
        let mut r = ring(4);
        r.initialize(None);
        r.rotate(Rotation::Retreat);
        let saved = r.position();
        r.rotate(Rotation::Advance);
        r.rotate(Rotation::Advance);
        r.restore(saved);
        assert_eq!(r.active_index(), Some(3));
        assert_eq!(r.direction(), Direction::Reverse);
    }

    #[test]
    fn visibility_follows_visible_count() {
        let mut r = ring(5);
        r.initialize(Some(3));
        let visible: Vec<bool> = (0..5).map(|idx| r.is_visible(idx, 2)).collect();
        assert_eq!(visible, vec![false, false, false, true, true]);
        assert!(r.is_visible(3, 0), "zero is treated as a single visible slot");
    }

    #[test]
    fn track_offset_only_for_partial_multi_item_layouts() {
        assert_eq!(track_offset(900.0, 1, 5), 0.0);
        assert_eq!(track_offset(900.0, 5, 5), 0.0);
        assert!((track_offset(900.0, 3, 5) - 300.0).abs() < f32::EPSILON);
    }
}
