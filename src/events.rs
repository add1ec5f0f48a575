use crate::gesture::{NavKey, Point};

/// Emitted once after the initial order is established.
pub const READY: &str = "carousel:ready";
/// Emitted before a rotation with the outgoing slide.
pub const SLIDE_BEFORE: &str = "carousel:slide:before";
/// Emitted after a rotation with the incoming slide.
pub const SLIDE_AFTER: &str = "carousel:slide:after";

/// Payload of every lifecycle notification: the active slide at emission time.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideState<S> {
    pub index: usize,
    pub slide: S,
}

/// Commands accepted by the driver task.
#[derive(Debug, Clone, PartialEq)]
pub enum CarouselCommand {
    Next,
    Previous,
    /// Jump straight to a slide index.
    Show(usize),
    SwipeStart(Point),
    SwipeEnd(Point),
    Key(NavKey),
    Hover(bool),
    StartAutoplay,
    StopAutoplay,
    Destroy,
}
