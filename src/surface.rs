//! Display-surface collaborator and an in-memory implementation of it.
//!
//! The carousel never touches markup directly. It enumerates slides, reads
//! attributes, and pushes order, visibility and transition markers through
//! [`DisplaySurface`].

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{Result, bail};
use tracing::trace;

use crate::config::{Attributes, ElementConfig};

/// Class toggled on the root while transitions are armed.
pub const ANIMATED_CLASS: &str = "carousel-animated";
/// Class present on the root while rotating backwards.
pub const REVERSING_CLASS: &str = "is-reversing";
/// Root class selecting the cross-fade animation.
pub const FADE_CLASS: &str = "carousel-animate-fade";

/// What the carousel needs from whatever renders it.
pub trait DisplaySurface {
    /// Stable handle to one slide.
    type Slide: Clone + fmt::Debug + Send + 'static;

    /// Slides in document order. Read once at initialization.
    fn slides(&self) -> Vec<Self::Slide>;

    /// Index of the slide carrying the active marker in the markup.
    fn active_marker(&self) -> Option<usize>;

    /// Declarative configuration attached to the root.
    fn attributes(&self) -> Attributes;

    /// Root width, used for multi-item track offsets.
    fn width(&self) -> f32;

    fn apply_order(
        &mut self,
        slide: &Self::Slide,
        order: usize,
        active: bool,
        visible: bool,
    ) -> Result<()>;

    /// Arm or disarm transitions. Must be idempotent.
    fn set_transitions_enabled(&mut self, enabled: bool) -> Result<()>;

    fn set_reversing(&mut self, reversing: bool) -> Result<()>;

    fn set_track_offset(&mut self, offset: f32) -> Result<()>;

    fn set_navigation_visible(&mut self, visible: bool) -> Result<()>;
}

/// Something that can be searched for carousel roots.
pub trait Document {
    type Surface: DisplaySurface;

    /// Every root matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Vec<Self::Surface>;
}

/// Handle to a slide hosted by [`MemorySurface`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlideHandle {
    pub index: usize,
    pub label: String,
}

impl fmt::Display for SlideHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Rendered state of one in-memory slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySlide {
    pub label: String,
    pub order: Option<usize>,
    pub active: bool,
    pub visible: bool,
}

/// Headless surface that keeps the rendered state in plain fields.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    classes: BTreeSet<String>,
    data: Attributes,
    slides: Vec<MemorySlide>,
    marker: Option<usize>,
    width: f32,
    reversing: bool,
    track_offset: f32,
    navigation_visible: bool,
    transitions: Vec<bool>,
    detached: bool,
    /// Writes left before one is rejected.
    fail_in: Option<usize>,
}

impl MemorySurface {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slides = labels
            .into_iter()
            .map(|label| MemorySlide {
                label: label.into(),
                order: None,
                active: false,
                visible: false,
            })
            .collect();
        Self {
            classes: BTreeSet::from(["carousel".to_owned()]),
            data: Attributes::new(),
            slides,
            marker: None,
            width: 960.0,
            reversing: false,
            track_offset: 0.0,
            navigation_visible: true,
            transitions: Vec::new(),
            detached: false,
            fail_in: None,
        }
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Put the active marker on slide `index`.
    #[must_use]
    pub fn with_active(mut self, index: usize) -> Self {
        self.marker = Some(index);
        self
    }

    #[must_use]
    pub const fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Simulate the root being removed; later mutations fail.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    /// Accept `writes` more mutations, reject the next one, then recover.
    pub fn fail_after(&mut self, writes: usize) {
        self.fail_in = Some(writes);
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    #[must_use]
    pub fn slide_states(&self) -> &[MemorySlide] {
        &self.slides
    }

    /// Labels sorted by their current order value.
    #[must_use]
    pub fn labels_by_order(&self) -> Vec<&str> {
        let mut ordered: Vec<&MemorySlide> = self.slides.iter().collect();
        ordered.sort_by_key(|slide| slide.order.unwrap_or(usize::MAX));
        ordered.iter().map(|slide| slide.label.as_str()).collect()
    }

    #[must_use]
    pub fn transitions_enabled(&self) -> bool {
        self.has_class(ANIMATED_CLASS)
    }

    /// Every transition marker write, oldest first.
    #[must_use]
    pub fn transition_history(&self) -> &[bool] {
        &self.transitions
    }

    #[must_use]
    pub const fn reversing(&self) -> bool {
        self.reversing
    }

    #[must_use]
    pub const fn track_offset(&self) -> f32 {
        self.track_offset
    }

    #[must_use]
    pub const fn navigation_visible(&self) -> bool {
        self.navigation_visible
    }

    fn check_write(&mut self) -> Result<()> {
        if self.detached {
            bail!("surface is no longer attached");
        }
        match self.fail_in {
            Some(0) => {
                self.fail_in = None;
                bail!("surface rejected the write");
            }
            Some(left) => self.fail_in = Some(left - 1),
            None => {}
        }
        Ok(())
    }

    fn matches(&self, selector: &str) -> bool {
        selector
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .any(|part| {
                let Some(classes) = part.strip_prefix('.') else {
                    return false;
                };
                classes
                    .split('.')
                    .all(|class| !class.is_empty() && self.classes.contains(class))
            })
    }
}

impl From<&ElementConfig> for MemorySurface {
    fn from(cfg: &ElementConfig) -> Self {
        let mut surface = Self::new(cfg.slides.iter().cloned()).with_width(cfg.width);
        surface.classes = cfg.classes.iter().cloned().collect();
        surface.data = cfg.data.clone();
        surface.marker = cfg.active;
        surface
    }
}

impl DisplaySurface for MemorySurface {
    type Slide = SlideHandle;

    fn slides(&self) -> Vec<SlideHandle> {
        self.slides
            .iter()
            .enumerate()
            .map(|(index, slide)| SlideHandle {
                index,
                label: slide.label.clone(),
            })
            .collect()
    }

    fn active_marker(&self) -> Option<usize> {
        self.marker
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = self.data.clone();
        if self.has_class(FADE_CLASS) {
            attrs.insert("animation".to_owned(), "fade".to_owned());
        }
        attrs
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn apply_order(
        &mut self,
        slide: &SlideHandle,
        order: usize,
        active: bool,
        visible: bool,
    ) -> Result<()> {
        self.check_write()?;
        let Some(state) = self.slides.get_mut(slide.index) else {
            bail!("unknown slide {}", slide.index);
        };
        state.order = Some(order);
        state.active = active;
        state.visible = visible;
        if active {
            self.marker = Some(slide.index);
        }
        trace!(slide = %slide, order, active, visible, "slide reordered");
        Ok(())
    }

    fn set_transitions_enabled(&mut self, enabled: bool) -> Result<()> {
        self.check_write()?;
        if enabled {
            self.classes.insert(ANIMATED_CLASS.to_owned());
        } else {
            self.classes.remove(ANIMATED_CLASS);
        }
        self.transitions.push(enabled);
        Ok(())
    }

    fn set_reversing(&mut self, reversing: bool) -> Result<()> {
        self.check_write()?;
        self.reversing = reversing;
        if reversing {
            self.classes.insert(REVERSING_CLASS.to_owned());
        } else {
            self.classes.remove(REVERSING_CLASS);
        }
        Ok(())
    }

    fn set_track_offset(&mut self, offset: f32) -> Result<()> {
        self.check_write()?;
        self.track_offset = offset;
        Ok(())
    }

    fn set_navigation_visible(&mut self, visible: bool) -> Result<()> {
        self.check_write()?;
        self.navigation_visible = visible;
        Ok(())
    }
}

/// A flat list of carousel roots searchable by class selectors.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    roots: Vec<MemorySurface>,
}

impl MemoryDocument {
    #[must_use]
    pub fn new(roots: Vec<MemorySurface>) -> Self {
        Self { roots }
    }

    pub fn from_elements<'a>(elements: impl IntoIterator<Item = &'a ElementConfig>) -> Self {
        Self::new(elements.into_iter().map(MemorySurface::from).collect())
    }
}

impl Document for MemoryDocument {
    type Surface = MemorySurface;

    fn query_all(&self, selector: &str) -> Vec<MemorySurface> {
        self.roots
            .iter()
            .filter(|root| root.matches(selector))
            .cloned()
            .collect()
    }
}
