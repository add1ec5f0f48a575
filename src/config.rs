use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::error::Error;
use crate::gesture::SwipeThresholds;

/// Declarative `data-*` values read from a carousel root, keyed without the
/// `data-` prefix.
pub type Attributes = BTreeMap<String, String>;

/// Selector used by [`crate::carousel::attach_all`] when none is given.
pub const DEFAULT_SELECTOR: &str = ".carousel, .hero-carousel";

/// Transition style of the carousel root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Animation {
    #[default]
    Slide,
    /// Cross-fade; always shows a single slide.
    Fade,
}

impl Animation {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "slide" => Some(Self::Slide),
            "fade" => Some(Self::Fade),
            _ => None,
        }
    }
}

/// Fully resolved, immutable carousel options.
#[derive(Debug, Clone, PartialEq)]
pub struct CarouselOptions {
    /// Start rotating automatically after initialization.
    pub autoplay: bool,
    /// Interval between autoplay ticks.
    pub delay: Duration,
    /// Minimum horizontal swipe distance.
    pub swipe_threshold: f32,
    /// Maximum vertical drift during a swipe.
    pub swipe_restraint: f32,
    /// Maximum swipe duration.
    pub swipe_max_duration: Duration,
    /// Order slots rendered as visible.
    pub visible_count: usize,
    /// Wrap from the last slide to the first and back.
    pub looping: bool,
    /// Slide activated when the markup carries no active marker.
    pub initial_slide: usize,
    /// Suspend autoplay while the pointer hovers the carousel.
    pub pause_on_hover: bool,
    /// Slides moved by one next/previous step.
    pub slides_to_scroll: usize,
    /// Arrow keys rotate the carousel.
    pub navigation_keys: bool,
    /// Horizontal swipes rotate the carousel.
    pub navigation_swipe: bool,
    pub animation: Animation,
    /// Delay between a reorder and re-enabling transitions.
    pub settle_delay: Duration,
}

impl Default for CarouselOptions {
    fn default() -> Self {
        Self {
            autoplay: false,
            delay: Duration::from_millis(5000),
            swipe_threshold: 50.0,
            swipe_restraint: 100.0,
            swipe_max_duration: Duration::from_millis(500),
            visible_count: 1,
            looping: true,
            initial_slide: 0,
            pause_on_hover: true,
            slides_to_scroll: 1,
            navigation_keys: true,
            navigation_swipe: true,
            animation: Animation::Slide,
            settle_delay: Duration::from_millis(50),
        }
    }
}

impl CarouselOptions {
    /// Merge defaults, then caller overrides, then element attributes, and
    /// validate the result.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOptions`] for unparsable attributes or values
    /// that break an invariant.
    pub fn resolve(overrides: &OptionOverrides, attributes: &Attributes) -> Result<Self, Error> {
        let mut options = Self::default();
        overrides.apply(&mut options);
        options.apply_attributes(attributes)?;
        if options.animation == Animation::Fade {
            options.visible_count = 1;
        }
        options.validate()?;
        Ok(options)
    }

    #[must_use]
    pub const fn swipe_thresholds(&self) -> SwipeThresholds {
        SwipeThresholds {
            threshold: self.swipe_threshold,
            restraint: self.swipe_restraint,
            max_duration: self.swipe_max_duration,
        }
    }

    fn apply_attributes(&mut self, attributes: &Attributes) -> Result<(), Error> {
        if let Some(raw) = attributes.get("animation") {
            self.animation = Animation::parse(raw)
                .ok_or_else(|| invalid(format!("unknown animation {raw:?}")))?;
        }
        if let Some(raw) = attributes.get("autoplay") {
            self.autoplay = parse_flag(raw);
        }
        if let Some(raw) = attributes.get("delay") {
            self.delay = parse_delay(raw)?;
        }
        if let Some(raw) = attributes.get("size") {
            self.visible_count = raw
                .trim()
                .parse()
                .map_err(|_| invalid(format!("data-size must be an integer, got {raw:?}")))?;
        }
        if let Some(raw) = attributes.get("loop") {
            self.looping = parse_flag(raw);
        }
        if let Some(raw) = attributes.get("scroll") {
            self.slides_to_scroll = raw
                .trim()
                .parse()
                .map_err(|_| invalid(format!("data-scroll must be an integer, got {raw:?}")))?;
        }
        if let Some(raw) = attributes.get("swipe") {
            self.navigation_swipe = parse_flag(raw);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        if self.visible_count == 0 {
            return Err(invalid("visible-count must be at least 1"));
        }
        if self.slides_to_scroll == 0 {
            return Err(invalid("slides-to-scroll must be at least 1"));
        }
        if self.delay.is_zero() {
            return Err(invalid("delay must be greater than zero"));
        }
        if !(self.swipe_threshold.is_finite() && self.swipe_threshold >= 0.0) {
            return Err(invalid("swipe-threshold must be a non-negative number"));
        }
        if !(self.swipe_restraint.is_finite() && self.swipe_restraint >= 0.0) {
            return Err(invalid("swipe-restraint must be a non-negative number"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidOptions(msg.into())
}

/// Attribute flags are on unless spelled out as off.
fn parse_flag(raw: &str) -> bool {
    !matches!(raw.trim(), "false" | "0" | "off" | "no")
}

/// Plain integers are milliseconds; anything else goes through humantime.
fn parse_delay(raw: &str) -> Result<Duration, Error> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(raw).map_err(|err| invalid(format!("data-delay {raw:?}: {err}")))
}

/// Caller-supplied option overrides. Unset fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OptionOverrides {
    pub autoplay: Option<bool>,
    #[serde(with = "humantime_serde", alias = "autoplay-speed")]
    pub delay: Option<Duration>,
    #[serde(alias = "threshold")]
    pub swipe_threshold: Option<f32>,
    #[serde(alias = "restraint")]
    pub swipe_restraint: Option<f32>,
    #[serde(with = "humantime_serde", alias = "allowed-time")]
    pub swipe_max_duration: Option<Duration>,
    #[serde(alias = "size", alias = "slides-visible")]
    pub visible_count: Option<usize>,
    #[serde(rename = "loop")]
    pub looping: Option<bool>,
    pub initial_slide: Option<usize>,
    pub pause_on_hover: Option<bool>,
    #[serde(alias = "scroll")]
    pub slides_to_scroll: Option<usize>,
    pub navigation_keys: Option<bool>,
    pub navigation_swipe: Option<bool>,
    pub animation: Option<Animation>,
    #[serde(with = "humantime_serde")]
    pub settle_delay: Option<Duration>,
}

impl OptionOverrides {
    fn apply(&self, options: &mut CarouselOptions) {
        if let Some(v) = self.autoplay {
            options.autoplay = v;
        }
        if let Some(v) = self.delay {
            options.delay = v;
        }
        if let Some(v) = self.swipe_threshold {
            options.swipe_threshold = v;
        }
        if let Some(v) = self.swipe_restraint {
            options.swipe_restraint = v;
        }
        if let Some(v) = self.swipe_max_duration {
            options.swipe_max_duration = v;
        }
        if let Some(v) = self.visible_count {
            options.visible_count = v;
        }
        if let Some(v) = self.looping {
            options.looping = v;
        }
        if let Some(v) = self.initial_slide {
            options.initial_slide = v;
        }
        if let Some(v) = self.pause_on_hover {
            options.pause_on_hover = v;
        }
        if let Some(v) = self.slides_to_scroll {
            options.slides_to_scroll = v;
        }
        if let Some(v) = self.navigation_keys {
            options.navigation_keys = v;
        }
        if let Some(v) = self.navigation_swipe {
            options.navigation_swipe = v;
        }
        if let Some(v) = self.animation {
            options.animation = v;
        }
        if let Some(v) = self.settle_delay {
            options.settle_delay = v;
        }
    }
}

/// One carousel root hosted by the in-memory document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ElementConfig {
    /// Class names on the root, matched by selectors.
    #[serde(default = "ElementConfig::default_classes")]
    pub classes: Vec<String>,
    /// `data-*` attributes, without the prefix.
    #[serde(default)]
    pub data: Attributes,
    /// Slide labels in document order.
    pub slides: Vec<String>,
    /// Index of the slide carrying the active marker, if any.
    #[serde(default)]
    pub active: Option<usize>,
    /// Root width in pixels.
    #[serde(default = "ElementConfig::default_width")]
    pub width: f32,
}

impl ElementConfig {
    fn default_classes() -> Vec<String> {
        vec!["carousel".to_owned()]
    }

    const fn default_width() -> f32 {
        960.0
    }
}

/// Top-level YAML configuration for the `carousel` binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// Selector used to attach carousels.
    #[serde(default = "Configuration::default_selector")]
    pub selector: String,
    /// Whether the host supports passive input listeners.
    #[serde(default)]
    pub passive_listeners: bool,
    /// Overrides applied to every attached carousel.
    #[serde(default)]
    pub options: OptionOverrides,
    /// Carousel roots making up the document.
    #[serde(default)]
    pub carousels: Vec<ElementConfig>,
}

impl Configuration {
    fn default_selector() -> String {
        DEFAULT_SELECTOR.to_owned()
    }

    /// Read and parse a YAML configuration file.
    ///
    /// # Errors
    /// [`Error::Io`] when the file cannot be read, [`Error::Config`] when it
    /// does not parse.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.selector.trim().is_empty(), "selector must not be empty");
        for (idx, element) in self.carousels.iter().enumerate() {
            ensure!(
                element.width > 0.0,
                "carousels[{idx}].width must be positive"
            );
            if let Some(active) = element.active {
                ensure!(
                    active < element.slides.len(),
                    "carousels[{idx}].active is out of range"
                );
            }
            CarouselOptions::resolve(&self.options, &element.data)
                .with_context(|| format!("invalid options for carousels[{idx}]"))?;
        }
        Ok(self)
    }
}
