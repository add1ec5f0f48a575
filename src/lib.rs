pub mod bus;
pub mod carousel;
pub mod config;
pub mod error;
pub mod events;
pub mod gesture;
pub mod ring;
pub mod surface;
pub mod tasks {
    pub mod console;
    pub mod driver;
}

pub use carousel::{Carousel, Phase, attach_all};
pub use error::Error;
pub use ring::{Direction, Rotation, SlideRing};
