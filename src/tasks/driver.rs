use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::time::{Duration, Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::carousel::Carousel;
use crate::error::Error;
use crate::events::CarouselCommand;
use crate::surface::DisplaySurface;

const IDLE_WAKE: Duration = Duration::from_secs(3600);

/// Owns one initialized carousel and feeds it commands and timer wake-ups.
///
/// Rules:
/// - Commands are applied in arrival order, one at a time.
/// - Between commands the task sleeps until the carousel's next deadline and
///   then polls it, which re-arms transitions and fires autoplay ticks.
/// - `Destroy`, cancellation, or a closed command channel ends the task; the
///   carousel is handed back so the caller can inspect its final state.
pub async fn run<D>(
    mut carousel: Carousel<D>,
    mut commands: Receiver<CarouselCommand>,
    cancel: CancellationToken,
) -> Result<Carousel<D>>
where
    D: DisplaySurface,
{
    loop {
        let deadline = carousel.next_deadline();
        let wake = deadline.map_or_else(|| Instant::now() + IDLE_WAKE, Instant::from_std);

        select! {
            _ = cancel.cancelled() => break,

            maybe_cmd = commands.recv() => {
                match maybe_cmd {
                    Some(CarouselCommand::Destroy) => {
                        carousel.destroy();
                        break;
                    }
                    Some(cmd) => {
                        let now = Instant::now().into_std();
                        match apply(&mut carousel, &cmd, now) {
                            Ok(()) => {}
                            Err(Error::Destroyed) => break,
                            Err(err) => warn!(command = ?cmd, error = %err, "command failed"),
                        }
                    }
                    None => {
                        debug!("command channel closed");
                        break;
                    }
                }
            }

            _ = sleep_until(wake), if deadline.is_some() => {
                carousel.poll(Instant::now().into_std());
            }
        }
    }

    Ok(carousel)
}

fn apply<D: DisplaySurface>(
    carousel: &mut Carousel<D>,
    cmd: &CarouselCommand,
    now: std::time::Instant,
) -> Result<(), Error> {
    match *cmd {
        CarouselCommand::Next => carousel.next(now),
        CarouselCommand::Previous => carousel.previous(now),
        CarouselCommand::Show(index) => carousel.show(index, now),
        CarouselCommand::SwipeStart(point) => carousel.swipe_start(point, now).map(|_| ()),
        CarouselCommand::SwipeEnd(point) => carousel.swipe_end(point, now).map(|_| ()),
        CarouselCommand::Key(key) => carousel.key(key, now).map(|_| ()),
        CarouselCommand::Hover(entered) => carousel.hover(entered, now),
        CarouselCommand::StartAutoplay => {
            let delay = carousel.options().delay;
            carousel.start_autoplay(delay, now)
        }
        CarouselCommand::StopAutoplay => carousel.stop_autoplay(),
        CarouselCommand::Destroy => {
            carousel.destroy();
            Ok(())
        }
    }
}
