//! Line-oriented command input for the demo binary.
//!
//! Each line optionally starts with a carousel index (default `0`) followed by
//! a verb: `next`/`n`, `prev`/`p`, `show <index>`, `left`, `right`, `swipe <dx> <dy>`,
//! `hover on|off`, `play`, `pause`, `destroy`, or `quit`.

use anyhow::{Context, Result, anyhow, bail};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::CarouselCommand;
use crate::gesture::{NavKey, Point};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Commands {
        target: usize,
        commands: Vec<CarouselCommand>,
    },
    Quit,
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleInput>> {
    let mut words = line.split_whitespace().peekable();
    let Some(first) = words.peek().copied() else {
        return Ok(None);
    };
    let target = match first.parse::<usize>() {
        Ok(idx) => {
            words.next();
            idx
        }
        Err(_) => 0,
    };
    let verb = words.next().ok_or_else(|| anyhow!("missing command"))?;
    let commands = match verb {
        "quit" | "q" | "exit" => return Ok(Some(ConsoleInput::Quit)),
        "next" | "n" => vec![CarouselCommand::Next],
        "prev" | "previous" | "p" => vec![CarouselCommand::Previous],
        "show" | "goto" => {
            let index = words
                .next()
                .ok_or_else(|| anyhow!("show expects <index>"))?
                .parse()
                .context("invalid slide index")?;
            vec![CarouselCommand::Show(index)]
        }
        "left" => vec![CarouselCommand::Key(NavKey::ArrowLeft)],
        "right" => vec![CarouselCommand::Key(NavKey::ArrowRight)],
        "swipe" => {
            let dx = parse_number(words.next(), "dx")?;
            let dy = parse_number(words.next(), "dy")?;
            vec![
                CarouselCommand::SwipeStart(Point::new(0.0, 0.0)),
                CarouselCommand::SwipeEnd(Point::new(dx, dy)),
            ]
        }
        "hover" => match words.next() {
            Some("on") => vec![CarouselCommand::Hover(true)],
            Some("off") => vec![CarouselCommand::Hover(false)],
            other => bail!("hover expects on|off, got {other:?}"),
        },
        "play" => vec![CarouselCommand::StartAutoplay],
        "pause" | "stop" => vec![CarouselCommand::StopAutoplay],
        "destroy" => vec![CarouselCommand::Destroy],
        other => bail!("unknown command {other:?}"),
    };
    if let Some(extra) = words.next() {
        bail!("unexpected argument {extra:?}");
    }
    Ok(Some(ConsoleInput::Commands { target, commands }))
}

fn parse_number(word: Option<&str>, name: &str) -> Result<f32> {
    word.ok_or_else(|| anyhow!("swipe expects <dx> <dy>"))?
        .parse()
        .with_context(|| format!("invalid {name}"))
}

/// Read lines from `input` and route commands to the matching driver.
/// Returns when input ends, `quit` is read, or `cancel` fires.
pub async fn run<R>(
    input: R,
    drivers: Vec<Sender<CarouselCommand>>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.context("failed to read command input")?,
        };
        let Some(line) = line else {
            debug!("command input closed");
            break;
        };
        let (target, commands) = match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(ConsoleInput::Quit)) => break,
            Ok(Some(ConsoleInput::Commands { target, commands })) => (target, commands),
            Err(err) => {
                warn!(input = %line, error = %err, "ignoring command");
                continue;
            }
        };
        let Some(driver) = drivers.get(target) else {
            warn!(target, available = drivers.len(), "no such carousel");
            continue;
        };
        for cmd in commands {
            if driver.send(cmd).await.is_err() {
                warn!(target, "carousel driver has stopped");
                break;
            }
        }
    }
    Ok(())
}
