//! Tracking source that plays back a recorded pose script.
//!
//! The script has one line per hand per tick:
//!
//! ```text
//! # tick hand x y z [grip] [trigger]
//! 0 right 0.175 -0.4 -0.35 grip
//! 1 right 0.170 -0.35 -0.35 grip
//! 1 left lost
//! ```
//!
//! Ticks must not go backwards. A hand keeps its last pose and buttons through ticks that don't
//! mention it.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::thread;

use anyhow::{bail, ensure, Context};
use calloop::channel::{self, Channel, Event};
use glam::DVec3;

use super::{Buttons, Hand, Pose, SourceId, Tracking};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Line {
    tick: u64,
    hand: Hand,
    state: HandState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HandState {
    pose: Pose,
    buttons: Buttons,
}

/// Script lines as read by the reader thread.
pub type ScriptLines = Channel<io::Result<String>>;

/// Plays back script lines pushed into it.
///
/// Lines arrive from a reader thread (see [`open()`]), so `advance()` never touches the script
/// source. A tick is only played once every line for it has arrived: either a line for a later
/// tick was pushed or the script was closed.
pub struct Replay {
    pending: VecDeque<Line>,
    line_number: usize,
    /// Tick of the last pushed line.
    last_tick: Option<u64>,
    /// Tick of the current hand state, `None` before the first tick is played.
    tick: Option<u64>,
    left: Option<HandState>,
    right: Option<HandState>,
    pulses: Vec<(SourceId, u16)>,
    closed: bool,
    finished: bool,
    error: Option<anyhow::Error>,
}

/// Opens a script file, `-` reads from stdin.
pub fn open(path: &Path) -> anyhow::Result<ScriptLines> {
    if path == Path::new("-") {
        spawn_reader(BufReader::new(io::stdin()), "stdin".to_owned())
    } else {
        let file =
            File::open(path).with_context(|| format!("error opening {}", path.display()))?;
        spawn_reader(BufReader::new(file), path.display().to_string())
    }
}

/// Reads lines on a separate thread and sends them over a channel.
///
/// The channel closes at the end of the input or after the first read error.
pub fn spawn_reader(
    reader: impl BufRead + Send + 'static,
    name: String,
) -> anyhow::Result<ScriptLines> {
    let (tx, rx) = channel::channel();

    thread::Builder::new()
        .name(format!("Replay Reader for {name}"))
        .spawn(move || {
            for line in reader.lines() {
                let is_err = line.is_err();
                if tx.send(line).is_err() {
                    trace!("replay channel closed, stopping the reader");
                    break;
                }
                if is_err {
                    break;
                }
            }
        })
        .context("error spawning the replay reader thread")?;

    Ok(rx)
}

impl Default for Replay {
    fn default() -> Self {
        Self::new()
    }
}

impl Replay {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            line_number: 0,
            last_tick: None,
            tick: None,
            left: None,
            right: None,
            pulses: Vec::new(),
            closed: false,
            finished: false,
            error: None,
        }
    }

    /// Tick that the current hand state belongs to.
    pub fn tick(&self) -> Option<u64> {
        self.tick
    }

    /// Haptic pulses requested since the last `advance()`.
    pub fn pulses(&self) -> &[(SourceId, u16)] {
        &self.pulses
    }

    /// Returns the error that stopped the playback, if any.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    /// Whether the next tick still needs more lines before it can be played.
    pub fn is_waiting(&self) -> bool {
        if self.finished || self.closed || self.error.is_some() {
            return false;
        }

        let next = self.next_tick();
        !self.last_tick.is_some_and(|tick| tick > next)
    }

    pub fn handle_event(&mut self, event: Event<io::Result<String>>) {
        match event {
            Event::Msg(Ok(line)) => self.push_line(&line),
            Event::Msg(Err(err)) => {
                self.fail(anyhow::Error::new(err).context("error reading the replay script"))
            }
            Event::Closed => self.close(),
        }
    }

    /// Parses and queues one script line.
    pub fn push_line(&mut self, text: &str) {
        if self.error.is_some() || self.closed {
            return;
        }

        self.line_number += 1;

        let content = text.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            return;
        }

        let line_number = self.line_number;
        let line = match parse_line(content)
            .with_context(|| format!("error parsing replay line {line_number}"))
        {
            Ok(line) => line,
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        if let Some(last) = self.last_tick {
            if line.tick < last {
                self.fail(anyhow::anyhow!(
                    "replay line {line_number} goes back to tick {} from tick {last}",
                    line.tick,
                ));
                return;
            }
        }

        self.last_tick = Some(line.tick);
        self.pending.push_back(line);
    }

    /// Marks the end of the script.
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn fail(&mut self, err: anyhow::Error) {
        if self.error.is_none() && !self.finished {
            self.error = Some(err);
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.map_or(0, |tick| tick + 1)
    }

    fn source(hand: Hand) -> SourceId {
        match hand {
            Hand::Left => SourceId(1),
            Hand::Right => SourceId(2),
        }
    }

    fn state(&self, source: SourceId) -> Option<&HandState> {
        if source == Self::source(Hand::Left) {
            self.left.as_ref()
        } else if source == Self::source(Hand::Right) {
            self.right.as_ref()
        } else {
            None
        }
    }
}

impl Tracking for Replay {
    fn advance(&mut self) -> bool {
        self.pulses.clear();

        if self.finished {
            return false;
        }

        if self.error.is_some() {
            self.finished = true;
            return false;
        }

        if self.is_waiting() {
            trace!("waiting for replay lines for tick {}", self.next_tick());
            return true;
        }

        if self.pending.is_empty() {
            debug!("replay script ended at tick {:?}", self.tick);
            self.finished = true;
            return false;
        }

        let tick = self.next_tick();
        self.tick = Some(tick);

        while let Some(line) = self.pending.pop_front() {
            if line.tick != tick {
                self.pending.push_front(line);
                break;
            }

            match line.hand {
                Hand::Left => self.left = Some(line.state),
                Hand::Right => self.right = Some(line.state),
            }
        }

        true
    }

    fn hand_source(&self, hand: Hand) -> Option<SourceId> {
        let state = match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        };
        state.as_ref().map(|_| Self::source(hand))
    }

    fn pose(&self, source: SourceId) -> Option<Pose> {
        self.state(source).map(|state| state.pose)
    }

    fn buttons(&self, source: SourceId) -> Buttons {
        self.state(source)
            .map(|state| state.buttons)
            .unwrap_or_default()
    }

    fn haptic_pulse(&mut self, source: SourceId, strength: u16) {
        debug!("haptic pulse {strength} to {source:?}");
        self.pulses.push((source, strength));
    }
}

fn parse_line(line: &str) -> anyhow::Result<Line> {
    let mut words = line.split_whitespace();

    let tick = words.next().context("missing tick")?;
    let tick = tick
        .parse::<u64>()
        .with_context(|| format!("invalid tick {tick:?}"))?;

    let hand = match words.next() {
        Some("left") => Hand::Left,
        Some("right") => Hand::Right,
        Some(other) => bail!("invalid hand {other:?}, expected left or right"),
        None => bail!("missing hand"),
    };

    let mut words = words.peekable();
    if words.next_if_eq(&"lost").is_some() {
        ensure!(words.next().is_none(), "unexpected words after lost");
        return Ok(Line {
            tick,
            hand,
            state: HandState {
                pose: Pose {
                    position: DVec3::ZERO,
                    valid: false,
                },
                buttons: Buttons::default(),
            },
        });
    }

    let mut coord = |name: &str| -> anyhow::Result<f64> {
        let word = words.next().with_context(|| format!("missing {name}"))?;
        let value: f64 = word
            .parse()
            .with_context(|| format!("invalid {name} {word:?}"))?;
        ensure!(value.is_finite(), "{name} must be finite");
        Ok(value)
    };
    let position = DVec3::new(coord("x")?, coord("y")?, coord("z")?);

    let mut buttons = Buttons::default();
    for word in words {
        match word {
            "grip" => buttons.grip = true,
            "trigger" => buttons.trigger = true,
            other => bail!("unknown button {other:?}"),
        }
    }

    Ok(Line {
        tick,
        hand,
        state: HandState {
            pose: Pose {
                position,
                valid: true,
            },
            buttons,
        },
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use calloop::EventLoop;

    use super::*;
    use crate::tracking::sample_hands;

    fn replay(script: &str) -> Replay {
        let mut replay = Replay::new();
        for line in script.lines() {
            replay.push_line(line);
        }
        replay.close();
        replay
    }

    #[test]
    fn plays_ticks_in_order() {
        let mut replay = replay(
            "# a comment
            0 right 0.1 0.2 0.3 grip
            0 left -0.1 0.2 0.3

            2 left -0.2 0.2 0.3 trigger grip # trailing comment
            ",
        );

        assert!(replay.advance());
        assert_eq!(replay.tick(), Some(0));
        let hands = sample_hands(&replay);
        let right = hands.right.unwrap();
        assert_eq!(right.source, SourceId(2));
        assert_eq!(right.position, DVec3::new(0.1, 0.2, 0.3));
        assert!(right.buttons.grip);
        assert!(!hands.left.unwrap().buttons.grip);

        // Tick 1 has no lines, both hands stay where they were.
        assert!(replay.advance());
        assert_eq!(sample_hands(&replay), hands);

        assert!(replay.advance());
        let left = sample_hands(&replay).left.unwrap();
        assert_eq!(left.position, DVec3::new(-0.2, 0.2, 0.3));
        assert_eq!(
            left.buttons,
            Buttons {
                grip: true,
                trigger: true
            }
        );

        assert!(!replay.advance());
        assert!(replay.take_error().is_none());
    }

    #[test]
    fn unseen_hand_has_no_source() {
        let mut replay = replay("0 right 0 0 0");
        assert!(replay.advance());
        assert_eq!(replay.hand_source(Hand::Left), None);
        assert_eq!(replay.hand_source(Hand::Right), Some(SourceId(2)));
    }

    #[test]
    fn lost_hand_is_skipped() {
        let mut replay = replay(
            "0 left 0 0 0 grip
            1 left lost",
        );
        assert!(replay.advance());
        assert!(sample_hands(&replay).left.is_some());

        assert!(replay.advance());
        assert_eq!(replay.hand_source(Hand::Left), Some(SourceId(1)));
        assert!(sample_hands(&replay).left.is_none());
    }

    #[test]
    fn records_pulses_per_tick() {
        let mut replay = replay("0 left 0 0 0\n1 left 0 0 0");
        assert!(replay.advance());
        replay.haptic_pulse(SourceId(1), 2000);
        assert_eq!(replay.pulses(), [(SourceId(1), 2000)]);

        assert!(replay.advance());
        assert!(replay.pulses().is_empty());
    }

    #[test]
    fn empty_script_ends_immediately() {
        let mut replay = replay("# nothing here\n");
        assert!(!replay.advance());
        assert!(replay.take_error().is_none());
    }

    #[test]
    fn advance_without_lines_does_not_block() {
        let mut replay = Replay::new();
        assert!(replay.is_waiting());

        assert!(replay.advance());
        assert_eq!(replay.tick(), None);
        assert_eq!(replay.hand_source(Hand::Left), None);
        assert_eq!(replay.hand_source(Hand::Right), None);
    }

    #[test]
    fn tick_waits_for_a_later_line() {
        let mut replay = Replay::new();
        replay.push_line("0 left 0 0 0");

        // More lines for tick 0 may still arrive.
        assert!(replay.is_waiting());
        assert!(replay.advance());
        assert_eq!(replay.tick(), None);

        replay.push_line("0 right 1 0 0");
        replay.push_line("1 left 0 1 0");
        assert!(!replay.is_waiting());
        assert!(replay.advance());
        assert_eq!(replay.tick(), Some(0));
        assert!(sample_hands(&replay).right.is_some());

        assert!(replay.is_waiting());
        replay.close();
        assert!(!replay.is_waiting());
        assert!(replay.advance());
        assert_eq!(replay.tick(), Some(1));
        assert!(!replay.advance());
    }

    #[test]
    fn backwards_tick_is_an_error() {
        let mut replay = replay("1 left 0 0 0\n0 left 0 0 0");
        assert!(!replay.advance());

        let err = replay.take_error().unwrap();
        assert!(err.to_string().contains("replay line 2 goes back"), "{err}");
    }

    #[test]
    fn parse_errors_stop_playback() {
        for script in [
            "x left 0 0 0",
            "0 middle 0 0 0",
            "0 left 0 0",
            "0 left 0 nan 0",
            "0 left 0 0 0 thumbstick",
            "0 left lost grip",
        ] {
            let mut replay = replay(script);
            assert!(!replay.advance(), "{script}");

            let err = replay.take_error().unwrap();
            assert!(
                format!("{err:#}").contains("replay line 1"),
                "{script}: {err:#}"
            );

            // The error is reported once, playback stays stopped.
            assert!(!replay.advance());
            assert!(replay.take_error().is_none());
        }
    }

    #[test]
    fn read_error_stops_playback() {
        let mut replay = Replay::new();
        replay.handle_event(Event::Msg(Ok("0 left 0 0 0".to_owned())));
        replay.handle_event(Event::Msg(Err(io::Error::other("device gone"))));
        assert!(!replay.is_waiting());
        assert!(!replay.advance());

        let err = replay.take_error().unwrap();
        assert!(format!("{err:#}").contains("device gone"), "{err:#}");
    }

    #[test]
    fn reader_thread_delivers_lines() {
        let script = "0 left 0 0 0\n1 right 0 0 0 grip\n";
        let lines = spawn_reader(Cursor::new(script.to_owned()), "test".to_owned()).unwrap();

        let mut event_loop = EventLoop::<Replay>::try_new().unwrap();
        event_loop
            .handle()
            .insert_source(lines, |event, _, replay| replay.handle_event(event))
            .unwrap();

        let mut replay = Replay::new();
        for _ in 0..100 {
            if replay.closed {
                break;
            }
            event_loop
                .dispatch(Duration::from_millis(100), &mut replay)
                .unwrap();
        }
        assert!(replay.closed);

        assert!(replay.advance());
        assert!(replay.advance());
        assert!(sample_hands(&replay).right.unwrap().buttons.grip);
        assert!(!replay.advance());
        assert!(replay.take_error().is_none());
    }
}
