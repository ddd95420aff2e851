//! Wire contract shared by the Pong server and its clients.
//!
//! Everything a client needs to speak to the server lives here: the board
//! geometry, the two player slots, the movement and control commands, the
//! match snapshot, and the two encodings the server speaks.
//!
//! - [`stream`]: length-framed `bincode` packets used by desktop clients.
//! - [`socket`]: JSON text frames used by browser clients over WebSocket.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod socket;
pub mod stream;

pub const BOARD_WIDTH: i32 = 800;
pub const BOARD_HEIGHT: i32 = 600;
pub const PADDLE_WIDTH: i32 = 10;
pub const PADDLE_HEIGHT: i32 = 80;
pub const BALL_SIZE: i32 = 15;
pub const PADDLE_SPEED: i32 = 5;
pub const TARGET_SCORE: u32 = 5;

/// Challenge sent by the server on both transports before anything else.
pub const AUTH_PROMPT: &str = "ENTER_SECRET";

/// Highest y a paddle's top edge may reach.
pub const PADDLE_MAX_Y: i32 = BOARD_HEIGHT - PADDLE_HEIGHT;

/// One of the two fixed player identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::One, Slot::Two];

    /// Zero-based index into per-slot arrays.
    pub fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }

    /// The number players see on screen and send over the wire.
    pub fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }

    pub fn from_number(number: u8) -> Option<Slot> {
        match number {
            1 => Some(Slot::One),
            2 => Some(Slot::Two),
            _ => None,
        }
    }

    pub fn opponent(self) -> Slot {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.number())
    }
}

/// Vertical movement intent for a paddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    Up,
    #[default]
    Stay,
    Down,
}

impl Direction {
    /// Maps the wire value `-1 | 0 | 1` to a direction.
    pub fn from_step(step: i64) -> Option<Direction> {
        match step {
            -1 => Some(Direction::Up),
            0 => Some(Direction::Stay),
            1 => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn step(self) -> i32 {
        match self {
            Direction::Up => -1,
            Direction::Stay => 0,
            Direction::Down => 1,
        }
    }
}

/// Latest movement intent of one player. Only the most recent value matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerCommand {
    pub direction: Direction,
}

impl PlayerCommand {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControlKind {
    Ready,
    Pause,
    Resume,
    Restart,
}

/// Edge-triggered lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub kind: ControlKind,
}

impl ControlCommand {
    pub fn new(kind: ControlKind) -> Self {
        Self { kind }
    }
}

/// Anything a session can receive from its player, whatever the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(PlayerCommand),
    Control(ControlCommand),
}

/// Snapshot of a match as broadcast to clients.
///
/// Coordinates live in a fixed 800x600 space with the origin at the top-left
/// corner. `winner` is 0 while the match is undecided, otherwise the winning
/// slot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchState {
    pub ball_x: i32,
    pub ball_y: i32,
    pub ball_dx: i32,
    pub ball_dy: i32,
    pub paddle_y: [i32; 2],
    pub score: [u32; 2],
    pub ready: [bool; 2],
    pub paused: bool,
    pub winner: u8,
}

impl MatchState {
    pub fn paddle(&self, slot: Slot) -> i32 {
        self.paddle_y[slot.index()]
    }

    pub fn score_of(&self, slot: Slot) -> u32 {
        self.score[slot.index()]
    }

    pub fn is_ready(&self, slot: Slot) -> bool {
        self.ready[slot.index()]
    }

    pub fn both_ready(&self) -> bool {
        self.ready.iter().all(|ready| *ready)
    }

    pub fn winner_slot(&self) -> Option<Slot> {
        Slot::from_number(self.winner)
    }

    pub fn total_score(&self) -> u32 {
        self.score.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_numbering() {
        assert_eq!(Slot::One.number(), 1);
        assert_eq!(Slot::Two.number(), 2);
        assert_eq!(Slot::One.index(), 0);
        assert_eq!(Slot::Two.index(), 1);
        assert_eq!(Slot::from_number(2), Some(Slot::Two));
        assert_eq!(Slot::from_number(0), None);
        assert_eq!(Slot::from_number(3), None);
        assert_eq!(Slot::One.opponent(), Slot::Two);
        assert_eq!(Slot::Two.to_string(), "P2");
    }

    #[test]
    fn test_direction_steps() {
        assert_eq!(Direction::from_step(-1), Some(Direction::Up));
        assert_eq!(Direction::from_step(0), Some(Direction::Stay));
        assert_eq!(Direction::from_step(1), Some(Direction::Down));
        assert_eq!(Direction::from_step(2), None);

        for direction in [Direction::Up, Direction::Stay, Direction::Down] {
            assert_eq!(Direction::from_step(direction.step() as i64), Some(direction));
        }
    }

    #[test]
    fn test_default_command_is_idle() {
        assert_eq!(PlayerCommand::default().direction, Direction::Stay);
    }

    #[test]
    fn test_match_state_accessors() {
        let state = MatchState {
            paddle_y: [10, 20],
            score: [3, 5],
            ready: [true, false],
            winner: 2,
            ..MatchState::default()
        };

        assert_eq!(state.paddle(Slot::Two), 20);
        assert_eq!(state.score_of(Slot::One), 3);
        assert_eq!(state.total_score(), 8);
        assert!(state.is_ready(Slot::One));
        assert!(!state.both_ready());
        assert_eq!(state.winner_slot(), Some(Slot::Two));
    }

    #[test]
    fn test_undecided_match_has_no_winner() {
        assert_eq!(MatchState::default().winner_slot(), None);
    }
}
