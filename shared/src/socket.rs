//! JSON text frames spoken by browser clients over WebSocket.
//!
//! Handshake: the server sends `ENTER_SECRET`, the client answers with the
//! raw secret, the server replies `OK` or `FAIL`. The client then picks a slot
//! with `{"action":"CHOOSE_PLAYER","p":1}` and from there on sends
//! `MOVE`/`CONTROL` messages while receiving a `STATE` message per tick.

use crate::{Command, ControlCommand, ControlKind, Direction, MatchState, PlayerCommand, Slot};
use serde::{Deserialize, Serialize};

pub const AUTH_OK: &str = "OK";
pub const AUTH_FAIL: &str = "FAIL";
pub const CHOOSE_PLAYER: &str = "CHOOSE_PLAYER";

/// Flat view of a [`MatchState`] as browsers expect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFields {
    pub p1_y: i32,
    pub p2_y: i32,
    pub ball_x: i32,
    pub ball_y: i32,
    pub score1: u32,
    pub score2: u32,
    pub paused: bool,
    pub winner: u8,
    pub ready1: bool,
    pub ready2: bool,
}

impl From<&MatchState> for StateFields {
    fn from(state: &MatchState) -> Self {
        Self {
            p1_y: state.paddle(Slot::One),
            p2_y: state.paddle(Slot::Two),
            ball_x: state.ball_x,
            ball_y: state.ball_y,
            score1: state.score_of(Slot::One),
            score2: state.score_of(Slot::Two),
            paused: state.paused,
            winner: state.winner,
            ready1: state.is_ready(Slot::One),
            ready2: state.is_ready(Slot::Two),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ServerMessage {
    State(StateFields),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ClientMessage {
    Move { dir: i8 },
    Control { action: ControlKind },
}

impl ClientMessage {
    /// Converts to a command, rejecting directions outside `-1..=1`.
    pub fn into_command(self) -> Option<Command> {
        match self {
            ClientMessage::Move { dir } => Direction::from_step(dir as i64)
                .map(|direction| Command::Move(PlayerCommand::new(direction))),
            ClientMessage::Control { action } => Some(Command::Control(ControlCommand::new(action))),
        }
    }
}

/// Slot request sent once after authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRequest {
    pub action: String,
    pub p: u8,
}

impl SlotRequest {
    pub fn new(slot: Slot) -> Self {
        Self {
            action: CHOOSE_PLAYER.to_string(),
            p: slot.number(),
        }
    }
}

pub fn encode_state(state: &MatchState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ServerMessage::State(StateFields::from(state)))
}

/// Parses a gameplay message. `None` means the text was not a valid command.
pub fn parse_command(text: &str) -> Option<Command> {
    serde_json::from_str::<ClientMessage>(text)
        .ok()
        .and_then(ClientMessage::into_command)
}

/// Parses a `CHOOSE_PLAYER` request into the slot it asks for.
pub fn parse_slot_request(text: &str) -> Option<Slot> {
    let request: SlotRequest = serde_json::from_str(text).ok()?;
    if request.action != CHOOSE_PLAYER {
        return None;
    }
    Slot::from_number(request.p)
}
