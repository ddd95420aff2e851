//! Authoritative match state and the fixed-tick Pong simulation.

use log::{debug, info};
use rand::Rng;
use shared::{
    Command, ControlKind, MatchState, PlayerCommand, Slot, BALL_SIZE, BOARD_HEIGHT, BOARD_WIDTH,
    PADDLE_HEIGHT, PADDLE_MAX_Y, PADDLE_SPEED, PADDLE_WIDTH, TARGET_SCORE,
};

/// Horizontal launch speed before any difficulty increase.
pub const BASE_SPEED_X: i32 = 5;
/// Vertical launch speed before any difficulty increase.
pub const BASE_SPEED_Y: i32 = 3;
/// Paddle hits never push the vertical speed beyond this.
pub const MAX_BOUNCE_SPEED_Y: i32 = 8;
/// Combined score interval at which the ball speeds up.
pub const DIFFICULTY_STEP: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRules {
    pub target_score: u32,
    /// Whether paddles keep following input while the match is paused.
    pub paddles_move_while_paused: bool,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            target_score: TARGET_SCORE,
            paddles_move_while_paused: true,
        }
    }
}

/// What a single simulation step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rally,
    Paused,
    Point { scorer: Slot },
    MatchOver { winner: Slot },
    /// The match already had a winner; nothing moved.
    Finished,
}

#[derive(Debug, Clone)]
pub struct GameState {
    state: MatchState,
    commands: [PlayerCommand; 2],
    speed_level: i32,
    rules: MatchRules,
}

impl GameState {
    pub fn new(rules: MatchRules) -> Self {
        let mut game = Self {
            state: MatchState::default(),
            commands: [PlayerCommand::default(); 2],
            speed_level: 0,
            rules,
        };
        game.reset_match();
        game
    }

    /// Immutable copy for broadcasting.
    pub fn snapshot(&self) -> MatchState {
        self.state
    }

    pub fn command(&self, slot: Slot) -> PlayerCommand {
        self.commands[slot.index()]
    }

    pub fn speed_level(&self) -> i32 {
        self.speed_level
    }

    /// Puts everything back to the start-of-match layout. The ball sits in the
    /// middle without velocity until [`GameState::launch_ball`] is called.
    pub fn reset_match(&mut self) {
        let center = BOARD_HEIGHT / 2 - PADDLE_HEIGHT / 2;
        self.state = MatchState {
            ball_x: BOARD_WIDTH / 2 - BALL_SIZE / 2,
            ball_y: BOARD_HEIGHT / 2 - BALL_SIZE / 2,
            ball_dx: 0,
            ball_dy: 0,
            paddle_y: [center, center],
            score: [0, 0],
            ready: [false, false],
            paused: false,
            winner: 0,
        };
        self.commands = [PlayerCommand::default(); 2];
        self.speed_level = 0;
    }

    /// Serves the ball from the center line toward `toward`.
    pub fn launch_ball<R: Rng + ?Sized>(&mut self, toward: Slot, rng: &mut R) {
        let speed_x = BASE_SPEED_X + self.speed_level;
        let speed_y = BASE_SPEED_Y + self.speed_level;

        self.state.ball_x = BOARD_WIDTH / 2 - BALL_SIZE / 2;
        self.state.ball_y = rng.gen_range(0..BOARD_HEIGHT - BALL_SIZE);
        self.state.ball_dx = match toward {
            Slot::One => -speed_x,
            Slot::Two => speed_x,
        };
        self.state.ball_dy = if rng.gen_bool(0.5) { speed_y } else { -speed_y };
    }

    pub fn apply(&mut self, slot: Slot, command: Command) {
        match command {
            Command::Move(cmd) => self.set_command(slot, cmd),
            Command::Control(cmd) => self.apply_control(slot, cmd.kind),
        }
    }

    /// Records the latest movement intent; earlier intents are overwritten.
    pub fn set_command(&mut self, slot: Slot, command: PlayerCommand) {
        self.commands[slot.index()] = command;
    }

    pub fn apply_control(&mut self, slot: Slot, kind: ControlKind) {
        match kind {
            ControlKind::Ready => {
                self.state.ready[slot.index()] = true;
                info!("{} is ready", slot);
            }
            ControlKind::Pause => {
                self.state.paused = true;
                info!("Match paused by {}", slot);
            }
            ControlKind::Resume => {
                self.state.paused = false;
                info!("Match resumed by {}", slot);
            }
            ControlKind::Restart => {
                self.state.ready[slot.index()] = false;
                info!("{} acknowledged restart", slot);
                self.restart_if_acknowledged();
            }
        }
    }

    /// Forgets everything a departed session contributed to its slot.
    pub fn release_slot(&mut self, slot: Slot) {
        self.state.ready[slot.index()] = false;
        self.commands[slot.index()] = PlayerCommand::default();
        self.restart_if_acknowledged();
    }

    /// Starts a fresh match once a finished one has no ready flag left.
    fn restart_if_acknowledged(&mut self) {
        if self.state.winner != 0 && !self.state.ready.iter().any(|ready| *ready) {
            self.reset_match();
            info!("Both players restarted, board reset");
        }
    }

    /// Advances the simulation by one tick.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TickOutcome {
        if self.state.winner != 0 {
            return TickOutcome::Finished;
        }

        if self.state.paused {
            if self.rules.paddles_move_while_paused {
                self.move_paddles();
            }
            return TickOutcome::Paused;
        }

        self.move_paddles();

        self.state.ball_x += self.state.ball_dx;
        self.state.ball_y += self.state.ball_dy;

        if self.state.ball_y <= 0 {
            self.state.ball_y = 0;
            self.state.ball_dy = self.state.ball_dy.abs();
        } else if self.state.ball_y + BALL_SIZE >= BOARD_HEIGHT {
            self.state.ball_y = BOARD_HEIGHT - BALL_SIZE;
            self.state.ball_dy = -self.state.ball_dy.abs();
        }

        if self.state.ball_x <= PADDLE_WIDTH {
            if self.ball_meets_paddle(Slot::One) {
                self.bounce_off_paddle(Slot::One, rng);
            } else {
                return self.award_point(Slot::Two, rng);
            }
        } else if self.state.ball_x + BALL_SIZE >= BOARD_WIDTH - PADDLE_WIDTH {
            if self.ball_meets_paddle(Slot::Two) {
                self.bounce_off_paddle(Slot::Two, rng);
            } else {
                return self.award_point(Slot::One, rng);
            }
        }

        TickOutcome::Rally
    }

    fn move_paddles(&mut self) {
        for slot in Slot::ALL {
            let step = self.commands[slot.index()].direction.step();
            let paddle = &mut self.state.paddle_y[slot.index()];
            *paddle = (*paddle + step * PADDLE_SPEED).clamp(0, PADDLE_MAX_Y);
        }
    }

    fn ball_meets_paddle(&self, slot: Slot) -> bool {
        let paddle = self.state.paddle(slot);
        self.state.ball_y + BALL_SIZE >= paddle && self.state.ball_y <= paddle + PADDLE_HEIGHT
    }

    /// Reflects the ball off `slot`'s paddle face with a small random change
    /// of vertical speed.
    fn bounce_off_paddle<R: Rng + ?Sized>(&mut self, slot: Slot, rng: &mut R) {
        match slot {
            Slot::One => {
                self.state.ball_x = PADDLE_WIDTH;
                self.state.ball_dx = self.state.ball_dx.abs();
            }
            Slot::Two => {
                self.state.ball_x = BOARD_WIDTH - PADDLE_WIDTH - BALL_SIZE;
                self.state.ball_dx = -self.state.ball_dx.abs();
            }
        }

        let delta: i32 = rng.gen_range(-2..=1);
        self.state.ball_dy =
            (self.state.ball_dy + delta).clamp(-MAX_BOUNCE_SPEED_Y, MAX_BOUNCE_SPEED_Y);
    }

    fn award_point<R: Rng + ?Sized>(&mut self, scorer: Slot, rng: &mut R) -> TickOutcome {
        self.state.score[scorer.index()] += 1;
        let score = self.state.score_of(scorer);
        info!(
            "{} scores ({} - {})",
            scorer,
            self.state.score_of(Slot::One),
            self.state.score_of(Slot::Two)
        );

        if score >= self.rules.target_score {
            self.state.winner = scorer.number();
            return TickOutcome::MatchOver { winner: scorer };
        }

        self.launch_ball(scorer.opponent(), rng);

        let total = self.state.total_score();
        if total > 0 && total % DIFFICULTY_STEP == 0 {
            self.increase_difficulty();
        }

        TickOutcome::Point { scorer }
    }

    /// Adds one to the magnitude of both velocity components. The level
    /// persists so later serves keep the higher speed.
    fn increase_difficulty(&mut self) {
        self.speed_level += 1;
        self.state.ball_dx += if self.state.ball_dx > 0 { 1 } else { -1 };
        self.state.ball_dy += if self.state.ball_dy > 0 { 1 } else { -1 };
        debug!(
            "Difficulty level {}: ball velocity ({}, {})",
            self.speed_level, self.state.ball_dx, self.state.ball_dy
        );
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut MatchState {
        &mut self.state
    }
}
