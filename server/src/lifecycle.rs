//! Match lifecycle: the single task that owns simulation and broadcasting.
//!
//! ```text
//! FillingSlots -> WaitingReady -> Playing <-> Paused -> GameOver -> WaitingRestart
//!                      ^                                                  |
//!                      +--------------------------------------------------+
//! ```

use crate::context::ServerContext;
use crate::game::TickOutcome;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{MatchState, Slot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Waiting for both slots to hold a live session.
    FillingSlots,
    /// Waiting for both players to send READY on a fresh board.
    WaitingReady,
    Playing,
    Paused,
    /// A winner exists; one final broadcast goes out.
    GameOver,
    /// Waiting for both players to acknowledge with RESTART. The board is
    /// reset by the command that clears the last ready flag.
    WaitingRestart,
}

impl MatchPhase {
    /// Phase that follows `self` given the latest snapshot.
    pub fn next(self, state: &MatchState, slots_filled: bool) -> MatchPhase {
        match self {
            MatchPhase::FillingSlots if slots_filled => MatchPhase::WaitingReady,
            MatchPhase::FillingSlots => MatchPhase::FillingSlots,
            MatchPhase::WaitingReady if state.both_ready() => MatchPhase::Playing,
            MatchPhase::WaitingReady => MatchPhase::WaitingReady,
            MatchPhase::Playing | MatchPhase::Paused => {
                if state.winner != 0 {
                    MatchPhase::GameOver
                } else if state.paused {
                    MatchPhase::Paused
                } else {
                    MatchPhase::Playing
                }
            }
            MatchPhase::GameOver => MatchPhase::WaitingRestart,
            MatchPhase::WaitingRestart if state.winner == 0 => MatchPhase::WaitingReady,
            MatchPhase::WaitingRestart => MatchPhase::WaitingRestart,
        }
    }
}

pub struct MatchController {
    ctx: Arc<ServerContext>,
    phase: MatchPhase,
    rng: StdRng,
    ticker: Interval,
}

impl MatchController {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self::with_rng(ctx, StdRng::from_entropy())
    }

    pub fn with_rng(ctx: Arc<ServerContext>, rng: StdRng) -> Self {
        let mut ticker = interval(ctx.config.tick_duration.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            ctx,
            phase: MatchPhase::FillingSlots,
            rng,
            ticker,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Runs matches back to back for the lifetime of the process.
    pub async fn run(mut self) {
        info!("Waiting for two players");
        loop {
            self.step().await;
        }
    }

    /// Does one unit of work for the current phase, then transitions.
    pub async fn step(&mut self) {
        let snapshot = match self.phase {
            MatchPhase::FillingSlots => {
                sleep(self.ctx.config.wait_interval).await;
                self.snapshot().await
            }
            MatchPhase::WaitingReady | MatchPhase::WaitingRestart => {
                sleep(self.ctx.config.wait_interval).await;
                let snapshot = self.snapshot().await;
                self.broadcast(&snapshot).await;
                snapshot
            }
            MatchPhase::Playing | MatchPhase::Paused => self.tick().await,
            MatchPhase::GameOver => {
                let snapshot = self.snapshot().await;
                self.broadcast(&snapshot).await;
                snapshot
            }
        };

        let slots_filled = self.ctx.slots.read().await.both_filled();
        let next = self.phase.next(&snapshot, slots_filled);
        if next != self.phase {
            self.enter(next).await;
        }
    }

    /// One fixed-rate simulation tick. The interval absorbs the time spent
    /// simulating, broadcasting and transitioning since the previous tick.
    async fn tick(&mut self) -> MatchState {
        self.ticker.tick().await;

        let (outcome, snapshot) = {
            let mut game = self.ctx.game.lock().await;
            let outcome = game.step(&mut self.rng);
            (outcome, game.snapshot())
        };

        if let TickOutcome::Point { scorer } = outcome {
            debug!("Point for {}, ball relaunched", scorer);
        }

        self.broadcast(&snapshot).await;
        snapshot
    }

    async fn enter(&mut self, next: MatchPhase) {
        let previous = self.phase;
        self.phase = next;

        match next {
            MatchPhase::WaitingReady => info!("New match: waiting for both players to be ready"),
            MatchPhase::Playing if previous == MatchPhase::WaitingReady => {
                self.ctx.game.lock().await.launch_ball(Slot::Two, &mut self.rng);
                info!("Both players ready, match started");
            }
            MatchPhase::Playing => info!("Match resumed"),
            MatchPhase::Paused => info!("Match paused"),
            MatchPhase::GameOver => {
                let winner = self.ctx.game.lock().await.snapshot().winner;
                info!("Match ended. Winner: Player {}", winner);
            }
            MatchPhase::WaitingRestart => info!("Waiting for both players to restart"),
            MatchPhase::FillingSlots => info!("Waiting for two players"),
        }
    }

    async fn snapshot(&self) -> MatchState {
        self.ctx.game.lock().await.snapshot()
    }

    async fn broadcast(&self, snapshot: &MatchState) {
        self.ctx.slots.read().await.broadcast(snapshot);
    }
}
