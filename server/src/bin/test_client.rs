//! Headless stream-transport player for exercising a running server.
//!
//! Authenticates, readies up, follows the ball with its paddle and
//! acknowledges restarts, so two instances can play each other forever.

use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};
use shared::stream::{read_packet, write_packet, StreamPacket};
use shared::{
    ControlCommand, ControlKind, Direction, MatchState, PlayerCommand, Slot, AUTH_PROMPT,
    BALL_SIZE, PADDLE_HEIGHT,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Stream listener of the server
    #[clap(short, long, default_value = "127.0.0.1:12345")]
    server: String,

    /// Shared secret
    #[clap(long, env = "PONG_SECRET")]
    secret: String,
}

/// Paddle tolerance before the bot bothers moving.
const DEAD_ZONE: i32 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    info!("Connected to {}", args.server);
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut prompt = String::new();
    reader.read_line(&mut prompt).await?;
    if prompt.trim_end() != AUTH_PROMPT {
        return Err(format!("unexpected prompt: {:?}", prompt).into());
    }
    writer
        .write_all(format!("{}\n", args.secret).as_bytes())
        .await?;

    let slot = match read_packet(&mut reader).await? {
        Some(StreamPacket::Assigned { slot }) => slot,
        Some(StreamPacket::Rejected { reason }) => {
            return Err(format!("rejected: {}", reason).into())
        }
        Some(other) => return Err(format!("unexpected packet: {:?}", other).into()),
        None => return Err("server closed the connection".into()),
    };
    info!("Playing as {}", slot);

    let mut bot = Bot::new(slot);
    loop {
        match read_packet(&mut reader).await {
            Ok(Some(StreamPacket::State(state))) => {
                for packet in bot.react(&state) {
                    write_packet(&mut writer, &packet).await?;
                }
            }
            Ok(Some(other)) => debug!("Ignoring {:?}", other),
            Ok(None) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) if e.is_recoverable() => warn!("Skipping bad frame: {}", e),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

struct Bot {
    slot: Slot,
    direction: Direction,
    last_control: Option<ControlKind>,
}

impl Bot {
    fn new(slot: Slot) -> Self {
        Self {
            slot,
            direction: Direction::Stay,
            last_control: None,
        }
    }

    /// Packets to send in answer to `state`. Only changes are sent.
    fn react(&mut self, state: &MatchState) -> Vec<StreamPacket> {
        let mut packets = Vec::new();
        let ready = state.is_ready(self.slot);

        let control = if state.winner == 0 && !ready {
            Some(ControlKind::Ready)
        } else if state.winner != 0 && ready {
            Some(ControlKind::Restart)
        } else {
            None
        };
        if let Some(kind) = control {
            if self.last_control != Some(kind) {
                info!("Sending {:?}", kind);
                packets.push(StreamPacket::Control(ControlCommand::new(kind)));
                self.last_control = Some(kind);
            }
        }

        let direction = follow(state.paddle(self.slot), state.ball_y);
        if direction != self.direction {
            packets.push(StreamPacket::Move(PlayerCommand::new(direction)));
            self.direction = direction;
        }

        packets
    }
}

fn follow(paddle_y: i32, ball_y: i32) -> Direction {
    let offset = (ball_y + BALL_SIZE / 2) - (paddle_y + PADDLE_HEIGHT / 2);
    if offset < -DEAD_ZONE {
        Direction::Up
    } else if offset > DEAD_ZONE {
        Direction::Down
    } else {
        Direction::Stay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_ball() {
        assert_eq!(follow(260, 0), Direction::Up);
        assert_eq!(follow(260, 500), Direction::Down);
        assert_eq!(follow(260, 292), Direction::Stay);
    }

    #[test]
    fn test_readies_once_then_restarts() {
        let mut bot = Bot::new(Slot::One);
        let mut state = MatchState {
            paddle_y: [260, 260],
            ball_y: 292,
            ..MatchState::default()
        };

        assert_eq!(
            bot.react(&state),
            vec![StreamPacket::Control(ControlCommand::new(ControlKind::Ready))]
        );
        assert!(bot.react(&state).is_empty());

        state.ready = [true, true];
        state.winner = 2;
        assert_eq!(
            bot.react(&state),
            vec![StreamPacket::Control(ControlCommand::new(ControlKind::Restart))]
        );
    }
}
