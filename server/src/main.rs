use clap::Parser;
use env_logger::Env;
use log::{error, info};
use server::config::{
    secret_from_env, tick_duration, ServerConfig, DEFAULT_SOCKET_PORT, DEFAULT_STREAM_PORT,
    DEFAULT_TICK_RATE,
};
use server::game::MatchRules;
use server::network::Server;
use shared::TARGET_SCORE;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address both listeners bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port of the framed-stream listener
    #[clap(long, default_value_t = DEFAULT_STREAM_PORT)]
    stream_port: u16,

    /// Port of the WebSocket listener
    #[clap(long, default_value_t = DEFAULT_SOCKET_PORT)]
    socket_port: u16,

    /// Simulation ticks per second
    #[clap(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,

    /// Points needed to win a match
    #[clap(long, default_value_t = TARGET_SCORE)]
    target_score: u32,

    /// Ignore paddle input while the match is paused
    #[clap(long)]
    freeze_paddles_when_paused: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let secret = match secret_from_env() {
        Ok(secret) => secret,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut config = ServerConfig::new(secret, &args.host);
    config.stream_addr = format!("{}:{}", args.host, args.stream_port);
    config.socket_addr = format!("{}:{}", args.host, args.socket_port);
    config.tick_duration = tick_duration(args.tick_rate);
    config.rules = MatchRules {
        target_score: args.target_score.max(1),
        paddles_move_while_paused: !args.freeze_paddles_when_paused,
    };
    info!("Starting with {:?}", config);

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
