use clap::Parser;
use log::{error, info};
use server::{RoomConfig, Server, ServerConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[clap(short, long, default_value = "3001")]
        port: u16,
        /// First countdown value before a race starts
        #[clap(short, long, default_value = "3")]
        countdown: u32,
        /// Seconds past the time limit before a race is forced to finish
        #[clap(short, long, default_value = "2")]
        grace_secs: u64,
        /// Events buffered per connection before new ones are dropped
        #[clap(long, default_value = "256")]
        outbox_capacity: usize,
        /// Only allow these room codes (repeatable); any code if omitted
        #[clap(short, long = "room")]
        rooms: Vec<String>,
    }

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        outbox_capacity: args.outbox_capacity,
        known_rooms: args.rooms,
        room: RoomConfig {
            countdown_from: args.countdown,
            finish_grace: Duration::from_secs(args.grace_secs),
            ..RoomConfig::default()
        },
    };

    let server = Server::bind(&config).await?;
    info!("Typing race coordinator ready on {}", server.local_addr()?);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
