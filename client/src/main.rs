use clap::Parser;
use client::{ClientResult, Connection, TypingBot};
use log::{error, info, warn};
use rand::Rng;
use shared::{ClientMessage, GameState, ServerEvent, User};
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Coordinator WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:3001")]
    server: String,

    /// Room code to join
    #[arg(short = 'r', long)]
    room: String,

    /// Display name
    #[arg(short = 'n', long, default_value = "bot")]
    name: String,

    /// Target typing speed in words per minute
    #[arg(short = 'w', long, default_value = "60")]
    wpm: u32,

    /// Fraction of keystrokes typed wrong
    #[arg(short = 'e', long, default_value = "0.03")]
    error_rate: f64,

    /// As host, start the race once this many participants are present
    #[arg(long)]
    host_players: Option<usize>,

    /// Milliseconds between progress reports
    #[arg(long, default_value = "500")]
    report_ms: u64,
}

struct Race {
    bot: TypingBot,
    started: Instant,
    submitted: bool,
}

#[tokio::main]
async fn main() -> ClientResult<()> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let user = User::new(format!("bot-{:08x}", rand::thread_rng().gen::<u32>()), args.name.clone());

    info!("Connecting to {} as {}", args.server, user.name);
    let mut connection = Connection::connect(&args.server).await?;
    connection
        .send(&ClientMessage::JoinRoom {
            room_code: args.room.clone(),
            user: user.clone(),
        })
        .await?;

    tokio::select! {
        result = run(&args, &user, &mut connection) => result?,
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, leaving room"),
    }

    let _ = connection
        .send(&ClientMessage::LeaveRoom {
            room_code: args.room.clone(),
        })
        .await;
    connection.close().await?;
    Ok(())
}

async fn run(args: &Args, user: &User, connection: &mut Connection) -> ClientResult<()> {
    let mut is_host = false;
    let mut passage = String::new();
    let mut race: Option<Race> = None;
    let mut start_requested = false;

    let mut report = interval(Duration::from_millis(args.report_ms.max(50)));
    report.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = connection.next_event() => {
                let Some(event) = event? else {
                    warn!("Server closed the connection");
                    return Ok(());
                };
                match event {
                    ServerEvent::JoinedRoom { room_code, room } => {
                        is_host = room.host.id == user.id;
                        info!(
                            "Joined room {} with {} participant(s){}",
                            room_code,
                            room.participants.len(),
                            if is_host { " as host" } else { "" }
                        );
                    }
                    ServerEvent::RoomUpdated { participants, game_state, host, .. } => {
                        is_host = host.id == user.id;
                        let wanted = args.host_players.unwrap_or(usize::MAX);
                        if is_host
                            && !start_requested
                            && game_state == GameState::Waiting
                            && participants.len() >= wanted
                        {
                            info!("{} players present, starting race", participants.len());
                            start_requested = true;
                            connection
                                .send(&ClientMessage::StartGame {
                                    room_code: args.room.clone(),
                                    passage: None,
                                })
                                .await?;
                        }
                    }
                    ServerEvent::GameStarting { passage: text } => {
                        info!("Passage: {}", text);
                        passage = text;
                    }
                    ServerEvent::Countdown { n } => info!("{}...", n),
                    ServerEvent::GameStarted { time_limit, .. } => {
                        info!("Go! {}s on the clock", time_limit.as_secs());
                        let seed = rand::thread_rng().gen();
                        race = Some(Race {
                            bot: TypingBot::new(&passage, args.wpm, args.error_rate, seed),
                            started: Instant::now(),
                            submitted: false,
                        });
                    }
                    ServerEvent::LiveUpdate { user_id, progress, wpm, .. } if user_id != user.id => {
                        info!("{} at {:.0}% ({} wpm)", user_id, progress, wpm);
                    }
                    ServerEvent::GameFinished { results, winner } => {
                        for result in &results {
                            info!(
                                "#{} {} - {} wpm, {:.0}% accuracy",
                                result.position, result.name, result.wpm, result.accuracy
                            );
                        }
                        match winner {
                            Some(winner) => info!("Winner: {}", winner.name),
                            None => info!("No winner"),
                        }
                        return Ok(());
                    }
                    ServerEvent::Error { message } => error!("Server error: {}", message),
                    _ => {}
                }
            }
            _ = report.tick(), if race.as_ref().map_or(false, |r| !r.submitted) => {
                if let Some(race) = race.as_mut() {
                    report_progress(args, race, connection).await?;
                }
            }
        }
    }
}

async fn report_progress(args: &Args, race: &mut Race, connection: &mut Connection) -> ClientResult<()> {
    let elapsed = race.started.elapsed();
    race.bot.advance(elapsed);
    let stats = race.bot.stats(elapsed);

    connection
        .send(&ClientMessage::ProgressUpdate {
            room_code: args.room.clone(),
            progress: race.bot.progress(),
            wpm: stats.wpm,
            accuracy: stats.accuracy,
        })
        .await?;

    if race.bot.is_done() {
        info!("Finished typing: {} wpm, {:.0}% accuracy", stats.wpm, stats.accuracy);
        connection
            .send(&ClientMessage::SubmitResult {
                room_code: args.room.clone(),
                result: race.bot.result(elapsed),
            })
            .await?;
        race.submitted = true;
    }
    Ok(())
}
