use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bogio::LineReader;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{Level, debug, info, warn};

mod command;
mod ticker;
mod world;

use world::World;

/// Per-player outbound queue depth. Overflow kicks the client (see
/// `world::Client::push`) rather than stalling or reordering anyone.
const OUTBOUND_QUEUE: usize = 128;

const MAX_LINE_LEN: usize = 512;

fn usage_and_exit() -> ! {
    eprintln!(
        "bogmud\n\n\
USAGE:\n  bogmud [--bind HOST:PORT]\n\n\
ENV:\n  BOGMUD_BIND     default 0.0.0.0:9998\n  COMBAT_TICK_MS  default 1000\n  REPOP_TICK_MS   default 30000 (clamped to at least the combat tick)\n"
    );
    std::process::exit(2);
}

#[derive(Clone, Debug)]
struct Config {
    bind: SocketAddr,
    combat_tick_ms: u64,
    repop_tick_ms: u64,
}

fn parse_args() -> Config {
    let mut bind: SocketAddr = std::env::var("BOGMUD_BIND")
        .unwrap_or_else(|_| "0.0.0.0:9998".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let combat_tick_ms: u64 = std::env::var("COMBAT_TICK_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1000)
        .max(10);
    let repop_tick_ms: u64 = std::env::var("REPOP_TICK_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30000)
        .max(combat_tick_ms);

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bind" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                bind = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }

    Config {
        bind,
        combat_tick_ms,
        repop_tick_ms,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bogmud=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let cfg = parse_args();
    let world = Arc::new(World::load().context("build world")?);
    info!(rooms = world.room_count(), "world built");

    tokio::spawn(ticker::run(
        world.clone(),
        cfg.combat_tick_ms,
        cfg.repop_tick_ms,
    ));

    let listener = TcpListener::bind(cfg.bind).await?;
    info!(bind = %cfg.bind, "bogmud listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let world = world.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_conn(stream, peer, world).await {
                warn!(peer = %peer, err = %e, "connection ended with error");
            }
        });
    }
}

/// The gateway plus both session flows for one connection: greet, read the
/// name, register, then run the inbound loop here while a spawned task
/// drains the outbound queue.
async fn handle_conn(stream: TcpStream, peer: SocketAddr, world: Arc<World>) -> anyhow::Result<()> {
    let (rd, mut wr) = stream.into_split();
    let mut lines = LineReader::new(rd).max_line_len(MAX_LINE_LEN);

    info!(peer = %peer, "connection");
    let greeting = format!(
        "Welcome! There are {} players connected. What is your name? ",
        world.player_count().await
    );
    wr.write_all(greeting.as_bytes()).await?;

    // One line is the display name. Not validated, not unique.
    let Some(name) = lines.read_line().await? else {
        return Ok(());
    };
    let name = name.trim().to_string();

    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    let (kick_tx, mut kick_rx) = watch::channel(false);
    let id = world.register(name.clone(), tx, kick_tx).await;
    info!(peer = %peer, name = %name, id, "player joined");

    // Outbound flow: sole consumer of the queue. Every message gets its
    // color tokens expanded and a freshly composed status prompt.
    let writer_world = world.clone();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Some(stats) = writer_world.prompt_stats(id).await else {
                break;
            };
            let buf = format!("{}\n{}", bogtext::colorize(&msg), bogtext::prompt(stats));
            if wr.write_all(buf.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    world.show_room(id).await;

    // Inbound flow.
    loop {
        let res = tokio::select! {
            res = lines.read_line() => res,
            _ = kick_rx.changed() => {
                info!(peer = %peer, name = %name, "kicked: outbound queue overflow");
                break;
            }
        };
        let line = match res {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(peer = %peer, name = %name, err = %e, "read failed");
                break;
            }
        };
        if line == "quit" {
            break;
        }
        debug!(name = %name, line = %line, "input");
        world.dispatch(id, command::parse(&line)).await;
    }

    // Teardown runs exactly once whichever way the loop ended. Removing the
    // player releases its engagement and drops the queue sender, so the
    // writer drains what is left and exits on its own.
    world.remove_client(id).await;
    writer.await.ok();
    info!(peer = %peer, name = %name, "player left");
    Ok(())
}
