use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
};

use anyhow::{Context, Result};
use clap::Parser;
use coolmaster::{
    emulator::{Console, Emulator},
    UnitId,
};
use tracing::{info, warn};

/// Emulator for a CoolMaster bridge
///
/// Serves the bridge's text protocol over TCP so the client can be pointed
/// at it with a tcp+raw://host:port URL.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address and port to listen on (host:port)
    listen: String,

    /// Unit ids to emulate
    #[arg(long = "unit", default_values = ["101", "102"])]
    units: Vec<UnitId>,
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();

    let mut emulator = args
        .units
        .into_iter()
        .fold(Emulator::new(), |emulator, uid| emulator.with_unit(uid, Emulator::default_status()));

    let listener = TcpListener::bind(&args.listen)
        .with_context(|| format!("failed to listen on {}", args.listen))?;

    info!("listening on {}", args.listen);

    // the client opens one connection per command, so serving them one at a
    // time is enough
    for socket in listener.incoming() {
        let socket = match socket {
            Ok(socket) => socket,
            Err(err) => {
                warn!("accept failed: {err}");
                continue;
            }
        };

        let addr = socket.peer_addr().ok();
        if let Err(err) = serve(socket, &mut emulator) {
            warn!(?addr, "connection failed: {err}");
        }
    }

    Ok(())
}

fn serve(mut socket: TcpStream, emulator: &mut Emulator) -> Result<()> {
    socket.set_nodelay(true)?;

    let mut console = Console::new();
    let mut buffer = [0; 256];

    loop {
        let n = socket.read(&mut buffer)?;

        if n == 0 {
            return Ok(());
        }

        let output = console.receive(emulator, &buffer[..n]);
        socket.write_all(&output)?;
    }
}
