use std::net::{TcpListener, TcpStream};
use std::thread;

use batch_exchange::engine::codec::Compression;
use batch_exchange::engine::exchange::{EchoWorker, IdentityTransform};
use batch_exchange::logging;
use batch_exchange::shared::config::CONFIG;
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "echo_worker")]
#[command(about = "Reference worker: echoes every batch it receives", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    bind: String,

    /// Compression for reply batches (none | lz4). Defaults to the configured value.
    #[arg(short, long)]
    compression: Option<Compression>,

    /// Stop after serving this many connections (0 = serve forever)
    #[arg(long, default_value = "0")]
    max_connections: usize,
}

fn serve_connection(stream: TcpStream, compression: Compression) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    let mut worker = EchoWorker::new(IdentityTransform).with_compression(compression);
    match worker.serve(stream) {
        Ok(report) => info!(
            peer = %peer,
            batches = report.batches,
            rows = report.rows,
            "Connection served"
        ),
        Err(e) => warn!(peer = %peer, error = %e, "Connection failed"),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&CONFIG.logging)?;

    let compression = args.compression.unwrap_or(CONFIG.compression);
    let listener = TcpListener::bind(&args.bind)?;
    info!(addr = %listener.local_addr()?, %compression, "Echo worker listening");

    let mut workers = Vec::new();
    for (served, stream) in listener.incoming().enumerate() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                continue;
            }
        };
        stream.set_nodelay(true)?;
        let handle = thread::Builder::new()
            .name(format!("echo-conn-{served}"))
            .spawn(move || serve_connection(stream, compression))?;
        workers.push(handle);

        if args.max_connections > 0 && served + 1 >= args.max_connections {
            break;
        }
    }

    for handle in workers {
        if handle.join().is_err() {
            warn!("Connection thread panicked");
        }
    }
    info!("Echo worker stopped");
    Ok(())
}
