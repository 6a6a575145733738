//! HLX Client - interactive REPL and one-shot command client for the HLX
//! multi-zone audio matrix control system.
//!
//! Connects to a server's TCP control socket and submits raw wire-protocol
//! bodies (e.g. `VU-40,1`, `QZ3`) read one per line from stdin, printing
//! each response and any unsolicited notification as it arrives. With a
//! `--command` argument, sends that single body and exits instead of
//! entering the REPL.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hlx_core::app::tcp::TcpConnection;
use hlx_core::connection::Connection;
use hlx_core::dispatch::ExchangeManager;
use hlx_core::events::{BroadcastStateChangeBridge, LoggingStateChangeSink};
use hlx_core::protocol::catalog;
use hlx_core::protocol::framing::FrameAccumulator;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpStream;

/// HLX Client - interactive control session for an HLX server.
#[derive(Parser, Debug)]
#[command(name = "hlx-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to, e.g. `127.0.0.1:23`.
    #[arg(value_name = "ADDRESS")]
    address: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "HLX_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Request timeout in milliseconds.
    #[arg(short, long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Run a single command and exit instead of entering the REPL.
    #[arg(short, long, value_name = "BODY")]
    command: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    let stream = TcpStream::connect(&args.address)
        .await
        .with_context(|| format!("Failed to connect to {}", args.address))?;
    stream.set_nodelay(true).ok();
    let (mut reader, writer) = stream.into_split();
    let connection: Arc<dyn Connection> = Arc::new(TcpConnection::new(writer));
    let exchange = Arc::new(ExchangeManager::new(connection.clone()));

    let bridge = Arc::new(BroadcastStateChangeBridge::new(64));
    bridge.set_external_sink(Arc::new(LoggingStateChangeSink));

    let reader_exchange = exchange.clone();
    let reader_task = tokio::spawn(async move {
        let mut accumulator = FrameAccumulator::new();
        let mut buf = vec![0u8; 4096];
        loop {
            let read = match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            for frame in accumulator.feed(&buf[..read]) {
                match frame {
                    Ok(body) => {
                        let body = String::from_utf8_lossy(&body).into_owned();
                        if let Some(notification) = reader_exchange.on_frame(&body).await {
                            log::info!("notification: {:?} {:?}", notification.verb, notification.captures);
                        }
                    }
                    Err(err) => log::debug!("framing error: {err}"),
                }
            }
        }
        reader_exchange.disconnect();
    });

    let timeout = Duration::from_millis(args.timeout_ms);

    if let Some(command) = args.command {
        run_one(&exchange, &command, timeout).await?;
        let _ = connection.close().await;
        reader_task.abort();
        return Ok(());
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    println!("hlx-client connected to {}. Type a command body (e.g. QZ1) or 'quit'.", args.address);
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }
        if let Err(err) = run_one(&exchange, line, timeout).await {
            println!("error: {err}");
        }
    }

    let _ = connection.close().await;
    reader_task.abort();
    Ok(())
}

/// Submits one raw body, recognizing its own verb to know which response
/// pattern to wait for (requests and their responses share a verb).
async fn run_one(exchange: &Arc<ExchangeManager>, body: &str, timeout: Duration) -> Result<()> {
    let Some(matched) = catalog::recognize(body) else {
        bail!("'{body}' is not a recognized command");
    };
    let captures = exchange.submit(body.to_string(), matched.verb, timeout).await?;
    println!("{body} -> {captures:?}");
    Ok(())
}
