//! Standalone room server
//!
//! Usage: cargo run -p kabo_web --bin kabo-server -- --port 8080 --tcp-port 9000

use kabo_web::{AppSettings, ServerConfig, WebServer};

struct Args {
    host: String,
    port: u16,
    tcp_port: Option<u16>,
    json_logs: bool,
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut parsed = Args {
        host: "127.0.0.1".to_string(),
        port: 8080,
        tcp_port: None,
        json_logs: false,
    };

    let mut i = 0;
    while i < args.len() {
        let value = |i: usize| {
            args.get(i + 1)
                .cloned()
                .ok_or_else(|| format!("{} requires a value", args[i]))
        };
        let port = |raw: String| {
            raw.parse::<u16>()
                .map_err(|_| format!("invalid port number: {raw}"))
        };
        match args[i].as_str() {
            "--host" | "-h" => {
                parsed.host = value(i)?;
                i += 2;
            }
            "--port" | "-p" => {
                parsed.port = port(value(i)?)?;
                i += 2;
            }
            "--tcp-port" | "-t" => {
                parsed.tcp_port = Some(port(value(i)?)?);
                i += 2;
            }
            "--json-logs" => {
                parsed.json_logs = true;
                i += 1;
            }
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => return Err(format!("Unknown argument: {other}")),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            print_help();
            std::process::exit(2);
        }
    };
    kabo_web::init_logging(args.json_logs)?;

    let settings = AppSettings::from_env()?;
    tracing::info!(
        decision_timeout_secs = settings.decision_timeout_secs,
        max_players = settings.max_players,
        ai_kind = %settings.ai_kind,
        policy = ?settings.unresponsive_policy,
        "settings loaded"
    );

    let mut config = ServerConfig::new(args.host, args.port);
    if let Some(port) = args.tcp_port {
        config = config.with_tcp_port(port);
    }

    let handle = WebServer::new(config, settings)?.start().await?;
    println!("Kabo server running at http://{}", handle.address());
    if let Some(addr) = handle.tcp_address() {
        println!("TCP players connect to {addr}");
    }
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    handle.shutdown().await?;
    Ok(())
}

fn print_help() {
    println!("Kabo room server");
    println!();
    println!("Usage: kabo-server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --host, -h <HOST>           Host to bind to (default: 127.0.0.1)");
    println!("  --port, -p <PORT>           HTTP port (default: 8080)");
    println!("  --tcp-port, -t <PORT>       Also accept TCP players on this port");
    println!("  --json-logs                 Log one JSON object per line");
    println!("  --help                      Show this help message");
    println!();
    println!("Environment:");
    println!("  KABO_DECISION_TIMEOUT, KABO_MAX_PLAYERS, KABO_AI,");
    println!("  KABO_ROOM_CODE_LENGTH, KABO_UNRESPONSIVE, RUST_LOG");
}
