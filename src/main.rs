//! FlintKV server entry point.
//!
//! Parses command-line arguments, sets up logging, and runs either the
//! server or the scripted demo.

use flintkv::client::run_demo;
use flintkv::server::Server;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Run the scripted demo instead of the server
    demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: flintkv::DEFAULT_HOST.to_string(),
            port: flintkv::DEFAULT_PORT,
            demo: false,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--demo" => {
                    config.demo = true;
                    i += 1;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("FlintKV version {}", flintkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
FlintKV - An In-Memory Data-Structure Server

USAGE:
    flintkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: localhost)
    -p, --port <PORT>    Port to listen on (default: 6379)
        --demo           Run the scripted demo instead of the server
    -v, --version        Print version information
        --help           Print this help message

EXAMPLES:
    flintkv                        # Start on localhost:6379
    flintkv --port 6380            # Start on port 6380
    flintkv --host 0.0.0.0         # Listen on all interfaces
    flintkv --demo                 # Walk through every command family

CONNECTING:
    Any line-oriented client works, e.g.:
    $ nc localhost 6379
    PING
    +PONG
    SET name flint
    +OK
    GET name
    +flint
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    if config.demo {
        return run_demo(&config.bind_address()).await;
    }

    println!(
        "FlintKV v{} listening on {} - Ctrl+C to shut down",
        flintkv::VERSION,
        config.bind_address()
    );

    let server = Server::bind(&config.bind_address()).await?;
    let handle = server.shutdown_handle();

    tokio::spawn(async move {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("shutdown signal received, stopping server");
        handle.shutdown();
    });

    server.run().await?;
    info!("server shutdown complete");
    Ok(())
}
