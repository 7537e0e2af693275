use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use exaroton::config::{ENV_API_TOKEN, ENV_BASE_URL};
use exaroton::ws::{Event, StreamEvent};
use exaroton::{Client, ClientConfig, CommandRoute};
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Exaroton(#[from] exaroton::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unknown stream `{0}`; expected console, tick, stats, heap or management")]
    UnknownStream(String),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("failed to listen for ctrl-c: {0}")]
    Signal(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "exaroton-cli", about = "exaroton API and server websocket CLI")]
struct Cli {
    #[arg(long, env = ENV_BASE_URL)]
    base_url: Option<String>,

    #[arg(long, env = ENV_API_TOKEN, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every accessible server.
    Servers,
    /// Print one server snapshot.
    Status { server: String },
    Start { server: String },
    Stop { server: String },
    Restart { server: String },
    /// Run a console command, over the socket if possible.
    Command {
        server: String,
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Print websocket events as JSON lines until ctrl-c.
    Watch(WatchArgs),
    /// Call one management method and print its response.
    Rpc(RpcArgs),
}

#[derive(Args, Debug)]
struct WatchArgs {
    server: String,

    #[arg(long = "stream", default_value = "console")]
    streams: Vec<String>,

    #[arg(long, help = "Console lines to replay on start")]
    tail: Option<u32>,
}

#[derive(Args, Debug)]
struct RpcArgs {
    server: String,

    method: String,

    #[arg(long, default_value = "{}")]
    params: String,

    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = ClientConfig::from_vars(|key| config_lookup(&cli, key))?;
    let client = Client::new(config)?;

    match cli.command {
        Command::Servers => {
            let servers = client.get_servers().await?;
            print_json(&serde_json::to_value(servers)?)
        }
        Command::Status { server } => {
            let info = client.server(&server).get().await?;
            print_json(&serde_json::to_value(info)?)
        }
        Command::Start { server } => {
            client.server(&server).start().await?;
            println!("ok");
            Ok(())
        }
        Command::Stop { server } => {
            client.server(&server).stop().await?;
            println!("ok");
            Ok(())
        }
        Command::Restart { server } => {
            client.server(&server).restart().await?;
            println!("ok");
            Ok(())
        }
        Command::Command { server, command } => {
            let route = client.server(&server).execute_command(&command.join(" ")).await?;
            match route {
                CommandRoute::Websocket => println!("sent over websocket"),
                CommandRoute::Rest => println!("sent over REST"),
            }
            Ok(())
        }
        Command::Watch(args) => run_watch(&client, args).await,
        Command::Rpc(args) => run_rpc(&client, args).await,
    }
}

fn config_lookup(cli: &Cli, key: &str) -> Option<String> {
    match key {
        ENV_API_TOKEN => cli.token.clone(),
        ENV_BASE_URL => cli.base_url.clone(),
        _ => std::env::var(key).ok(),
    }
}

async fn run_watch(client: &Client, args: WatchArgs) -> Result<(), CliError> {
    let server = client.server(&args.server);
    let websocket = server.websocket()?;
    let mut events = websocket.subscribe();
    websocket.connect();

    for name in &args.streams {
        let Some(stream) = websocket.stream(name) else {
            websocket.disconnect();
            return Err(CliError::UnknownStream(name.clone()));
        };
        let data = args.tail.filter(|_| name == "console").map(|tail| json!({ "tail": tail }));
        stream.start(data).await;
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(line) = event_line(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "watch: dropped events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    websocket.disconnect();
    Ok(())
}

async fn run_rpc(client: &Client, args: RpcArgs) -> Result<(), CliError> {
    let params = serde_json::from_str::<Value>(&args.params)?;
    let server = client.server(&args.server);
    let websocket = server.websocket()?;
    websocket.connect();

    let management = websocket.management();
    management.start(None).await;

    let call = management.request(&args.method, params);
    let result = tokio::time::timeout(Duration::from_secs(args.timeout_secs), call).await;
    websocket.disconnect();

    let response = result.map_err(|_| CliError::Timeout("management response"))??;
    print_json(&response)
}

/// One JSON line per event worth printing. Typed payload events are skipped
/// because their envelope carries the same data.
fn event_line(event: &Event) -> Option<Value> {
    let line = match event {
        Event::Open => json!({ "event": "open" }),
        Event::Close => json!({ "event": "close" }),
        Event::Error(message) => json!({ "event": "error", "message": message }),
        Event::Ready => json!({ "event": "ready" }),
        Event::Connected => json!({ "event": "connected" }),
        Event::Disconnected => json!({ "event": "disconnected" }),
        Event::Status(server) => json!({ "event": "status", "server": server }),
        Event::Stream { stream, event: StreamEvent::Started } => json!({ "event": "started", "stream": stream }),
        Event::Stream { stream, event: StreamEvent::Stopped } => json!({ "event": "stopped", "stream": stream }),
        Event::Stream { .. } => return None,
        Event::Envelope(envelope) => {
            json!({ "event": "event", "stream": envelope.stream, "type": envelope.kind, "data": envelope.data })
        }
    };
    Some(line)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
