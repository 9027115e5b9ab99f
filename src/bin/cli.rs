use clap::Parser;
use tracing::debug;

use rustdis_client::{Client, ClientConfig, Command, Error, ReplyShape};

const PORT: u16 = 6379;

/// Sends one command and prints the reply.
#[derive(Parser, Debug)]
struct Args {
    /// Write endpoint host
    #[arg(long, env = "RUSTDIS_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Write endpoint port
    #[arg(short, long, env = "RUSTDIS_PORT", default_value_t = PORT)]
    port: u16,

    /// Read endpoints as host:port, may be repeated
    #[arg(long = "read-host", env = "RUSTDIS_READ_HOSTS", value_delimiter = ',')]
    read_hosts: Vec<String>,

    /// Database index
    #[arg(short = 'n', long, env = "RUSTDIS_DB")]
    db: Option<u32>,

    /// Connection ceiling per endpoint
    #[arg(long, env = "RUSTDIS_MAX_CONNECTIONS")]
    max_connections: Option<usize>,

    /// Command and arguments, e.g. `get mykey`
    #[arg(required = true, num_args = 1..)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let args = Args::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(db) = args.db {
        config.db = db;
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }

    let client = Client::new(config);
    client.add_write_host(&args.host, args.port);
    for read_host in &args.read_hosts {
        let (host, port) = parse_host(read_host)?;
        client.add_read_host(host, port);
    }

    let command = build_command(&args.command)?;
    let reply = client.execute(&command, ReplyShape::text()).await;
    println!("{}", reply);

    if reply.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_host(value: &str) -> Result<(&str, u16), Error> {
    match value.rsplit_once(':') {
        Some((host, port)) => Ok((host, port.parse()?)),
        None => Ok((value, PORT)),
    }
}

fn build_command(words: &[String]) -> Result<Command, Error> {
    let (name, args) = words.split_first().ok_or("missing command")?;
    let command = match name.parse() {
        Ok(verb) => Command::new(verb),
        Err(_) => Command::custom(name.as_str(), false),
    };
    Ok(command.args(args.iter()))
}
