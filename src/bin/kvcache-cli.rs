//! kvcache CLI
//!
//! Interactive shell over any registered cache backend.

use bytes::Bytes;
use clap::Parser;
use kvcache::{BackendConfig, BackendRegistry, CacheBackend};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// kvcache CLI - Interactive Cache Shell
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Backend to construct through the registry
    #[arg(short, long, default_value = "memory")]
    backend: String,

    /// Backend option as key=value (repeatable)
    #[arg(short, long = "option", value_name = "KEY=VALUE")]
    options: Vec<String>,

    /// TTL in milliseconds for SET without an explicit TTL
    #[arg(long, default_value_t = 60_000)]
    default_ttl_ms: u64,
}

/// Parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Ping,
    Get { key: String },
    Set { key: String, value: Bytes, ttl: Option<Duration> },
    MGet { keys: Vec<String> },
    MSet { ttl: Duration, entries: Vec<(String, Bytes)> },
    Del { key: String },
    MDel { keys: Vec<String> },
    Expire { key: String, ttl: Duration },
    Ttl { key: String },
    Exists { key: String },
    Backends,
}

/// Shell output
#[derive(Debug, Clone, PartialEq, Eq)]
enum Response {
    Ok,
    Pong,
    Nil,
    Value(Bytes),
    Integer(u64),
    Array(Vec<Option<Bytes>>),
    Names(Vec<String>),
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Pong => write!(f, "PONG"),
            Response::Nil => write!(f, "(nil)"),
            Response::Value(data) => write!(f, "\"{}\"", String::from_utf8_lossy(data)),
            Response::Integer(n) => write!(f, "(integer) {}", n),
            Response::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Some(data) => write!(f, "\"{}\"", String::from_utf8_lossy(data))?,
                        None => write!(f, "(nil)")?,
                    }
                }
                write!(f, "]")
            }
            Response::Names(names) => write!(f, "{}", names.join(", ")),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("kvcache=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = BackendConfig::new(&args.backend);
    for pair in &args.options {
        config = config.with_option_pair(pair)?;
    }

    let registry = BackendRegistry::with_builtin_backends();
    let cache = registry.open(&config).await?;
    let default_ttl = Duration::from_millis(args.default_ttl_ms);

    info!(backend = %args.backend, "Cache backend ready");
    println!("Type 'help' for available commands, 'quit' to exit.\n");

    loop {
        print!("kvcache> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("help") {
            print_help();
            continue;
        }

        match parse_command(input) {
            Ok(cmd) => match execute(&cache, &registry, cmd, default_ttl).await {
                Ok(response) => println!("{}", response),
                Err(e) => eprintln!("(error) {}", e),
            },
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    cache.close().await?;
    Ok(())
}

async fn execute(
    cache: &Arc<dyn CacheBackend>,
    registry: &BackendRegistry,
    cmd: Command,
    default_ttl: Duration,
) -> kvcache::Result<Response> {
    let response = match cmd {
        Command::Ping => {
            cache.check_health().await?;
            Response::Pong
        }

        Command::Get { key } => match cache.get(&key).await? {
            Some(value) => Response::Value(value),
            None => Response::Nil,
        },

        Command::Set { key, value, ttl } => {
            cache.set(&key, value, ttl.unwrap_or(default_ttl)).await?;
            Response::Ok
        }

        Command::MGet { keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            Response::Array(cache.get_many(&keys).await)
        }

        Command::MSet { ttl, entries } => {
            cache.set_many(entries, ttl).await?;
            Response::Ok
        }

        Command::Del { key } => Response::Integer(cache.delete(&key).await as u64),

        Command::MDel { keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            Response::Integer(cache.delete_many(&keys).await as u64)
        }

        Command::Expire { key, ttl } => Response::Integer(cache.expire(&key, ttl).await as u64),

        Command::Ttl { key } => {
            let ttl = cache.ttl(&key).await;
            Response::Integer(ttl.as_millis().min(u64::MAX as u128) as u64)
        }

        Command::Exists { key } => Response::Integer(cache.exists(&key).await as u64),

        Command::Backends => Response::Names(registry.names()),
    };
    Ok(response)
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn parse_ttl_ms(raw: &str) -> anyhow::Result<Duration> {
    let ms = raw
        .parse::<u64>()
        .map_err(|e| anyhow::anyhow!("invalid TTL '{}': {}", raw, e))?;
    Ok(Duration::from_millis(ms))
}

fn parse_command(input: &str) -> anyhow::Result<Command> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    if parts.is_empty() {
        anyhow::bail!("Empty command");
    }

    let cmd = parts[0].to_uppercase();
    let args = &parts[1..];

    match cmd.as_str() {
        "PING" => Ok(Command::Ping),

        "BACKENDS" => Ok(Command::Backends),

        "GET" => match args {
            [key] => Ok(Command::Get { key: key.to_string() }),
            _ => anyhow::bail!("GET requires a key: GET <key>"),
        },

        "SET" => match args {
            [key, value] => Ok(Command::Set {
                key: key.to_string(),
                value: Bytes::copy_from_slice(value.as_bytes()),
                ttl: None,
            }),
            [key, value, ttl] => Ok(Command::Set {
                key: key.to_string(),
                value: Bytes::copy_from_slice(value.as_bytes()),
                ttl: Some(parse_ttl_ms(ttl)?),
            }),
            _ => anyhow::bail!("SET requires key and value: SET <key> <value> [ttl_ms]"),
        },

        "MGET" => {
            if args.is_empty() {
                anyhow::bail!("MGET requires at least one key: MGET <key> [key ...]");
            }
            Ok(Command::MGet { keys: owned(args) })
        }

        "MSET" => {
            if args.len() < 3 || args.len() % 2 == 0 {
                anyhow::bail!("MSET requires a TTL and pairs: MSET <ttl_ms> <key> <value> [key value ...]");
            }
            let ttl = parse_ttl_ms(args[0])?;
            let entries = args[1..]
                .chunks(2)
                .map(|pair| (pair[0].to_string(), Bytes::copy_from_slice(pair[1].as_bytes())))
                .collect();
            Ok(Command::MSet { ttl, entries })
        }

        "DEL" => match args {
            [key] => Ok(Command::Del { key: key.to_string() }),
            _ => anyhow::bail!("DEL requires a key: DEL <key>"),
        },

        "MDEL" => {
            if args.is_empty() {
                anyhow::bail!("MDEL requires at least one key: MDEL <key> [key ...]");
            }
            Ok(Command::MDel { keys: owned(args) })
        }

        "EXPIRE" => match args {
            [key, ttl] => Ok(Command::Expire {
                key: key.to_string(),
                ttl: parse_ttl_ms(ttl)?,
            }),
            _ => anyhow::bail!("EXPIRE requires key and TTL: EXPIRE <key> <ttl_ms>"),
        },

        "TTL" => match args {
            [key] => Ok(Command::Ttl { key: key.to_string() }),
            _ => anyhow::bail!("TTL requires a key: TTL <key>"),
        },

        "EXISTS" => match args {
            [key] => Ok(Command::Exists { key: key.to_string() }),
            _ => anyhow::bail!("EXISTS requires a key: EXISTS <key>"),
        },

        _ => anyhow::bail!("Unknown command: {}. Type 'help' for available commands.", cmd),
    }
}

fn print_help() {
    println!(
        r#"
Available commands:

  PING                          - Check backend health
  GET <key>                     - Get value for key
  SET <key> <value> [ttl_ms]    - Set key-value pair, TTL in milliseconds
  MGET <key> [key ...]          - Get several keys, in order
  MSET <ttl_ms> <key> <value> [key value ...]
                                - Set several pairs with one TTL
  DEL <key>                     - Delete a key
  MDEL <key> [key ...]          - Delete several keys
  EXPIRE <key> <ttl_ms>         - Reset the TTL of a live key
  TTL <key>                     - Remaining TTL in milliseconds
  EXISTS <key>                  - Check if key exists
  BACKENDS                      - List registered backends

  help                          - Show this help
  quit / exit                   - Exit the CLI

Examples:
  SET mykey myvalue
  SET tempkey value 5000   (expires in 5 seconds)
  MGET mykey tempkey
  EXPIRE mykey 60000
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        assert_eq!(
            parse_command("set k v").unwrap(),
            Command::Set {
                key: "k".to_string(),
                value: Bytes::from_static(b"v"),
                ttl: None
            }
        );
        assert_eq!(
            parse_command("SET k v 250").unwrap(),
            Command::Set {
                key: "k".to_string(),
                value: Bytes::from_static(b"v"),
                ttl: Some(Duration::from_millis(250))
            }
        );
        assert!(parse_command("SET k").is_err());
        assert!(parse_command("SET k v soon").is_err());
    }

    #[test]
    fn test_parse_batches() {
        assert_eq!(
            parse_command("MSET 100 a 1 b 2").unwrap(),
            Command::MSet {
                ttl: Duration::from_millis(100),
                entries: vec![
                    ("a".to_string(), Bytes::from_static(b"1")),
                    ("b".to_string(), Bytes::from_static(b"2")),
                ]
            }
        );
        assert!(parse_command("MSET 100 a").is_err());
        assert!(parse_command("MSET 100 a 1 b").is_err());
        assert_eq!(
            parse_command("mdel a b").unwrap(),
            Command::MDel {
                keys: vec!["a".to_string(), "b".to_string()]
            }
        );
        assert!(parse_command("MGET").is_err());
    }

    #[test]
    fn test_parse_unknown() {
        assert!(parse_command("FLUSHALL").is_err());
        assert!(parse_command("   ").is_err());
    }

    #[test]
    fn test_response_display() {
        assert_eq!(Response::Nil.to_string(), "(nil)");
        assert_eq!(Response::Integer(1).to_string(), "(integer) 1");
        assert_eq!(
            Response::Array(vec![Some(Bytes::from_static(b"1")), None]).to_string(),
            "[\"1\", (nil)]"
        );
    }

    #[tokio::test]
    async fn test_execute_round() {
        let registry = BackendRegistry::with_builtin_backends();
        let cache = registry.open(&BackendConfig::new("memory")).await.unwrap();
        let ttl = Duration::from_secs(60);

        let run = |line: &str| parse_command(line).unwrap();
        assert_eq!(
            execute(&cache, &registry, run("SET a 1"), ttl).await.unwrap(),
            Response::Ok
        );
        assert_eq!(
            execute(&cache, &registry, run("GET a"), ttl).await.unwrap(),
            Response::Value(Bytes::from_static(b"1"))
        );
        assert_eq!(
            execute(&cache, &registry, run("DEL a"), ttl).await.unwrap(),
            Response::Integer(1)
        );
        assert_eq!(
            execute(&cache, &registry, run("TTL a"), ttl).await.unwrap(),
            Response::Integer(0)
        );
        assert_eq!(
            execute(&cache, &registry, run("BACKENDS"), ttl).await.unwrap(),
            Response::Names(vec!["memory".to_string()])
        );
    }
}
