//! flashscope - command-line companion for the flash scope.
//!
//! Encodes and verifies signed flash cookies, and replays a short scripted
//! sequence of requests so the lifecycle can be watched in the logs.

use anyhow::{bail, Context};
use flashscope::codec::Signer;
use flashscope::config::{CodecKind, FlashConfig};
use flashscope::context::{Request, Response, Session};
use flashscope::storage::SessionStorage;
use flashscope::{FlashMiddleware, FlashScope};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// What the user asked for
enum Command {
    Encode(Vec<String>),
    Decode(String),
    Simulate(usize),
}

/// Command-line options
struct Args {
    codec: CodecKind,
    secret: Option<String>,
    command: Command,
}

impl Args {
    /// Parse options from command-line arguments, falling back to the environment
    fn from_args(config: &FlashConfig) -> anyhow::Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();

        let mut codec = config.codec;
        let mut secret = config.secret_key.clone();
        let mut positional = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--codec" | "-c" => {
                    let value = args.get(i + 1).context("--codec requires a value")?;
                    codec = value.parse()?;
                    i += 2;
                }
                "--secret" | "-s" => {
                    let value = args.get(i + 1).context("--secret requires a value")?;
                    secret = Some(value.clone());
                    i += 2;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("flashscope version {}", flashscope::VERSION);
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    print_help();
                    bail!("unknown argument: {}", other);
                }
                other => {
                    positional.push(other.to_string());
                    i += 1;
                }
            }
        }

        let mut positional = positional.into_iter();
        let command = match positional.next().as_deref() {
            Some("encode") => Command::Encode(positional.collect()),
            Some("decode") => {
                Command::Decode(positional.next().context("decode requires a payload")?)
            }
            Some("simulate") => {
                let steps = match positional.next() {
                    Some(n) => n.parse().context("simulate expects a number of requests")?,
                    None => 4,
                };
                Command::Simulate(steps)
            }
            Some(other) => bail!("unknown command: {}", other),
            None => {
                print_help();
                std::process::exit(1);
            }
        };

        Ok(Self {
            codec,
            secret,
            command,
        })
    }

    fn signer(&self) -> anyhow::Result<Signer> {
        let secret = self
            .secret
            .as_deref()
            .context("a secret key is required (--secret or FLASH_SECRET_KEY)")?;
        Ok(Signer::new(self.codec.build(), secret)?)
    }
}

fn print_help() {
    println!(
        r#"
flashscope - Short-lived per-user messages

USAGE:
    flashscope [OPTIONS] <COMMAND>

COMMANDS:
    encode <key=value>...    Print a signed flash cookie holding the given values
    decode <payload>         Verify a signed flash cookie and print its snapshot
    simulate [n]             Replay n requests (default: 4) and show the flash in each

OPTIONS:
    -c, --codec <CODEC>      json, json_zstd or binary (default: FLASH_CODEC or json)
    -s, --secret <SECRET>    Signing key (default: FLASH_SECRET_KEY)
    -v, --version            Print version information
    -h, --help               Print this help message

EXAMPLES:
    flashscope -s key encode message="Saved!" count=3
    flashscope -s key decode eyJlbnRyaWVzIjp7...
    RUST_LOG=flashscope=debug flashscope simulate 5
"#
    );
}

fn main() -> anyhow::Result<()> {
    // Set up logging, honouring RUST_LOG
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = FlashConfig::from_env()?;
    let args = Args::from_args(&config)?;

    match &args.command {
        Command::Encode(pairs) => encode(&args, pairs),
        Command::Decode(payload) => decode(&args, payload),
        Command::Simulate(steps) => simulate(*steps),
    }
}

/// Parses `key=value` pairs; values that are valid JSON keep their type.
fn encode(args: &Args, pairs: &[String]) -> anyhow::Result<()> {
    let mut flash = FlashScope::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("expected key=value, got '{}'", pair))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
        flash.set(key, value);
    }

    let signer = args.signer()?;
    let payload = signer.encode_and_sign(&flash)?;
    debug!(codec = signer.codec().name(), entries = flash.len(), bytes = payload.len(), "Encoded flash");
    println!("{}", payload);
    Ok(())
}

fn decode(args: &Args, payload: &str) -> anyhow::Result<()> {
    let signer = args.signer()?;
    match signer.decode_signed(payload)? {
        Some(flash) => println!("{}", serde_json::to_string_pretty(&flash.to_value())?),
        None => bail!("payload does not hold a flash"),
    }
    Ok(())
}

/// Replays a scripted browsing session against the session backend.
///
/// Request 1 sets a message, request 2 keeps it, request 3 shows an
/// immediate alert, and from then on nothing new is added.
fn simulate(steps: usize) -> anyhow::Result<()> {
    let middleware = FlashMiddleware::new(Arc::new(SessionStorage::new()));
    let mut session = Session::new();

    for step in 1..=steps {
        let mut request = Request::new(format!("/step/{}", step)).with_session(session);

        middleware.process(&mut request, |request| {
            if let Ok(Some(flash)) = request.flash_mut() {
                match step {
                    1 => flash.set("message", "Profile saved"),
                    2 => flash.keep("message"),
                    3 => flash.now().set("alert", "Shown only now"),
                    _ => {}
                }
            }
            Response::ok()
        })?;

        let visible: Vec<String> = request
            .flash()?
            .map(|flash| flash.keys().map(str::to_string).collect())
            .unwrap_or_default();
        info!(step = step, path = %request.path(), visible = ?visible, "Request handled");
        println!("request {:>3}: {:?}", step, visible);

        session = request.session().cloned().unwrap_or_default();
    }

    Ok(())
}
