//! bridgectl CLI
//!
//! Command-line interface and interactive shell for the bridge command server.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand, ValueEnum};
use bridgectl::config::{ACCESS_POINT_IP, DEFAULT_PORT};
use bridgectl::control::{self, Feature};
use bridgectl::network::address;
use bridgectl::{BridgeError, Client, Config};
use tracing_subscriber::{fmt, EnvFilter};

/// bridgectl
#[derive(Parser, Debug)]
#[command(name = "bridgectl")]
#[command(about = "Control an ESP8266 XVC-Serial bridge")]
#[command(version)]
struct Args {
    /// Bridge IP address (check the serial boot log)
    #[arg(short, long)]
    ip: Option<String>,

    /// Bridge command port
    #[arg(short, long, default_value_t = u32::from(DEFAULT_PORT))]
    port: u32,

    /// Response timeout in milliseconds (0 waits indefinitely)
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    /// Defaults to the interactive shell
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Action(Action),

    /// Interactive shell
    Shell,
}

/// Operations on a connected bridge
#[derive(Subcommand, Debug)]
enum Action {
    /// Read a feature
    Get {
        feature: FeatureArg,
    },

    /// Set a feature
    Set {
        feature: FeatureArg,

        /// 0 or 1
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        state: u8,
    },

    /// Flip a feature
    Toggle {
        feature: FeatureArg,
    },

    /// Pulse the board reset line
    ResetBoard,

    /// Send the test command
    Ping,

    /// Forget Wi-Fi settings (also resets the command server)
    ReconfigWifi {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Reset the command server
    ResetServer {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FeatureArg {
    Boot,
    Xvc,
    Serial,
    Logger,
}

impl From<FeatureArg> for Feature {
    fn from(arg: FeatureArg) -> Self {
        match arg {
            FeatureArg::Boot => Feature::BootMode,
            FeatureArg::Xvc => Feature::Xvc,
            FeatureArg::Serial => Feature::Serial,
            FeatureArg::Logger => Feature::Logger,
        }
    }
}

/// One line typed into the shell
#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "")]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Action(Action),

    /// Connect to a new address
    Connect {
        ip: String,
        port: Option<String>,
    },

    /// Connect again to the last known address
    Reconnect,

    /// Show the target and whether the connection is alive
    Status,

    /// Leave the shell
    #[command(alias = "exit", alias = "q")]
    Quit,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args = Args::parse();
    let config = Config::builder().read_timeout_ms(args.timeout_ms).build();
    let mut client = Client::new(config);

    if let Some(ip) = &args.ip {
        if let Err(e) = client.connect(ip, args.port) {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    match args.command {
        Some(Commands::Action(action)) => {
            if args.ip.is_none() {
                eprintln!("--ip is required to run a command");
                std::process::exit(2);
            }
            match run_action(&mut client, action, &mut |_| false) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("{}", report(&e));
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Shell) | None => shell(&mut client),
    }
}

/// Execute one action and return the operator message
fn run_action(
    client: &mut Client,
    action: Action,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> Result<String, BridgeError> {
    let text = match action {
        Action::Get { feature } => {
            let feature = Feature::from(feature);
            feature.describe(control::query(client, feature)?)
        }
        Action::Set { feature, state } => {
            let feature = Feature::from(feature);
            feature.describe(control::set(client, feature, state == 1)?)
        }
        Action::Toggle { feature } => {
            let feature = Feature::from(feature);
            if feature == Feature::Logger
                && !confirm("Logging injects text into the serial line and needs the serial server up. Continue?")
            {
                return Ok("Cancelled.".to_string());
            }
            feature.describe_change(control::toggle(client, feature)?.after)
        }
        Action::ResetBoard => {
            control::reset_board(client)?;
            "Board resetting...".to_string()
        }
        Action::Ping => format!("Test reply: {:#x}.", control::ping(client)?),
        Action::ReconfigWifi { yes } => {
            if !yes && !confirm("This will also reset the command server, continue?") {
                return Ok("Cancelled (pass --yes to skip confirmation).".to_string());
            }
            control::reconfig_wifi(client)?;
            format!("Server reset, connect to AP -> {}.", ACCESS_POINT_IP)
        }
        Action::ResetServer { yes } => {
            if !yes && !confirm("This will reset the command server, continue?") {
                return Ok("Cancelled (pass --yes to skip confirmation).".to_string());
            }
            control::reset_server(client)?;
            "Server reset, please reconnect.".to_string()
        }
    };
    Ok(text)
}

/// Render an error the way the shell reports it
fn report(error: &BridgeError) -> String {
    if error.is_timeout() {
        format!("Exception: {}.", error)
    } else {
        format!("Exception: {}. Try to reconnect to last known IP:Port.", error)
    }
}

fn describe_target(client: &Client) -> String {
    match (client.ip(), client.port()) {
        (Some(ip), Some(port)) => format!("IP: {} Port: {}.", ip, port),
        _ => "IP: None Port: None.".to_string(),
    }
}

fn shell(client: &mut Client) {
    println!("ESP8266 XVC-Serial bridge server control");
    println!("{}", describe_target(client));
    println!("Check serial bootlog to confirm IP! Type 'help' for commands.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("SELECT> ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("{}", e);
                return;
            }
            None => return,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let command = match ShellLine::try_parse_from(words.iter().copied()) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let mut confirm = |question: &str| -> bool {
            print!("{} [y/N] ", question);
            let _ = io::stdout().flush();
            matches!(lines.next(), Some(Ok(answer)) if answer.trim().eq_ignore_ascii_case("y"))
        };

        let message = match command {
            ShellCommand::Quit => return,
            ShellCommand::Status => {
                let state = if client.is_connected() { "connected" } else { "not connected" };
                format!("{} ({})", describe_target(client), state)
            }
            ShellCommand::Reconnect => match client.reconnect() {
                Ok(()) => format!("Connected to {}", describe_target(client)),
                Err(e) => report(&e),
            },
            ShellCommand::Connect { ip, port } => {
                let port = match port.as_deref().map(address::parse_port).transpose() {
                    Ok(port) => u32::from(port.unwrap_or(client.config().default_port)),
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                match client.connect(&ip, port) {
                    Ok(()) => format!("Connected to {}", describe_target(client)),
                    Err(e) => report(&e),
                }
            }
            ShellCommand::Action(action) => {
                println!("Sending request...");
                run_action(client, action, &mut confirm).unwrap_or_else(|e| report(&e))
            }
        };
        println!("{}", message);
    }
}
