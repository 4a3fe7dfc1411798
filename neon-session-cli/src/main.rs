use clap::{Args, Parser, Subcommand};
use neon_session_cli::{
    protocol_schema, CliError, GameDriver, LogConfig, Result, RunOptions, StartPolicy,
};
use neon_session_core::PeerId;
use neon_session_p2p::{MatchboxTransport, NetSession, SessionConfig, SessionId};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "neon-cli")]
#[command(version, about = "Neon Survivor session CLI - host or join a co-op session headlessly")]
struct Cli {
    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<String>,

    /// More output per occurrence (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a new room as host
    Host {
        #[command(flatten)]
        net: NetArgs,

        #[command(flatten)]
        player: PlayerArgs,

        /// Start once this many guests have joined
        #[arg(long, default_value_t = 1)]
        start_with: usize,

        /// Only start once every peer is ready
        #[arg(long)]
        require_ready: bool,

        /// Never start automatically
        #[arg(long, conflicts_with_all = ["start_with", "require_ready"])]
        no_autostart: bool,
    },

    /// Join an existing room as guest
    Join {
        #[command(flatten)]
        net: NetArgs,

        #[command(flatten)]
        player: PlayerArgs,

        /// Peer id of the host, as printed by `neon-cli host`
        #[arg(long = "host")]
        host_id: String,
    },

    /// Print the wire protocol JSON schema
    Schema {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct NetArgs {
    /// Matchbox signalling server URL
    #[arg(short = 's', long, env = "NEON_SIGNALLING_URL")]
    server: Option<String>,

    /// Room id; every peer of a session uses the same one
    #[arg(short = 'r', long, env = "NEON_ROOM")]
    room: Option<String>,

    /// Snapshot and input rate in Hz
    #[arg(long, env = "NEON_TICK_HZ")]
    tick_hz: Option<u32>,

    /// Lite snapshot rate in Hz (host only)
    #[arg(long)]
    lite_hz: Option<u32>,

    /// TURN server URL (format: turn:host:port)
    #[arg(long, requires_all = ["turn_username", "turn_credential"])]
    turn_server: Option<String>,

    #[arg(long)]
    turn_username: Option<String>,

    #[arg(long)]
    turn_credential: Option<String>,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,
}

#[derive(Args, Debug)]
struct PlayerArgs {
    /// Display name
    #[arg(short = 'n', long, default_value = "Player")]
    name: String,

    /// Class to pick in the lobby
    #[arg(short = 'c', long)]
    class: Option<String>,

    /// Do not mark ready on entering the lobby
    #[arg(long)]
    not_ready: bool,

    /// Simulation frames per second
    #[arg(long, default_value_t = 60)]
    fps: u32,
}

impl NetArgs {
    fn config(&self) -> Result<SessionConfig> {
        let mut config = SessionConfig::default();

        if let Some(server) = &self.server {
            config = config.with_signalling_server(server.clone());
        }
        if let Some(room) = &self.room {
            config = config.with_room(SessionId::parse(room)?);
        }
        if let Some(hz) = self.tick_hz {
            config = config.with_state_tick_hz(hz);
        }
        if self.lite_hz.is_some() {
            config = config.with_lite_tick_hz(self.lite_hz);
        }

        if let Some(turn_url) = &self.turn_server {
            match (&self.turn_username, &self.turn_credential) {
                (Some(username), Some(credential)) => {
                    info!("Using TURN server: {}", turn_url);
                    config =
                        config.with_turn(turn_url.clone(), username.clone(), credential.clone());
                }
                _ => {
                    return Err(CliError::InvalidConfig(
                        "TURN server requires both username and credential".to_string(),
                    ));
                }
            }
        }

        Ok(config)
    }

    fn limit(&self) -> Option<Duration> {
        self.duration.map(Duration::from_secs)
    }
}

impl PlayerArgs {
    fn options(&self, start: StartPolicy) -> RunOptions {
        RunOptions {
            name: self.name.clone(),
            class_id: self.class.clone(),
            ready: !self.not_ready,
            start,
            frame_rate: self.fps,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_verbosity(cli.verbose);
    if cli.log_json {
        log_config = log_config.with_json();
    }
    if let Some(path) = cli.log_file.clone() {
        log_config = log_config.with_file_output(path);
    }
    log_config.init()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Host {
                net,
                player,
                start_with,
                require_ready,
                no_autostart,
            } => {
                let start = if no_autostart {
                    StartPolicy::never()
                } else {
                    StartPolicy {
                        min_guests: Some(start_with),
                        require_ready,
                    }
                };
                host(net.config()?, player.options(start), net.limit()).await
            }
            Commands::Join {
                net,
                player,
                host_id,
            } => {
                let options = player.options(StartPolicy::never());
                join(net.config()?, options, PeerId::new(host_id), net.limit()).await
            }
            Commands::Schema { out } => print_schema(out),
        }
    })
}

async fn host(config: SessionConfig, options: RunOptions, limit: Option<Duration>) -> Result<()> {
    info!("Connecting to signalling server: {}", config.signalling_server);
    let room = config.room;
    let mut driver = driver(config, options);

    let my_id = driver.host().await?;

    info!("");
    info!("📋 Room: {}", room);
    info!("Share this command with guests to join:");
    info!("  neon-cli join --room {} --host {}", room, my_id);
    info!("");
    info!("Press Ctrl+C to exit");

    driver.run(limit).await
}

async fn join(
    config: SessionConfig,
    options: RunOptions,
    host_id: PeerId,
    limit: Option<Duration>,
) -> Result<()> {
    info!("Joining {} in room {}", host_id, config.room);
    let mut driver = driver(config, options);

    driver.join(host_id).await?;
    info!("Press Ctrl+C to exit");

    driver.run(limit).await
}

/// Session over matchbox, torn down on Ctrl+C
fn driver(config: SessionConfig, options: RunOptions) -> GameDriver<MatchboxTransport> {
    let transport = MatchboxTransport::new(&config);
    let session = NetSession::new(transport, config);

    let teardown = session.teardown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            teardown.teardown();
        }
    });

    GameDriver::new(session, options)
}

fn print_schema(out: Option<PathBuf>) -> Result<()> {
    match out {
        Some(path) => neon_session_cli::application::write_protocol_schema(&path),
        None => {
            println!("{}", protocol_schema()?);
            Ok(())
        }
    }
}
