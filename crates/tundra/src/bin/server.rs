//! # Tundra Server
//!
//! ```bash
//! # Run with tundra.toml from the working directory (defaults if missing)
//! tundra serve
//!
//! # Type `stop` on standard input to shut down
//!
//! # Write a generated level file without starting a server
//! tundra mapgen --generator realistic --template island --size 256x256x96 --out island.lvl
//! ```
//!
//! Log verbosity comes from `RUST_LOG`, falling back to `log_level` in the
//! configuration file.

use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tundra::config::{ServerConfig, WorldSection, DEFAULT_CONFIG_FILE};
use tundra::error::TundraResult;
use tundra::setup::{
    build_main_map, generate_map, parse_size, save_map, start_console, start_heartbeat, world_params,
};
use tundra_networking::session::Collaborators;
use tundra_networking::{Server, ServerContext, World};

#[derive(Parser, Debug)]
#[command(name = "tundra", version, about = "Classic protocol block world server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server.
    Serve {
        /// Configuration file.
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// Generate a level file.
    Mapgen {
        /// Generator name.
        #[arg(long, short, default_value = "flat")]
        generator: String,
        /// Realistic template.
        #[arg(long)]
        template: Option<String>,
        /// Realistic theme.
        #[arg(long)]
        theme: Option<String>,
        /// Map size as WIDTHxLENGTHxHEIGHT.
        #[arg(long, default_value = "128x128x64")]
        size: String,
        /// Random seed.
        #[arg(long)]
        seed: Option<i64>,
        /// Output file.
        #[arg(long, short)]
        out: PathBuf,
    },
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

fn serve(config: ServerConfig) -> TundraResult<()> {
    let map = build_main_map(&config.world)?;
    let world = World::new(&config.world.name, map);
    let context = Arc::new(ServerContext::new(config.server_settings(), Collaborators::default(), world));

    let server = Server::bind(config.socket_addr(), Arc::clone(&context))?;
    info!(address = %server.local_addr()?, name = %config.server_name, "server listening");

    let stop = Arc::new(AtomicBool::new(false));
    let heartbeat = start_heartbeat(&config, &context, Arc::clone(&stop))?;
    // Blocked on stdin until `stop`; never joined
    let _console = start_console(BufReader::new(io::stdin()), &context)?;

    let result = server.run();
    stop.store(true, Ordering::Relaxed);
    if let Some(handle) = heartbeat {
        let _ = handle.join();
    }
    result?;
    info!("server stopped");
    Ok(())
}

fn mapgen(section: &WorldSection, out: &std::path::Path) -> TundraResult<()> {
    let seed = section.seed.unwrap_or_else(rand::random);
    info!(generator = %section.generator, seed, "generating level file");
    let map = generate_map(world_params(section, seed)?)?;
    save_map(&map, out)?;
    info!(path = %out.display(), "level file written");
    Ok(())
}

fn run(cli: Cli) -> TundraResult<()> {
    match cli.command {
        Command::Serve { config } => match ServerConfig::load(&config) {
            Ok(config) => {
                init_logging(&config.log_level);
                serve(config)
            }
            Err(err) => {
                init_logging("info");
                Err(err.into())
            }
        },
        Command::Mapgen { generator, template, theme, size, seed, out } => {
            init_logging("info");
            let dims = parse_size(&size)?;
            let section = WorldSection {
                width: dims.width,
                length: dims.length,
                height: dims.height,
                generator,
                template,
                theme,
                seed,
                ..WorldSection::default()
            };
            mapgen(&section, &out)
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "fatal");
            eprintln!("tundra: {err}");
            ExitCode::FAILURE
        }
    }
}
