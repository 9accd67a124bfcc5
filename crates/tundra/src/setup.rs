//! Turning configuration into a running server: the main world and the
//! heartbeat thread.

use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};
use tundra_core::{Dimensions, Map};
use tundra_networking::{HeartbeatClient, ServerContext};
use tundra_procedural::{GenParams, GenerationTask, GeneratorRegistry, RealisticTemplate, ThemePreset};

use crate::config::{ServerConfig, WorldSection};
use crate::error::{TundraError, TundraResult};

/// Parses `WxLxH`.
///
/// # Errors
///
/// Returns [`TundraError::BadSize`] unless there are three positive numbers.
pub fn parse_size(text: &str) -> TundraResult<Dimensions> {
    let bad = || TundraError::BadSize(text.to_owned());
    let parts: Vec<usize> = text
        .split(['x', 'X'].as_slice())
        .map(|part| part.trim().parse::<usize>().map_err(|_| bad()))
        .collect::<TundraResult<_>>()?;
    match parts.as_slice() {
        [width, length, height] => Ok(Dimensions::new(*width, *length, *height).validate()?),
        _ => Err(bad()),
    }
}

/// Generator parameters for a world section.
///
/// A template is only meaningful for the realistic generator and
/// overrides its defaults; a theme then overrides the template's theme.
///
/// # Errors
///
/// Returns unknown generator, template or theme errors.
pub fn world_params(section: &WorldSection, seed: i64) -> TundraResult<GenParams> {
    let registry = GeneratorRegistry::with_builtins();
    let kind = registry.find(&section.generator)?;
    let dims = Dimensions::new(section.width, section.length, section.height);
    let mut params = kind.default_params(dims, seed);

    if let GenParams::Realistic(realistic) = &mut params {
        if let Some(name) = &section.template {
            *realistic = RealisticTemplate::from_str(name)?.params(dims.width, dims.length, dims.height, seed);
        }
        if let Some(name) = &section.theme {
            realistic.theme = ThemePreset::from_str(name)?;
        }
    }
    params.validate()?;
    Ok(params)
}

/// Runs a generator to completion, logging progress.
///
/// # Errors
///
/// Returns generator errors, or [`TundraError::Canceled`].
pub fn generate_map(params: GenParams) -> TundraResult<Map> {
    let mut last = None;
    let task = GenerationTask::new(params).with_callback(move |progress| {
        // Callbacks fire often; log only at each new ten percent
        let decile = progress.percent / 10;
        if last != Some(decile) {
            last = Some(decile);
            info!(percent = progress.percent, status = %progress.status, "generating world");
        }
    });
    task.run()?.into_map().ok_or(TundraError::Canceled)
}

/// Loads the configured level file, or generates the main world.
///
/// # Errors
///
/// Returns read, map or generation errors.
pub fn build_main_map(section: &WorldSection) -> TundraResult<Map> {
    let dims = Dimensions::new(section.width, section.length, section.height);
    if let Some(path) = &section.file {
        info!(path = %path.display(), "loading world");
        let data = fs::read(path)?;
        return Ok(Map::from_compressed(dims, &data)?);
    }

    let seed = section.seed.unwrap_or_else(rand::random);
    debug!(generator = %section.generator, seed, "building main world");
    generate_map(world_params(section, seed)?)
}

/// Writes a map as a gzip level file.
///
/// # Errors
///
/// Returns compression or write errors.
pub fn save_map(map: &Map, path: &Path) -> TundraResult<()> {
    fs::write(path, map.compressed_snapshot()?)?;
    Ok(())
}

/// Starts the heartbeat thread if enabled.
///
/// The thread rewrites its data file from the live context every refresh.
///
/// # Errors
///
/// Returns thread spawn errors.
pub fn start_heartbeat(
    config: &ServerConfig,
    context: &Arc<ServerContext>,
    stop: Arc<AtomicBool>,
) -> TundraResult<Option<JoinHandle<()>>> {
    let section = &config.heartbeat;
    if !section.enabled {
        return Ok(None);
    }

    let snapshot = {
        let context = Arc::clone(context);
        let address = section.public_address.clone();
        let port = config.port;
        let public = section.public;
        let url = section.url.clone();
        move || context.heartbeat_data(&address, port, public, Some(url.clone()))
    };
    let client = HeartbeatClient::new(section.client_config(), snapshot()).with_source(Box::new(snapshot));
    info!(url = %section.url, "heartbeat enabled");
    Ok(Some(client.spawn(stop)?))
}

/// Console line that stops the server.
pub const STOP_COMMAND: &str = "stop";

/// Starts a thread reading console commands from `input`.
///
/// [`STOP_COMMAND`] shuts the server down. End of input ends the thread and
/// leaves the server running.
///
/// # Errors
///
/// Returns thread spawn errors.
pub fn start_console<R>(input: R, context: &Arc<ServerContext>) -> TundraResult<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    let context = Arc::clone(context);
    let handle = thread::Builder::new().name("console".into()).spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "" => {}
                command if command.eq_ignore_ascii_case(STOP_COMMAND) => {
                    info!("stop requested from the console");
                    context.shutdown();
                    break;
                }
                other => warn!(command = %other, "unknown console command"),
            }
        }
    })?;
    Ok(handle)
}
