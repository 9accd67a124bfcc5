//! # TUNDRA Procedural Generation
//!
//! Deterministic map generation for Classic worlds.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same seed and parameters always produce the same map
//! 2. **Validated**: parameters are checked before any voxel work
//! 3. **Cancellable**: generation polls a shared flag between phases and
//!    inside long loops, and never returns a partial map
//! 4. **Closed**: the generator family is an enum, not a plugin table
//!
//! ## Core Components
//!
//! - `noise`: improved (Perlin) noise, lattice value noise and [`Grid`] transforms
//! - `GenParams`: per-generator parameters with versioned TOML documents
//! - `GeneratorRegistry`: case-insensitive generator lookup
//! - `GenerationTask`: progress reporting and cancellation around a run
//!
//! ## Example
//!
//! ```rust,ignore
//! use tundra_procedural::{GenParams, GenerationTask, RealisticTemplate};
//!
//! let params = GenParams::Realistic(RealisticTemplate::Island.params(256, 256, 96, 1234));
//! let outcome = GenerationTask::new(params).with_callback(|p| println!("{}%", p.percent)).run()?;
//! let map = outcome.into_map().expect("not canceled");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

mod classic;
pub mod error;
mod flat;
pub mod noise;
pub mod params;
mod realistic;
pub mod registry;
pub mod task;
pub mod template;
pub mod theme;
pub mod tree;

pub use error::{GenError, GenResult};
pub use noise::{Grid, InterpolationMode, WorldSeed};
pub use params::{ClassicParams, FlatParams, GenParams, RealisticParams, PARAMS_DOCUMENT_VERSION};
pub use realistic::DEFAULT_WATER_THRESHOLD;
pub use registry::{GeneratorKind, GeneratorRegistry, METADATA_GROUP};
pub use task::{generate, GenContext, GenOutcome, GenState, GenerationTask, Progress};
pub use template::RealisticTemplate;
pub use theme::{BlockTheme, ThemePreset};
