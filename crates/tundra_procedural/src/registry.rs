//! # Generator Registry
//!
//! The generator family is closed: [`GeneratorKind`] names every
//! generator that exists. A [`GeneratorRegistry`] maps user-facing names
//! (case-insensitive) onto kinds; it is built at startup and passed to
//! whoever needs lookups.

use std::collections::BTreeMap;
use std::fmt;

use tundra_core::{Dimensions, Map};

use crate::error::{GenError, GenResult};
use crate::params::{ClassicParams, FlatParams, GenParams};
use crate::task::{GenContext, Step};
use crate::template::RealisticTemplate;
use crate::{classic, flat, realistic};

/// Metadata group written into every generated map.
pub const METADATA_GROUP: &str = "_MapGenerator";

/// Every generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    /// Dirt with a grass top.
    Flat,
    /// Classic-style noise terrain.
    Classic,
    /// Heightmap terrain with caves, beaches and trees.
    Realistic,
}

impl GeneratorKind {
    /// Built-in generators.
    pub const ALL: [Self; 3] = [Self::Flat, Self::Classic, Self::Realistic];

    /// Canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Flat => "Flat",
            Self::Classic => "Classic",
            Self::Realistic => "Realistic",
        }
    }

    /// Version recorded in map metadata.
    #[must_use]
    pub const fn version(self) -> &'static str {
        match self {
            Self::Flat | Self::Classic => "1.0",
            Self::Realistic => "2.0",
        }
    }

    /// Kind of the given parameters.
    #[must_use]
    pub const fn of(params: &GenParams) -> Self {
        match params {
            GenParams::Flat(_) => Self::Flat,
            GenParams::Classic(_) => Self::Classic,
            GenParams::Realistic(_) => Self::Realistic,
        }
    }

    /// Default parameters of this generator for a map size and seed.
    #[must_use]
    pub fn default_params(self, dims: Dimensions, seed: i64) -> GenParams {
        match self {
            Self::Flat => GenParams::Flat(FlatParams {
                width: dims.width,
                length: dims.length,
                height: dims.height,
                ground_level: None,
            }),
            Self::Classic => GenParams::Classic(ClassicParams {
                seed,
                width: dims.width,
                length: dims.length,
                height: dims.height,
                ..ClassicParams::default()
            }),
            Self::Realistic => GenParams::Realistic(RealisticTemplate::Default.params(
                dims.width,
                dims.length,
                dims.height,
                seed,
            )),
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Case-insensitive name to generator lookup.
#[derive(Clone, Debug, Default)]
pub struct GeneratorRegistry {
    entries: BTreeMap<String, (String, GeneratorKind)>,
}

impl GeneratorRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `Flat`, `Classic` and `Realistic`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for kind in GeneratorKind::ALL {
            registry.entries.insert(kind.name().to_ascii_lowercase(), (kind.name().to_string(), kind));
        }
        registry
    }

    /// Registers `name` for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::DuplicateGenerator`] if the name (ignoring case)
    /// is taken; the existing entry is kept.
    pub fn register(&mut self, name: &str, kind: GeneratorKind) -> GenResult<()> {
        let key = name.to_ascii_lowercase();
        if self.entries.contains_key(&key) {
            return Err(GenError::DuplicateGenerator(name.to_string()));
        }
        self.entries.insert(key, (name.to_string(), kind));
        Ok(())
    }

    /// Looks up a generator by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<GeneratorKind> {
        self.entries.get(&name.to_ascii_lowercase()).map(|(_, kind)| *kind)
    }

    /// Looks up a generator by name.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnknownGenerator`] if absent.
    pub fn find(&self, name: &str) -> GenResult<GeneratorKind> {
        self.get(name).ok_or_else(|| GenError::UnknownGenerator(name.to_string()))
    }

    /// Registered names as they were registered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(name, _)| name.as_str())
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dispatches to the generator and stamps the metadata group.
pub(crate) fn run_generator(params: &GenParams, ctx: &mut GenContext) -> Step<Map> {
    let kind = GeneratorKind::of(params);
    let mut map = match params {
        GenParams::Flat(p) => flat::generate(p, ctx)?,
        GenParams::Classic(p) => classic::generate(p, ctx)?,
        GenParams::Realistic(p) => realistic::generate(p, ctx)?,
    };
    ctx.check()?;
    map.set_metadata(METADATA_GROUP, "Generator", kind.name());
    map.set_metadata(METADATA_GROUP, "Version", kind.version());
    map.set_metadata(METADATA_GROUP, "Params", params.to_document()?);
    Ok(map)
}
