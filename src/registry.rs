//! # Static module registry.
//!
//! Maps `category.group.name` to a constructor plus explicit metadata. Nothing is
//! discovered at runtime: built-in kinds are registered by [`Registry::builtin`],
//! integrators add their own with [`Registry::register`].
//!
//! ```rust
//! use actorvisor::{ModuleConfig, ModuleGroup, Registry};
//!
//! let registry = Registry::builtin();
//! let names: Vec<String> = registry.list(None).iter().map(|e| e.path()).collect();
//! assert_eq!(
//!     names,
//!     ["actorvisor.input.gearman", "actorvisor.output.null", "actorvisor.output.uds"]
//! );
//!
//! let meta = registry.meta("actorvisor", ModuleGroup::Output, "null").unwrap();
//! assert_eq!(meta.title, "Discards all incoming events.");
//!
//! let module = registry
//!     .build("actorvisor", ModuleGroup::Output, "null", ModuleConfig::new("sink"))
//!     .unwrap();
//! assert_eq!(module.name(), "sink");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ModuleConfig;
use crate::core::Module;
use crate::error::ModuleError;
use crate::io::{GearmanBroker, UnixDialer};
use crate::modules::{GearmanIn, Null, UdsOut};

/// Category of the modules shipped with this crate.
pub const BUILTIN_CATEGORY: &str = "actorvisor";

/// Functional group a module belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleGroup {
    Flow,
    Encode,
    Decode,
    Function,
    Input,
    Output,
}

impl ModuleGroup {
    pub const ALL: [ModuleGroup; 6] = [
        ModuleGroup::Flow,
        ModuleGroup::Encode,
        ModuleGroup::Decode,
        ModuleGroup::Function,
        ModuleGroup::Input,
        ModuleGroup::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleGroup::Flow => "flow",
            ModuleGroup::Encode => "encode",
            ModuleGroup::Decode => "decode",
            ModuleGroup::Function => "function",
            ModuleGroup::Input => "input",
            ModuleGroup::Output => "output",
        }
    }
}

impl fmt::Display for ModuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleGroup {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ModuleError::invalid("group", format!("unknown module group `{s}`")))
    }
}

/// Descriptive metadata of a registered module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleMeta {
    /// One-line summary.
    pub title: String,
    /// Longer description of behavior and parameters.
    pub description: String,
    pub version: String,
}

impl ModuleMeta {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

type Constructor = Arc<dyn Fn(ModuleConfig) -> Result<Module, ModuleError> + Send + Sync>;

/// One registered module kind.
#[derive(Clone)]
pub struct RegistryEntry {
    pub category: String,
    pub group: ModuleGroup,
    pub name: String,
    pub meta: ModuleMeta,
    ctor: Constructor,
}

impl RegistryEntry {
    /// Dotted `category.group.name` path.
    pub fn path(&self) -> String {
        format!("{}.{}.{}", self.category, self.group, self.name)
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("path", &self.path())
            .field("meta", &self.meta)
            .finish()
    }
}

type Key = (String, ModuleGroup, String);

/// Lookup table of module kinds.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: BTreeMap<Key, RegistryEntry>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in kinds, wired to the real Gearman and Unix clients.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let entries: [(ModuleGroup, &str, ModuleMeta, Constructor); 3] = [
            (
                ModuleGroup::Input,
                "gearman",
                ModuleMeta::new(
                    "Consumes jobs from Gearman.",
                    "Runs `workers` consumers on queue `source` across `endpoints`. With a \
                     `secret`, job data is base64-decoded and AES-256 decrypted. Decoded \
                     payloads are submitted to `outbox`.",
                ),
                Arc::new(build_gearman),
            ),
            (
                ModuleGroup::Output,
                "uds",
                ModuleMeta::new(
                    "Writes events to a Unix domain socket.",
                    "Delivers `inbox` events to `target_path`, each followed by `delimiter`. \
                     The connection is probed while idle and re-established every second \
                     until it succeeds.",
                ),
                Arc::new(build_uds),
            ),
            (
                ModuleGroup::Output,
                "null",
                ModuleMeta::new(
                    "Discards all incoming events.",
                    "Drains `inbox` and drops every event.",
                ),
                Arc::new(build_null),
            ),
        ];
        for (group, name, meta, ctor) in entries {
            registry.insert(BUILTIN_CATEGORY, group, name, meta, ctor);
        }
        registry
    }

    /// Adds a module kind; fails if the path is taken.
    pub fn register<F>(
        &mut self,
        category: &str,
        group: ModuleGroup,
        name: &str,
        meta: ModuleMeta,
        ctor: F,
    ) -> Result<(), ModuleError>
    where
        F: Fn(ModuleConfig) -> Result<Module, ModuleError> + Send + Sync + 'static,
    {
        let key = (category.to_string(), group, name.to_string());
        if let Some(existing) = self.entries.get(&key) {
            return Err(ModuleError::DuplicateModule {
                path: existing.path(),
            });
        }
        self.insert(category, group, name, meta, Arc::new(ctor));
        Ok(())
    }

    fn insert(
        &mut self,
        category: &str,
        group: ModuleGroup,
        name: &str,
        meta: ModuleMeta,
        ctor: Constructor,
    ) {
        let entry = RegistryEntry {
            category: category.to_string(),
            group,
            name: name.to_string(),
            meta,
            ctor,
        };
        self.entries
            .insert((category.to_string(), group, name.to_string()), entry);
    }

    /// Entries ordered by category, group and name; optionally one category only.
    pub fn list(&self, category: Option<&str>) -> Vec<&RegistryEntry> {
        self.entries
            .values()
            .filter(|e| category.is_none_or(|c| e.category == c))
            .collect()
    }

    pub fn meta(&self, category: &str, group: ModuleGroup, name: &str) -> Option<&ModuleMeta> {
        self.get(category, group, name).map(|e| &e.meta)
    }

    /// Builds a module of the given kind from `config`.
    pub fn build(
        &self,
        category: &str,
        group: ModuleGroup,
        name: &str,
        config: ModuleConfig,
    ) -> Result<Module, ModuleError> {
        let entry = self
            .get(category, group, name)
            .ok_or_else(|| ModuleError::UnknownModule {
                path: format!("{category}.{group}.{name}"),
            })?;
        (entry.ctor)(config)
    }

    fn get(&self, category: &str, group: ModuleGroup, name: &str) -> Option<&RegistryEntry> {
        self.entries
            .get(&(category.to_string(), group, name.to_string()))
    }
}

fn build_gearman(cfg: ModuleConfig) -> Result<Module, ModuleError> {
    Ok(Module::new(GearmanIn::new(cfg, Arc::new(GearmanBroker::new()))?))
}

fn build_uds(cfg: ModuleConfig) -> Result<Module, ModuleError> {
    Ok(Module::new(UdsOut::new(cfg, Arc::new(UnixDialer::new()))?))
}

fn build_null(cfg: ModuleConfig) -> Result<Module, ModuleError> {
    Ok(Module::new(Null::new(cfg)?))
}
