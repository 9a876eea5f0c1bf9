//! Configuration loading and typed config structures for Praxis.
//!
//! The canonical configuration lives in `praxis-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and parses the file. Every
//! section is optional; missing sections and fields take the defaults
//! defined at the bottom of this module.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `praxis-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PraxisConfig {
    /// Stage schedule and tick pacing.
    #[serde(default)]
    pub tick: TickConfig,

    /// Per-manager arbitration settings, keyed by manager name.
    #[serde(default = "default_managers")]
    pub managers: BTreeMap<String, ManagerConfig>,

    /// Rotation resource settings.
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Hotbar resource settings.
    #[serde(default)]
    pub hotbar: HotbarConfig,

    /// Inventory resource settings.
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Placement simulation settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Task forest settings.
    #[serde(default)]
    pub tasks: TaskConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for PraxisConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            managers: default_managers(),
            rotation: RotationConfig::default(),
            hotbar: HotbarConfig::default(),
            inventory: InventoryConfig::default(),
            build: BuildConfig::default(),
            tasks: TaskConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PraxisConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Settings for the manager called `name`, or the defaults if the
    /// configuration does not mention it.
    pub fn manager(&self, name: &str) -> ManagerConfig {
        self.managers.get(name).cloned().unwrap_or_default()
    }
}

/// Stage schedule and tick pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TickConfig {
    /// Stage names in emission order. The last one is the terminal stage.
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,

    /// Real-time milliseconds between ticks when driven by the runner.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks per second of host time, used by per-second budgets.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            tick_interval_ms: default_tick_interval_ms(),
            ticks_per_second: default_ticks_per_second(),
            max_ticks: 0,
        }
    }
}

/// Arbitration settings for one manager.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagerConfig {
    /// Priority against sibling managers. Higher opens first and closes last.
    #[serde(default)]
    pub priority: u32,

    /// Stages during which the manager never opens.
    #[serde(default)]
    pub exclude_stages: Vec<String>,

    /// Maximum requests applied per tick (0 = unlimited).
    #[serde(default)]
    pub max_per_tick: u32,

    /// Maximum requests applied per second of host time (0 = unlimited).
    #[serde(default)]
    pub max_per_second: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            priority: 0,
            exclude_stages: default_exclude_stages(),
            max_per_tick: 0,
            max_per_second: 0,
        }
    }
}

/// Rotation resource settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RotationConfig {
    /// Ticks a reached rotation is held before the request is released.
    #[serde(default = "default_keep_ticks")]
    pub keep_ticks: u32,

    /// Maximum degrees turned per tick (0 = instant).
    #[serde(default)]
    pub turn_speed: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            keep_ticks: default_keep_ticks(),
            turn_speed: 0.0,
        }
    }
}

/// Hotbar resource settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HotbarConfig {
    /// Ticks a selected slot is held before the request is released.
    #[serde(default = "default_keep_ticks")]
    pub keep_ticks: u32,

    /// Ticks to wait after a swap before the slot counts as ready.
    #[serde(default)]
    pub swap_pause: u32,

    /// Maximum slot swaps per tick.
    #[serde(default = "default_swaps_per_tick")]
    pub swaps_per_tick: u32,
}

impl Default for HotbarConfig {
    fn default() -> Self {
        Self {
            keep_ticks: default_keep_ticks(),
            swap_pause: 0,
            swaps_per_tick: default_swaps_per_tick(),
        }
    }
}

/// Inventory resource settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventoryConfig {
    /// Maximum inventory actions performed per tick.
    #[serde(default = "default_actions_per_tick")]
    pub actions_per_tick: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            actions_per_tick: default_actions_per_tick(),
        }
    }
}

/// How the simulation picks one aim point out of many valid ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSelection {
    /// The point needing the least turning from the current rotation.
    ByRotation,
    /// The point closest to the mean of all valid points.
    #[default]
    Optimum,
}

/// Placement simulation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuildConfig {
    /// Maximum interaction distance from the eye, in blocks.
    #[serde(default = "default_reach")]
    pub reach: f64,

    /// Maximum number of nested dependency simulations.
    #[serde(default = "default_max_dependencies")]
    pub max_dependencies: usize,

    /// Verify every scanned point with a ray cast and scan a grid per face.
    #[serde(default)]
    pub strict_ray_cast: bool,

    /// Grid resolution per face when `strict_ray_cast` is on.
    #[serde(default = "default_resolution")]
    pub resolution: u32,

    /// Only scan faces that face the eye. Always on with `strict_ray_cast`.
    #[serde(default = "default_true")]
    pub check_side_visibility: bool,

    /// Aim point selection strategy.
    #[serde(default)]
    pub point_selection: PointSelection,

    /// Inset applied to boxes before scanning.
    #[serde(default = "default_shrink_factor")]
    pub shrink_factor: f64,

    /// Allow placing against empty space.
    #[serde(default)]
    pub air_place: bool,

    /// Refuse to break the block the player stands on.
    #[serde(default = "default_true")]
    pub avoid_supporting: bool,

    /// Block placed into fluids before they can be broken (none = skip).
    #[serde(default = "default_fluid_filler")]
    pub fluid_filler: Option<String>,

    /// Blocks that are never broken.
    #[serde(default)]
    pub ignored_blocks: Vec<String>,

    /// Results ranked below this value are directly actionable.
    #[serde(default = "default_actionable_rank")]
    pub actionable_rank: u8,

    /// Maximum positions simulated at the same time.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            reach: default_reach(),
            max_dependencies: default_max_dependencies(),
            strict_ray_cast: false,
            resolution: default_resolution(),
            check_side_visibility: true,
            point_selection: PointSelection::default(),
            shrink_factor: default_shrink_factor(),
            air_place: false,
            avoid_supporting: true,
            fluid_filler: default_fluid_filler(),
            ignored_blocks: Vec::new(),
            actionable_rank: default_actionable_rank(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Task forest settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskConfig {
    /// Keep completed tasks visible in the tree.
    #[serde(default)]
    pub show_all_entries: bool,

    /// Children rendered per node before the rest are summarised.
    #[serde(default = "default_max_render_entries")]
    pub max_render_entries: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            show_all_entries: false,
            max_render_entries: default_max_render_entries(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_stages() -> Vec<String> {
    [
        "tick_pre",
        "network_pre",
        "network_post",
        "player_pre",
        "player_post",
        "input_pre",
        "input_post",
        "world_render_pre",
        "world_render_post",
        "sound_pre",
        "sound_post",
        "tick_post",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

fn default_exclude_stages() -> Vec<String> {
    ["world_render_pre", "world_render_post", "sound_pre", "sound_post"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_managers() -> BTreeMap<String, ManagerConfig> {
    let mut managers = BTreeMap::new();
    for (name, priority) in [("rotation", 3), ("hotbar", 2), ("inventory", 1), ("interact", 0)] {
        managers.insert(
            name.to_owned(),
            ManagerConfig {
                priority,
                ..ManagerConfig::default()
            },
        );
    }
    managers
}

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_ticks_per_second() -> u32 {
    20
}

const fn default_keep_ticks() -> u32 {
    3
}

const fn default_swaps_per_tick() -> u32 {
    3
}

const fn default_actions_per_tick() -> u32 {
    1
}

const fn default_reach() -> f64 {
    4.5
}

const fn default_max_dependencies() -> usize {
    3
}

const fn default_resolution() -> u32 {
    5
}

const fn default_shrink_factor() -> f64 {
    0.001
}

#[allow(clippy::unnecessary_wraps)]
fn default_fluid_filler() -> Option<String> {
    Some("cobblestone".to_owned())
}

const fn default_actionable_rank() -> u8 {
    4
}

const fn default_max_concurrency() -> usize {
    8
}

const fn default_max_render_entries() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PraxisConfig::default();
        assert_eq!(config.tick.stages.len(), 12);
        assert_eq!(config.tick.ticks_per_second, 20);
        assert!((config.build.reach - 4.5).abs() < f64::EPSILON);
        assert_eq!(config.build.max_dependencies, 3);
        assert_eq!(config.tasks.max_render_entries, 10);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = PraxisConfig::parse("");
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();
        assert_eq!(config.managers.len(), 4);
        assert_eq!(config.manager("rotation").priority, 3);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "tick:\n  max_ticks: 40\n";
        let config = PraxisConfig::parse(yaml).ok().unwrap_or_default();
        assert_eq!(config.tick.max_ticks, 40);
        assert_eq!(config.tick.stages.len(), 12);
        assert_eq!(config.manager("hotbar").priority, 2);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
tick:
  stages: [pre, mid, post]
  tick_interval_ms: 10
  ticks_per_second: 10
  max_ticks: 5

managers:
  rotation:
    priority: 7
    exclude_stages: [mid]
    max_per_tick: 1
    max_per_second: 4

rotation:
  keep_ticks: 2
  turn_speed: 45.0

hotbar:
  keep_ticks: 1
  swap_pause: 2
  swaps_per_tick: 1

inventory:
  actions_per_tick: 2

build:
  reach: 3.0
  max_dependencies: 1
  strict_ray_cast: true
  resolution: 3
  check_side_visibility: false
  point_selection: by_rotation
  shrink_factor: 0.01
  air_place: true
  avoid_supporting: false
  fluid_filler: null
  ignored_blocks: [bedrock]
  actionable_rank: 2
  max_concurrency: 2

tasks:
  show_all_entries: true
  max_render_entries: 3

logging:
  level: debug
  json: true
";
        let config = PraxisConfig::parse(yaml).ok().unwrap_or_default();
        assert_eq!(config.tick.stages, vec!["pre", "mid", "post"]);
        assert_eq!(config.tick.max_ticks, 5);
        let rotation = config.manager("rotation");
        assert_eq!(rotation.priority, 7);
        assert_eq!(rotation.exclude_stages, vec!["mid"]);
        assert_eq!(rotation.max_per_second, 4);
        assert_eq!(config.managers.len(), 1);
        assert_eq!(config.rotation.keep_ticks, 2);
        assert_eq!(config.hotbar.swap_pause, 2);
        assert_eq!(config.inventory.actions_per_tick, 2);
        assert!(config.build.strict_ray_cast);
        assert_eq!(config.build.point_selection, PointSelection::ByRotation);
        assert_eq!(config.build.fluid_filler, None);
        assert_eq!(config.build.ignored_blocks, vec!["bedrock"]);
        assert!(config.tasks.show_all_entries);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn unknown_manager_gets_defaults() {
        let config = PraxisConfig::default();
        let manager = config.manager("does_not_exist");
        assert_eq!(manager.priority, 0);
        assert_eq!(manager.exclude_stages.len(), 4);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = PraxisConfig::parse("tick: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../praxis-config.yaml");
        if path.exists() {
            let config = PraxisConfig::from_file(&path);
            assert!(config.is_ok());
        }
    }
}
