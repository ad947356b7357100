use anyhow::{bail, Context, Result};
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::entity::EntityKind;

/// Upper bound any pool capacity must stay under, regardless of what the
/// configuration asks for.
pub const POOL_HARD_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "PoolConfig::default_blips")]
    pub blips: usize,
    #[serde(default = "PoolConfig::default_checkpoints")]
    pub checkpoints: usize,
    #[serde(default = "PoolConfig::default_keybinds")]
    pub keybinds: usize,
    #[serde(default = "PoolConfig::default_objects")]
    pub objects: usize,
    #[serde(default = "PoolConfig::default_pickups")]
    pub pickups: usize,
    #[serde(default = "PoolConfig::default_players")]
    pub players: usize,
    #[serde(default = "PoolConfig::default_spheres")]
    pub spheres: usize,
    #[serde(default = "PoolConfig::default_sprites")]
    pub sprites: usize,
    #[serde(default = "PoolConfig::default_textdraws")]
    pub textdraws: usize,
    #[serde(default = "PoolConfig::default_vehicles")]
    pub vehicles: usize,
}

impl PoolConfig {
    const fn default_blips() -> usize {
        EntityKind::Blip.default_limit()
    }

    const fn default_checkpoints() -> usize {
        EntityKind::Checkpoint.default_limit()
    }

    const fn default_keybinds() -> usize {
        EntityKind::Keybind.default_limit()
    }

    const fn default_objects() -> usize {
        EntityKind::Object.default_limit()
    }

    const fn default_pickups() -> usize {
        EntityKind::Pickup.default_limit()
    }

    const fn default_players() -> usize {
        EntityKind::Player.default_limit()
    }

    const fn default_spheres() -> usize {
        EntityKind::Sphere.default_limit()
    }

    const fn default_sprites() -> usize {
        EntityKind::Sprite.default_limit()
    }

    const fn default_textdraws() -> usize {
        EntityKind::Textdraw.default_limit()
    }

    const fn default_vehicles() -> usize {
        EntityKind::Vehicle.default_limit()
    }

    pub fn capacity(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Blip => self.blips,
            EntityKind::Checkpoint => self.checkpoints,
            EntityKind::Keybind => self.keybinds,
            EntityKind::Object => self.objects,
            EntityKind::Pickup => self.pickups,
            EntityKind::Player => self.players,
            EntityKind::Sphere => self.spheres,
            EntityKind::Sprite => self.sprites,
            EntityKind::Textdraw => self.textdraws,
            EntityKind::Vehicle => self.vehicles,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for kind in EntityKind::ALL {
            let capacity = self.capacity(kind);
            if capacity == 0 || capacity > POOL_HARD_LIMIT {
                bail!(
                    "invalid {} pool capacity {capacity}; expected 1..={POOL_HARD_LIMIT}",
                    kind.name()
                );
            }
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            blips: Self::default_blips(),
            checkpoints: Self::default_checkpoints(),
            keybinds: Self::default_keybinds(),
            objects: Self::default_objects(),
            pickups: Self::default_pickups(),
            players: Self::default_players(),
            spheres: Self::default_spheres(),
            sprites: Self::default_sprites(),
            textdraws: Self::default_textdraws(),
            vehicles: Self::default_vehicles(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "ScriptConfig::default_entry")]
    pub entry: String,
}

impl ScriptConfig {
    fn default_entry() -> String {
        "scripts/main.rhai".to_string()
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self { entry: Self::default_entry() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PluginConfig {
    #[serde(default)]
    pub pools: PoolConfig,
    #[serde(default)]
    pub scripts: ScriptConfig,
}

impl PluginConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: PluginConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("config load error: {err:?}; falling back to defaults");
                Self::default()
            }
        }
    }
}
