//! Read-only view of a realm for renderers and the `--json` report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    hex::Coord,
    production,
    society::{Outlook, Society},
    world::{
        CombatReport, EntityId, Enemy, Era, Goods, InstallationKind, Selection, Unit, World,
    },
};

#[derive(Debug, Clone, Serialize)]
pub struct SettlementView {
    pub id: EntityId,
    pub coord: Coord,
    pub tier: u8,
    pub name: &'static str,
    pub growth_points: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DangerPointView {
    pub coord: Coord,
    pub strength: u8,
    pub turns_until_spawn: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallationView {
    pub coord: Coord,
    pub kind: InstallationKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealmSnapshot {
    pub turn: u32,
    pub era: Era,
    pub treasury: Goods,
    pub income: Goods,
    pub population: u32,
    pub society: Society,
    pub outlook: Outlook,
    pub controlled_hexes: usize,
    pub settlements: Vec<SettlementView>,
    pub units: Vec<Unit>,
    pub enemies: Vec<Enemy>,
    pub danger_points: Vec<DangerPointView>,
    pub installations: Vec<InstallationView>,
    pub combat_report: Vec<CombatReport>,
    pub selection: Selection,
}

impl RealmSnapshot {
    pub fn capture(world: &World) -> Self {
        let settlements = world
            .settlements()
            .map(|s| SettlementView {
                id: s.id,
                coord: s.coord,
                tier: s.tier,
                name: s.name(),
                growth_points: s.growth_points,
            })
            .collect();
        let danger_points = world
            .map
            .hexes()
            .filter_map(|h| {
                h.danger_point.map(|d| DangerPointView {
                    coord: h.coord,
                    strength: d.strength,
                    turns_until_spawn: d.turns_until_spawn,
                })
            })
            .collect();
        let installations = world
            .map
            .hexes()
            .filter_map(|h| h.installation.map(|kind| InstallationView { coord: h.coord, kind }))
            .collect();

        Self {
            turn: world.turn,
            era: world.era,
            treasury: world.treasury,
            income: production::income(world),
            population: world.population(),
            society: world.society,
            outlook: world.society.outlook(),
            controlled_hexes: world.controlled_hex_count(),
            settlements,
            units: world.units().to_vec(),
            enemies: world.enemies().cloned().collect(),
            danger_points,
            installations,
            combat_report: world.combat_report.clone(),
            selection: world.selection,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialise snapshot")
    }

    /// Write the snapshot as `turn_NNNN.json` under `dir`.
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("turn_{:04}.json", self.turn));
        fs::write(&path, self.to_json()?)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(path)
    }
}
