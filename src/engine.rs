use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    combat::{self, CombatResult},
    config::GameSettings,
    error::RealmError,
    hex::Coord,
    options::{self, SocietyOption},
    production,
    rng::{RngManager, SystemRng},
    settlement::{self, PopCost},
    snapshot::RealmSnapshot,
    systems::{
        CollapseSystem, DangerOccupationSystem, DangerSpawnSystem, EnemyTurnSystem, EraSystem,
        GrowthSystem, ProductionSystem, ReportResetSystem, SettlementSpawnSystem,
        SocietySystem, StackSortSystem, TurnCloseSystem, UnitRefreshSystem, WildSpawnSystem,
    },
    terrain::{self, TerrainGenerator},
    units,
    world::{
        CombatReport, EntityId, Goods, Hex, HexMap, InstallationKind, TurnEvents, UnitKind, World,
    },
};

/// What a phase sees of the turn besides the world itself.
pub struct TurnContext<'a> {
    pub turn: u32,
    pub game_name: &'a str,
}

/// One step of `end_turn`. Each phase draws from its own RNG stream, keyed
/// by its name.
pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemRunReport {
    pub name: String,
    pub duration_ms: f64,
}

#[derive(Default)]
pub struct TurnPipeline {
    systems: Vec<Box<dyn System>>,
}

impl TurnPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fourteen phases in their required order. Hazards strike before
    /// new spawns appear, and the collapse check sees everything else first.
    pub fn standard() -> Self {
        Self::new()
            .with_system(ReportResetSystem::new())
            .with_system(UnitRefreshSystem::new())
            .with_system(StackSortSystem::new())
            .with_system(DangerOccupationSystem::new())
            .with_system(DangerSpawnSystem::new())
            .with_system(EnemyTurnSystem::new())
            .with_system(ProductionSystem::new())
            .with_system(GrowthSystem::new())
            .with_system(SettlementSpawnSystem::new())
            .with_system(WildSpawnSystem::new())
            .with_system(SocietySystem::new())
            .with_system(EraSystem::new())
            .with_system(CollapseSystem::new())
            .with_system(TurnCloseSystem::new())
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn names(&self) -> Vec<String> {
        self.systems.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn run(
        &mut self,
        ctx: &TurnContext,
        world: &mut World,
        rng: &mut RngManager,
    ) -> Result<Vec<SystemRunReport>> {
        let mut reports = Vec::with_capacity(self.systems.len());
        for system in &mut self.systems {
            let name = system.name().to_string();
            let mut stream = rng.stream(&name);
            let start = Instant::now();
            system
                .run(ctx, world, &mut stream)
                .with_context(|| format!("phase '{name}' failed on turn {}", ctx.turn))?;
            reports.push(SystemRunReport {
                name,
                duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            });
        }
        Ok(reports)
    }
}

/// Outcome of one `end_turn`.
#[derive(Clone, Debug, Serialize)]
pub struct TurnSummary {
    /// The turn that just ended.
    pub turn: u32,
    pub phase_reports: Vec<SystemRunReport>,
    pub income: Goods,
    pub combat_report: Vec<CombatReport>,
    pub events: TurnEvents,
}

/// A running game: the world plus the RNG streams and phase pipeline that
/// move it forward. Every command has a `can_*` twin; commands that would be
/// illegal are no-ops returning `false` or `None`.
pub struct Game {
    world: World,
    rng: RngManager,
    pipeline: TurnPipeline,
    settings: GameSettings,
    accessible: BTreeSet<Coord>,
}

impl Game {
    /// Generate terrain from the settings' seed and set up a fresh realm.
    pub fn generate(settings: GameSettings) -> Result<Self> {
        settings.validate()?;
        let mut rng = RngManager::new(settings.seed);
        let generated = TerrainGenerator::new(
            settings.map_radius,
            settings.difficulty.hazard_budget(),
        )?
        .generate(&mut rng.stream("terrain"))
        .context("terrain generation failed")?;
        let mut game = Self::with_rng(settings, generated.map, rng);
        game.accessible = generated.accessible;
        Ok(game)
    }

    /// Start on a prepared map. The first camp goes to the best central
    /// plains hex, if there is one.
    pub fn new(settings: GameSettings, map: HexMap) -> Self {
        let rng = RngManager::new(settings.seed);
        Self::with_rng(settings, map, rng)
    }

    fn with_rng(settings: GameSettings, map: HexMap, mut rng: RngManager) -> Self {
        let start = terrain::find_starting_location(&map);
        let mut world = World::new(map, settings.difficulty);
        if let Some(coord) = start {
            settlement::create_settlement(&mut world, coord, 0);
        }
        world.society_options = options::shuffled_catalog(&mut rng.stream("options"));
        world.refresh_territory();
        info!(
            name = %settings.name,
            seed = settings.seed,
            radius = world.map.radius(),
            difficulty = %settings.difficulty,
            "game started"
        );
        Self {
            world,
            rng,
            pipeline: TurnPipeline::standard(),
            settings,
            accessible: BTreeSet::new(),
        }
    }

    /// Swap the phase pipeline, for tooling that wants to observe or
    /// reorder phases.
    pub fn with_pipeline(mut self, pipeline: TurnPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct access for scenario setup in tooling and tests.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn turn(&self) -> u32 {
        self.world.turn
    }

    pub fn phase_names(&self) -> Vec<String> {
        self.pipeline.names()
    }

    /// Land reachable from the generated start. Empty for prepared maps.
    pub fn accessible(&self) -> &BTreeSet<Coord> {
        &self.accessible
    }

    // queries

    pub fn hex(&self, coord: Coord) -> Option<&Hex> {
        self.world.hex(coord)
    }

    pub fn income(&self) -> Goods {
        production::income(&self.world)
    }

    pub fn population(&self) -> u32 {
        self.world.population()
    }

    pub fn max_tier_at(&self, coord: Coord) -> u8 {
        settlement::max_tier_at(&self.world, coord)
    }

    pub fn influence_at(&self, coord: Coord) -> f64 {
        settlement::influence_at(&self.world, coord)
    }

    pub fn spawn_probability_map(&self) -> BTreeMap<Coord, f64> {
        settlement::spawn_probability_map(&self.world)
    }

    pub fn valid_moves(&self, unit_id: EntityId) -> BTreeMap<Coord, u32> {
        units::valid_moves(&self.world, unit_id)
    }

    pub fn plan_route(&self, unit_id: EntityId, goal: Coord) -> Option<Vec<Coord>> {
        units::plan_route(&self.world, unit_id, goal)
    }

    pub fn available_options(&self) -> Vec<&'static SocietyOption> {
        options::available_options(&self.world)
    }

    pub fn snapshot(&self) -> RealmSnapshot {
        RealmSnapshot::capture(&self.world)
    }

    fn require_settlement(&self, id: EntityId) -> Result<(), RealmError> {
        self.world
            .settlement(id)
            .map(|_| ())
            .ok_or(RealmError::UnknownEntity(id))
    }

    fn require_unit(&self, id: EntityId) -> Result<(), RealmError> {
        self.world
            .unit(id)
            .map(|_| ())
            .ok_or(RealmError::UnknownEntity(id))
    }

    // settlements

    pub fn create_settlement(&mut self, coord: Coord, tier: u8) -> Option<EntityId> {
        settlement::create_settlement(&mut self.world, coord, tier)
    }

    pub fn can_upgrade_settlement(&self, id: EntityId) -> bool {
        settlement::can_upgrade(&self.world, id)
    }

    pub fn upgrade_settlement(&mut self, id: EntityId) -> Result<bool, RealmError> {
        self.require_settlement(id)?;
        Ok(settlement::upgrade(&mut self.world, id))
    }

    pub fn can_found_settlement(&self, coord: Coord) -> bool {
        settlement::can_found_settlement(&self.world, coord)
    }

    /// Who would pay for a new settlement right now.
    pub fn settlement_pop_cost(&mut self) -> Option<PopCost> {
        settlement::settlement_pop_cost(&self.world, &mut self.rng.stream("commands"))
    }

    pub fn founding_needs_confirmation(&mut self, coord: Coord) -> bool {
        settlement::founding_needs_confirmation(
            &self.world,
            coord,
            &mut self.rng.stream("commands"),
        )
    }

    /// Found a settlement at `coord`. Pass the payer from
    /// [`Game::settlement_pop_cost`] when the player confirmed a specific
    /// victim.
    pub fn found_settlement(
        &mut self,
        coord: Coord,
        victim: Option<EntityId>,
    ) -> Option<EntityId> {
        settlement::found_settlement(
            &mut self.world,
            coord,
            victim,
            &mut self.rng.stream("settlement"),
        )
    }

    // units

    pub fn can_recruit(&self, settlement_id: EntityId, kind: UnitKind) -> bool {
        units::can_recruit(&self.world, settlement_id, kind)
    }

    pub fn recruit(
        &mut self,
        settlement_id: EntityId,
        kind: UnitKind,
    ) -> Result<Option<EntityId>, RealmError> {
        self.require_settlement(settlement_id)?;
        Ok(units::recruit(&mut self.world, settlement_id, kind))
    }

    pub fn can_move(&self, unit_id: EntityId, to: Coord) -> bool {
        units::can_move(&self.world, unit_id, to)
    }

    pub fn move_unit(&mut self, unit_id: EntityId, to: Coord) -> Result<bool, RealmError> {
        self.require_unit(unit_id)?;
        Ok(units::move_unit(&mut self.world, unit_id, to))
    }

    pub fn can_attack(&self, unit_id: EntityId, target: Coord) -> bool {
        combat::can_attack(&self.world, unit_id, target)
    }

    pub fn attack(
        &mut self,
        unit_id: EntityId,
        target: Coord,
    ) -> Result<Option<CombatResult>, RealmError> {
        self.require_unit(unit_id)?;
        let result = combat::attack(
            &mut self.world,
            unit_id,
            target,
            &mut self.rng.stream("combat"),
        );
        if let Some(r) = &result {
            debug!(
                unit = %unit_id,
                target = %target,
                damage = r.damage,
                killed = r.killed,
                "attack"
            );
        }
        Ok(result)
    }

    pub fn can_build_installation(&self, coord: Coord, kind: InstallationKind) -> bool {
        units::can_build_installation(&self.world, coord, kind)
    }

    pub fn build_installation(&mut self, coord: Coord, kind: InstallationKind) -> bool {
        units::build_installation(&mut self.world, coord, kind)
    }

    pub fn teardown_installation(&mut self, coord: Coord) -> Option<Goods> {
        units::teardown_installation(&mut self.world, coord)
    }

    // selection

    pub fn select_hex(&mut self, coord: Coord) {
        units::select_hex(&mut self.world, coord);
    }

    pub fn select_unit(&mut self, unit_id: EntityId) -> bool {
        units::select_unit(&mut self.world, unit_id)
    }

    pub fn clear_selection(&mut self) {
        units::clear_selection(&mut self.world);
    }

    // society

    pub fn can_apply_society_option(&self, name: &str) -> bool {
        options::find(name).is_some_and(|o| options::can_apply_society_option(&self.world, o))
    }

    pub fn apply_society_option(&mut self, name: &str) -> bool {
        let Some(option) = options::find(name) else {
            return false;
        };
        let applied = options::apply_society_option(&mut self.world, option);
        if applied {
            info!(option = option.name, "society option applied");
        }
        applied
    }

    /// Run every phase once and advance the turn counter.
    pub fn end_turn(&mut self) -> Result<TurnSummary> {
        let turn = self.world.turn;
        let ctx = TurnContext {
            turn,
            game_name: &self.settings.name,
        };
        let phase_reports = self.pipeline.run(&ctx, &mut self.world, &mut self.rng)?;
        debug!(turn, treasury = %self.world.treasury, "turn ended");
        Ok(TurnSummary {
            turn,
            phase_reports,
            income: self.world.events.income,
            combat_report: self.world.combat_report.clone(),
            events: self.world.events.clone(),
        })
    }

    /// End `turns` turns in a row, stopping at the first phase failure.
    pub fn run(&mut self, turns: u32) -> Result<Vec<TurnSummary>> {
        (0..turns).map(|_| self.end_turn()).collect()
    }

    /// Like [`Game::run`], handing each summary and the resulting world to
    /// `hook` as soon as its turn ends.
    pub fn run_with_hook<F>(&mut self, turns: u32, mut hook: F) -> Result<()>
    where
        F: FnMut(&TurnSummary, &World),
    {
        for _ in 0..turns {
            let summary = self.end_turn()?;
            hook(&summary, &self.world);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Terrain;

    fn plains_game() -> Game {
        Game::new(GameSettings::default(), HexMap::uniform(8, Terrain::Plains))
    }

    #[test]
    fn standard_pipeline_runs_fourteen_phases_in_order() {
        let names = TurnPipeline::standard().names();
        assert_eq!(names.len(), 14);
        assert_eq!(names.first().map(String::as_str), Some("report_reset"));
        let position = |n: &str| names.iter().position(|x| x == n).unwrap();
        assert!(position("danger_occupation") < position("danger_spawn"));
        assert!(position("danger_spawn") < position("enemy_turn"));
        assert!(position("production") < position("growth"));
        assert_eq!(position("collapse"), 12);
        assert_eq!(names.last().map(String::as_str), Some("turn_close"));
    }

    #[test]
    fn prepared_map_starts_with_one_camp() {
        let game = plains_game();
        assert_eq!(game.world().settlement_count(), 1);
        let camp = game.world().settlements().next().unwrap();
        assert_eq!(camp.tier, 0);
        assert_eq!(camp.coord, Coord::ORIGIN);
        assert_eq!(game.world().treasury, Goods::new(100, 50));
        assert_eq!(game.world().society_options().len(), options::catalog().len());
    }

    #[test]
    fn end_turn_reports_every_phase_and_advances() {
        let mut game = plains_game();
        let summary = game.end_turn().unwrap();
        assert_eq!(summary.turn, 1);
        assert_eq!(summary.phase_reports.len(), 14);
        assert_eq!(game.turn(), 2);
        assert_eq!(summary.income, Goods::new(1, 1));
    }

    #[test]
    fn dangling_ids_are_errors() {
        let mut game = plains_game();
        let ghost = game.world_mut().insert_unit(UnitKind::Worker, Coord::ORIGIN);
        game.world_mut().remove_unit(ghost);
        assert!(matches!(
            game.move_unit(ghost, Coord::new(1, 0)),
            Err(RealmError::UnknownEntity(id)) if id == ghost
        ));
        assert!(game.attack(ghost, Coord::new(1, 0)).is_err());
    }

    #[test]
    fn illegal_commands_are_no_ops() {
        let mut game = plains_game();
        let camp = game.world().settlement_ids()[0];
        assert!(!game.can_upgrade_settlement(camp));
        assert!(!game.upgrade_settlement(camp).unwrap());
        assert!(!game.build_installation(Coord::new(2, 0), InstallationKind::Fort));
        assert!(game.teardown_installation(Coord::new(2, 0)).is_none());
        assert!(!game.apply_society_option("No Such Decree"));
    }
}
