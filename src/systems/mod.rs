mod bookkeeping;
mod economy;
mod enemies;
mod hazards;
mod settlements;
mod society;
mod units;

pub use bookkeeping::{ReportResetSystem, TurnCloseSystem};
pub use economy::ProductionSystem;
pub use enemies::{EnemyTurnSystem, WildSpawnSystem};
pub use hazards::{DangerOccupationSystem, DangerSpawnSystem};
pub use settlements::{GrowthSystem, SettlementSpawnSystem};
pub use society::{CollapseSystem, EraSystem, SocietySystem};
pub use units::{StackSortSystem, UnitRefreshSystem};
