pub mod combat;
pub mod config;
pub mod enemy;
pub mod engine;
pub mod error;
pub mod hex;
pub mod options;
pub mod production;
pub mod rng;
pub mod rules;
pub mod settlement;
pub mod snapshot;
pub mod society;
pub mod systems;
pub mod terrain;
pub mod units;
pub mod world;

pub use config::{Difficulty, GameSettings, SettingsLoader};
pub use engine::{Game, System, TurnContext, TurnPipeline, TurnSummary};
pub use error::RealmError;
pub use hex::Coord;
pub use snapshot::RealmSnapshot;
pub use world::World;
