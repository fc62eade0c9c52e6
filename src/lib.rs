pub mod advanced;
pub mod box_score;
pub mod cache;
pub mod config;
pub mod core_metrics;
pub mod drives;
pub mod engine;
pub mod math;
pub mod normalize;
pub mod play;
pub mod season;
pub mod stack;
pub mod tendency;
pub mod win_prob;

pub use config::EngineConfig;
pub use engine::{AnalyticsEngine, SeasonReport};
