pub mod constants;
pub mod engine;
pub mod error;
pub mod grid;
pub mod maps;
pub mod policy;
pub mod rng;
pub mod session;
pub mod smooth;
pub mod types;

pub use engine::{GameEngine, GameEngineOptions};
pub use error::{EngineError, EngineResult};
pub use session::GameSession;
