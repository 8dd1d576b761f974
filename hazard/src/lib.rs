pub mod game;
pub mod geometry;
pub mod image;
pub mod result;
pub mod session;
pub mod zone;

pub use game::{GameConfig, GameError};
pub use geometry::{Point, Shape, ShapeError, ShapeKind};
pub use image::GameImage;
pub use result::{GameResult, ImageResult};
pub use session::{ClickOutcome, FoundRisks, GameSession, SessionError, SessionStatus};
pub use zone::{hit_test, validate_zone_set, Difficulty, RiskZone, ZoneError};
