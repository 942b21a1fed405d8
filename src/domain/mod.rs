//! Data structures for the evidence session engine.

pub mod session;
pub mod timeline;
pub mod turn;

pub use session::{EvidenceSession, SessionStatus};
pub use timeline::{Bookmark, TimelineEvent};
pub use turn::{FindingsBatch, Role, Turn, TurnState};
