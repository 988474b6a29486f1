//! Static description of a game: cards, categories, and seated players.

pub mod card;
pub mod player;
pub mod universe;

pub use card::{CardId, Category, CellState, Fact, SolutionStatus};
pub use player::{PlayerId, Roster};
pub use universe::Universe;
