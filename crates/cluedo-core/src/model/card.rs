use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Category {
    Suspect = 0,
    Weapon = 1,
    Room = 2,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Suspect, Category::Weapon, Category::Room];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Category::Suspect),
            1 => Some(Category::Weapon),
            2 => Some(Category::Room),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Suspect => "suspect",
            Category::Weapon => "weapon",
            Category::Room => "room",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CardId(pub usize);

impl CardId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card {}", self.0)
    }
}

/// What the grid records about one card in one player's hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellState {
    Unknown = 0,
    Absent = 1,
    Present = 2,
}

impl CellState {
    pub const fn is_known(self) -> bool {
        !matches!(self, CellState::Unknown)
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CellState::Unknown => "unknown",
            CellState::Absent => "absent",
            CellState::Present => "present",
        };
        f.write_str(label)
    }
}

/// Whether a card can still be the one sealed in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SolutionStatus {
    Undetermined = 0,
    Eliminated = 1,
    Confirmed = 2,
}

impl SolutionStatus {
    pub const fn is_settled(self) -> bool {
        !matches!(self, SolutionStatus::Undetermined)
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolutionStatus::Undetermined => "undetermined",
            SolutionStatus::Eliminated => "eliminated",
            SolutionStatus::Confirmed => "confirmed",
        };
        f.write_str(label)
    }
}

/// A definite possession report coming from the table: the player either
/// showed the card or made clear they do not hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fact {
    Present,
    Absent,
}

impl Fact {
    pub const fn cell_state(self) -> CellState {
        match self {
            Fact::Present => CellState::Present,
            Fact::Absent => CellState::Absent,
        }
    }
}
