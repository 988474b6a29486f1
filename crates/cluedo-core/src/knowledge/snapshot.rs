use core::fmt;

use serde::{Deserialize, Serialize};

use crate::knowledge::base::KnowledgeBase;
use crate::knowledge::constraint::{Constraint, ConstraintStore};
use crate::model::card::{Category, CellState, SolutionStatus};
use crate::model::player::Roster;
use crate::model::universe::Universe;

/// Serializable image of a [`KnowledgeBase`], used for persistence and for
/// replay-style undo in embedding applications. Cards and players are
/// referenced by name so saves survive reordering of internal ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeSnapshot {
    pub suspects: Vec<String>,
    pub weapons: Vec<String>,
    pub rooms: Vec<String>,
    pub players: Vec<String>,
    pub limits: Vec<usize>,
    pub cells: Vec<CellState>,
    pub solution: Vec<SolutionStatus>,
    pub constraints: Vec<SnapshotConstraint>,
    pub generation: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotConstraint {
    pub player: String,
    pub cards: Vec<String>,
}

impl KnowledgeSnapshot {
    pub fn capture(kb: &KnowledgeBase) -> Self {
        let constraints = kb
            .constraints()
            .iter()
            .map(|constraint| SnapshotConstraint {
                player: kb.roster().name(constraint.player()).to_string(),
                cards: constraint
                    .cards()
                    .iter()
                    .map(|&card| kb.universe().name(card).to_string())
                    .collect(),
            })
            .collect();
        KnowledgeSnapshot {
            suspects: category_names(kb, Category::Suspect),
            weapons: category_names(kb, Category::Weapon),
            rooms: category_names(kb, Category::Room),
            players: kb.roster().names().to_vec(),
            limits: kb.roster().limits().to_vec(),
            cells: kb.cells_snapshot(),
            solution: kb.solution_snapshot(),
            constraints,
            generation: kb.generation(),
        }
    }

    pub fn restore(self) -> Result<KnowledgeBase, SnapshotError> {
        let universe = Universe::new(self.suspects, self.weapons, self.rooms);
        if self.limits.len() != self.players.len() {
            return Err(SnapshotError::LimitCount {
                expected: self.players.len(),
                found: self.limits.len(),
            });
        }
        let roster = Roster::with_limits(self.players, self.limits);

        let expected_cells = universe.card_count() * roster.player_count();
        if self.cells.len() != expected_cells {
            return Err(SnapshotError::GridSize {
                expected: expected_cells,
                found: self.cells.len(),
            });
        }
        if self.solution.len() != universe.card_count() {
            return Err(SnapshotError::SolutionSize {
                expected: universe.card_count(),
                found: self.solution.len(),
            });
        }

        let mut store = ConstraintStore::default();
        for entry in self.constraints {
            let Some(player) = roster.lookup(&entry.player) else {
                return Err(SnapshotError::UnknownPlayer { name: entry.player });
            };
            let mut cards = Vec::with_capacity(entry.cards.len());
            for name in entry.cards {
                let Some(card) = universe.lookup(&name) else {
                    return Err(SnapshotError::UnknownCard { name });
                };
                cards.push(card);
            }
            store.push(Constraint::new(player, cards));
        }

        Ok(KnowledgeBase::from_parts(
            universe,
            roster,
            self.cells,
            self.solution,
            store,
            self.generation,
        ))
    }

    pub fn to_json(kb: &KnowledgeBase) -> serde_json::Result<String> {
        let snapshot = Self::capture(kb);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn category_names(kb: &KnowledgeBase, category: Category) -> Vec<String> {
    kb.universe()
        .cards_in(category)
        .iter()
        .map(|&card| kb.universe().name(card).to_string())
        .collect()
}

/// Ways a saved snapshot can fail to describe a coherent knowledge base.
#[derive(Debug)]
pub enum SnapshotError {
    LimitCount { expected: usize, found: usize },
    GridSize { expected: usize, found: usize },
    SolutionSize { expected: usize, found: usize },
    UnknownPlayer { name: String },
    UnknownCard { name: String },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::LimitCount { expected, found } => {
                write!(f, "{found} hand limits for {expected} players")
            }
            SnapshotError::GridSize { expected, found } => {
                write!(f, "grid has {found} cells, expected {expected}")
            }
            SnapshotError::SolutionSize { expected, found } => {
                write!(f, "solution column has {found} entries, expected {expected}")
            }
            SnapshotError::UnknownPlayer { name } => {
                write!(f, "constraint references unknown player {name:?}")
            }
            SnapshotError::UnknownCard { name } => {
                write!(f, "constraint references unknown card {name:?}")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

#[cfg(test)]
mod tests {
    use super::{KnowledgeSnapshot, SnapshotError};
    use crate::knowledge::base::KnowledgeBase;
    use crate::model::card::Fact;
    use crate::model::player::{PlayerId, Roster};
    use crate::model::universe::Universe;

    fn sample_base() -> KnowledgeBase {
        let universe = Universe::reference();
        let names = vec!["Io".to_string(), "A".to_string(), "B".to_string()];
        let roster = Roster::deal(names, universe.dealt_count());
        KnowledgeBase::new(universe, roster)
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut kb = sample_base();
        let corda = kb.universe().lookup("Corda").unwrap();
        kb.assert_fact(corda, PlayerId(0), Fact::Present);
        let json = KnowledgeSnapshot::to_json(&kb).unwrap();
        assert!(json.contains("\"suspects\""));
        assert!(json.contains("\"Corda\""));
        assert!(json.contains("\"Present\""));
        assert!(json.contains("\"generation\""));
    }

    #[test]
    fn snapshot_roundtrip_preserves_the_whole_state() {
        let mut kb = sample_base();
        let corda = kb.universe().lookup("Corda").unwrap();
        let mustard = kb.universe().lookup("Mustard").unwrap();
        let veranda = kb.universe().lookup("Veranda").unwrap();
        kb.assert_fact(corda, PlayerId(0), Fact::Present);
        kb.add_constraint(PlayerId(1), &[mustard, veranda]);

        let snapshot = KnowledgeSnapshot::capture(&kb);
        let restored = snapshot.clone().restore().unwrap();
        assert_eq!(KnowledgeSnapshot::capture(&restored), snapshot);
        assert_eq!(restored.generation(), kb.generation());
    }

    #[test]
    fn json_roundtrip_survives_unknown_fields() {
        let legacy = r#"{
            "suspects": ["S"],
            "weapons": ["W"],
            "rooms": ["R"],
            "players": ["Io"],
            "limits": [0],
            "cells": ["Unknown", "Absent", "Unknown"],
            "solution": ["Undetermined", "Undetermined", "Confirmed"],
            "constraints": [],
            "generation": 4,
            "ui_theme": "dark"
        }"#;
        let snapshot = KnowledgeSnapshot::from_json(legacy).unwrap();
        assert_eq!(snapshot.generation, 4);
        let kb = snapshot.restore().unwrap();
        assert_eq!(kb.universe().card_count(), 3);
    }

    #[test]
    fn restore_rejects_mismatched_grid() {
        let kb = sample_base();
        let mut snapshot = KnowledgeSnapshot::capture(&kb);
        snapshot.cells.pop();
        assert!(matches!(
            snapshot.restore(),
            Err(SnapshotError::GridSize { .. })
        ));
    }

    #[test]
    fn restore_rejects_dangling_names() {
        let kb = sample_base();
        let mut snapshot = KnowledgeSnapshot::capture(&kb);
        snapshot.constraints.push(super::SnapshotConstraint {
            player: "A".to_string(),
            cards: vec!["Spanner".to_string()],
        });
        assert!(matches!(
            snapshot.restore(),
            Err(SnapshotError::UnknownCard { .. })
        ));
    }
}
