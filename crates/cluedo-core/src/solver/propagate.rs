//! Deduction rules applied to a fixpoint after every recorded event.

use core::fmt;

use crate::knowledge::KnowledgeBase;
use crate::model::card::{CardId, Category, CellState, SolutionStatus};
use crate::model::player::PlayerId;

use super::deep_scan::{self, ScanOutcome};

/// How contradictions encountered during deduction are handled.
///
/// Normal play narrates them and keeps the earlier knowledge. Trial runs,
/// used to check a hypothesis, turn them into errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Trial,
}

impl Mode {
    pub const fn is_trial(self) -> bool {
        matches!(self, Mode::Trial)
    }

    // Trials settle quickly or not at all, so they get a tighter cap.
    const fn pass_cap(self) -> usize {
        match self {
            Mode::Trial => 20,
            Mode::Normal => 50,
        }
    }
}

/// Ways a trial run can break. Normal play narrates these instead of
/// returning them.
#[derive(Debug)]
pub enum SolveError {
    Contradiction {
        card: CardId,
        player: Option<PlayerId>,
    },
    HandLimitExceeded {
        player: PlayerId,
        present: usize,
        limit: usize,
    },
    HandUnderflow {
        player: PlayerId,
        possible: usize,
        limit: usize,
    },
    ImpossibleConstraint {
        player: PlayerId,
    },
    NoOwnerFound {
        card: CardId,
    },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Contradiction {
                card,
                player: Some(player),
            } => {
                write!(f, "{card} reported two incompatible ways for {player}")
            }
            SolveError::Contradiction { card, player: None } => {
                write!(f, "{card} cannot both be in the envelope and dealt out")
            }
            SolveError::HandLimitExceeded {
                player,
                present,
                limit,
            } => {
                write!(f, "{player} holds {present} cards with a limit of {limit}")
            }
            SolveError::HandUnderflow {
                player,
                possible,
                limit,
            } => {
                write!(
                    f,
                    "{player} can reach at most {possible} cards with a limit of {limit}"
                )
            }
            SolveError::ImpossibleConstraint { player } => {
                write!(f, "a reveal by {player} has no possible card left")
            }
            SolveError::NoOwnerFound { card } => {
                write!(f, "{card} is dealt out but nobody can hold it")
            }
        }
    }
}

impl std::error::Error for SolveError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagateOutcome {
    pub passes: usize,
    pub changed: bool,
}

/// Runs deduction passes until nothing changes or the pass cap is reached.
/// In normal mode a stalled grid with undecided cells also triggers deep
/// scans until those stop producing facts.
pub fn propagate(kb: &mut KnowledgeBase, mode: Mode) -> Result<PropagateOutcome, SolveError> {
    let start = kb.generation();
    let passes = run_fixpoint(kb, mode)?;
    if !mode.is_trial() {
        while kb.has_unknown_cells() {
            match deep_scan::run_deep_scan(kb) {
                ScanOutcome::Proved { .. } => continue,
                ScanOutcome::Exhausted => break,
            }
        }
    }
    Ok(PropagateOutcome {
        passes,
        changed: kb.generation() != start,
    })
}

pub(crate) fn run_fixpoint(kb: &mut KnowledgeBase, mode: Mode) -> Result<usize, SolveError> {
    let cap = mode.pass_cap();
    let mut passes = 0;
    while passes < cap {
        let before = kb.generation();
        run_pass(kb, mode)?;
        passes += 1;
        if kb.generation() == before {
            break;
        }
    }
    Ok(passes)
}

fn run_pass(kb: &mut KnowledgeBase, mode: Mode) -> Result<(), SolveError> {
    discard_satisfied_constraints(kb);
    balance_hand_counts(kb, mode)?;
    narrow_constraints(kb, mode)?;
    intersect_final_slot(kb, mode)?;
    settle_envelope(kb, mode)?;
    enforce_card_placement(kb, mode)?;
    Ok(())
}

// A reveal answered by a card the player is now known to hold carries no
// information any more.
fn discard_satisfied_constraints(kb: &mut KnowledgeBase) {
    let keep: Vec<bool> = kb
        .constraints()
        .iter()
        .map(|constraint| {
            !constraint
                .cards()
                .iter()
                .any(|&card| kb.cell(card, constraint.player()) == CellState::Present)
        })
        .collect();
    if keep.iter().all(|&flag| flag) {
        return;
    }
    let mut flags = keep.iter();
    kb.constraints_mut()
        .retain(|_| *flags.next().unwrap_or(&true));
    kb.touch();
}

// Per-seat card counting: close a full hand, force an exactly fitting one,
// and flag hands that overflow or can no longer be filled. When a single
// slot stays open, the card filling it has to come from one of the seat's
// outstanding reveals.
fn balance_hand_counts(kb: &mut KnowledgeBase, mode: Mode) -> Result<(), SolveError> {
    for seat in 0..kb.roster().player_count() {
        let player = PlayerId(seat);
        let limit = kb.roster().limit(player);
        let mut present = 0usize;
        let mut unknown: Vec<CardId> = Vec::new();
        for index in 0..kb.universe().card_count() {
            let card = CardId(index);
            match kb.cell(card, player) {
                CellState::Present => present += 1,
                CellState::Unknown => unknown.push(card),
                CellState::Absent => {}
            }
        }

        if present > limit {
            if mode.is_trial() {
                return Err(SolveError::HandLimitExceeded {
                    player,
                    present,
                    limit,
                });
            }
            tracing::warn!(
                target: "cluedo_core::solver",
                player = kb.roster().name(player),
                present,
                limit,
                message = "player holds more cards than the deal allows"
            );
        }

        if present + unknown.len() < limit {
            if mode.is_trial() {
                return Err(SolveError::HandUnderflow {
                    player,
                    possible: present + unknown.len(),
                    limit,
                });
            }
            tracing::warn!(
                target: "cluedo_core::solver",
                player = kb.roster().name(player),
                possible = present + unknown.len(),
                limit,
                message = "player can no longer reach the dealt hand size"
            );
        }

        if present == limit && !unknown.is_empty() {
            for &card in &unknown {
                kb.apply_fact(mode, card, player, CellState::Absent)?;
            }
        }

        if present < limit && !unknown.is_empty() && present + unknown.len() == limit {
            for &card in &unknown {
                kb.apply_fact(mode, card, player, CellState::Present)?;
            }
        }

        if limit.checked_sub(present) == Some(1) {
            let union: Vec<CardId> = kb
                .constraints()
                .iter()
                .filter(|constraint| constraint.player() == player)
                .flat_map(|constraint| constraint.cards().iter().copied())
                .collect();
            if !union.is_empty() {
                for &card in &unknown {
                    if !union.contains(&card) {
                        kb.apply_fact(mode, card, player, CellState::Absent)?;
                    }
                }
            }
        }
    }
    Ok(())
}

// Drop impossible candidates from stored reveals. An emptied reveal is a
// contradiction; a single survivor is a certain holding.
fn narrow_constraints(kb: &mut KnowledgeBase, mode: Mode) -> Result<(), SolveError> {
    let shrunk: Vec<(usize, Vec<CardId>)> = kb
        .constraints()
        .iter()
        .enumerate()
        .filter_map(|(index, constraint)| {
            let possible: Vec<CardId> = constraint
                .cards()
                .iter()
                .copied()
                .filter(|&card| kb.cell(card, constraint.player()) != CellState::Absent)
                .collect();
            (possible.len() < constraint.len()).then_some((index, possible))
        })
        .collect();

    for (index, possible) in shrunk {
        let Some(player) = kb.constraints().get(index).map(|c| c.player()) else {
            continue;
        };
        if possible.is_empty() {
            if mode.is_trial() {
                return Err(SolveError::ImpossibleConstraint { player });
            }
            tracing::warn!(
                target: "cluedo_core::solver",
                player = kb.roster().name(player),
                message = "a recorded reveal has no possible card left"
            );
        }
        kb.constraints_mut().shrink(index, possible);
        kb.touch();
    }

    let forced: Vec<(PlayerId, CardId)> = kb
        .constraints()
        .iter()
        .filter(|constraint| {
            constraint.len() == 1
                && kb.cell(constraint.cards()[0], constraint.player()) != CellState::Present
        })
        .map(|constraint| (constraint.player(), constraint.cards()[0]))
        .collect();
    for (player, card) in forced {
        if !mode.is_trial() {
            tracing::info!(
                target: "cluedo_core::solver",
                rule = "direct",
                player = kb.roster().name(player),
                card = kb.universe().name(card),
                message = "only one candidate from a reveal remains possible"
            );
        }
        kb.apply_fact(mode, card, player, CellState::Present)?;
    }
    Ok(())
}

// With one hand slot open and several outstanding reveals, a card common to
// all of them is the only one that can satisfy every reveal at once.
fn intersect_final_slot(kb: &mut KnowledgeBase, mode: Mode) -> Result<(), SolveError> {
    for seat in 0..kb.roster().player_count() {
        let player = PlayerId(seat);
        let limit = kb.roster().limit(player);
        let present = kb.present_count(player);
        if limit.checked_sub(present) != Some(1) {
            continue;
        }

        let mut sets = kb
            .constraints()
            .iter()
            .filter(|constraint| constraint.player() == player && !constraint.is_empty());
        let Some(first) = sets.next() else { continue };
        let mut intersection: Vec<CardId> = first
            .cards()
            .iter()
            .copied()
            .filter(|&card| kb.cell(card, player) != CellState::Absent)
            .collect();
        let mut involved = 1;
        for constraint in sets {
            intersection.retain(|&card| constraint.contains(card));
            involved += 1;
        }
        if involved < 2 || intersection.len() != 1 {
            continue;
        }

        let card = intersection[0];
        if kb.cell(card, player) == CellState::Present {
            continue;
        }
        if !mode.is_trial() {
            tracing::info!(
                target: "cluedo_core::solver",
                rule = "intersection",
                player = kb.roster().name(player),
                card = kb.universe().name(card),
                message = "every outstanding reveal needs the same card in the last open slot"
            );
        }
        kb.apply_fact(mode, card, player, CellState::Present)?;
    }
    Ok(())
}

// Envelope bookkeeping: a card nobody can hold must be sealed in, and a
// category with every other card accounted for settles on the survivor.
fn settle_envelope(kb: &mut KnowledgeBase, mode: Mode) -> Result<(), SolveError> {
    for index in 0..kb.universe().card_count() {
        let card = CardId(index);
        if kb.solution_status(card) == SolutionStatus::Confirmed {
            continue;
        }
        let nobody = (0..kb.roster().player_count())
            .all(|seat| kb.cell(card, PlayerId(seat)) == CellState::Absent);
        if !nobody {
            continue;
        }
        if !mode.is_trial() {
            tracing::info!(
                target: "cluedo_core::solver",
                rule = "universal_absence",
                card = kb.universe().name(card),
                message = "no player can hold this card, it is in the envelope"
            );
        }
        kb.apply_solution(mode, card, SolutionStatus::Confirmed)?;
    }

    for category in Category::ALL {
        let cards = kb.universe().cards_in(category);
        let total = cards.len();
        let mut eliminated = 0;
        let mut open: Vec<CardId> = Vec::new();
        for &card in cards {
            match kb.solution_status(card) {
                SolutionStatus::Eliminated => eliminated += 1,
                SolutionStatus::Undetermined => open.push(card),
                SolutionStatus::Confirmed => {}
            }
        }
        if eliminated + 1 == total && open.len() == 1 {
            let card = open[0];
            if !mode.is_trial() {
                tracing::info!(
                    target: "cluedo_core::solver",
                    rule = "category_exhaustion",
                    card = kb.universe().name(card),
                    message = "last unaccounted card of its category, it is in the envelope"
                );
            }
            kb.apply_solution(mode, card, SolutionStatus::Confirmed)?;
        }
    }
    Ok(())
}

// Placement closure: a confirmed envelope card rules out its category
// siblings, and a dealt card with a single possible holder sits in that
// hand. A dealt card with no possible holder at all breaks the grid.
fn enforce_card_placement(kb: &mut KnowledgeBase, mode: Mode) -> Result<(), SolveError> {
    for category in Category::ALL {
        let cards: Vec<CardId> = kb.universe().cards_in(category).to_vec();
        let Some(winner) = cards
            .iter()
            .copied()
            .find(|&card| kb.solution_status(card) == SolutionStatus::Confirmed)
        else {
            continue;
        };
        for card in cards {
            if card != winner && kb.solution_status(card) != SolutionStatus::Eliminated {
                kb.apply_solution(mode, card, SolutionStatus::Eliminated)?;
            }
        }
    }

    for index in 0..kb.universe().card_count() {
        let card = CardId(index);
        if kb.solution_status(card) != SolutionStatus::Eliminated || kb.holder_of(card).is_some() {
            continue;
        }
        let owners: Vec<PlayerId> = (0..kb.roster().player_count())
            .map(PlayerId)
            .filter(|&player| kb.cell(card, player) != CellState::Absent)
            .collect();
        match owners.as_slice() {
            [] => {
                if mode.is_trial() {
                    return Err(SolveError::NoOwnerFound { card });
                }
                tracing::warn!(
                    target: "cluedo_core::solver",
                    card = kb.universe().name(card),
                    message = "card is dealt out but nobody can hold it"
                );
            }
            [player] => {
                if !mode.is_trial() {
                    tracing::info!(
                        target: "cluedo_core::solver",
                        rule = "existence",
                        player = kb.roster().name(*player),
                        card = kb.universe().name(card),
                        message = "only one hand can still hold this dealt card"
                    );
                }
                kb.apply_fact(mode, card, *player, CellState::Present)?;
            }
            _ => {}
        }
    }
    Ok(())
}
