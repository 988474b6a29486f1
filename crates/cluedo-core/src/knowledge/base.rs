use std::collections::VecDeque;

use crate::knowledge::constraint::{Constraint, ConstraintStore};
use crate::model::card::{CardId, CellState, Fact, SolutionStatus};
use crate::model::player::{PlayerId, Roster};
use crate::model::universe::Universe;
use crate::solver::{self, Mode, SolveError};

/// What happened to a single asserted fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactOutcome {
    /// The grid learned something new.
    Applied,
    /// The cell already held this value.
    Unchanged,
    /// The report conflicted with settled knowledge and was ignored.
    Rejected,
}

/// What happened to a reported reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOutcome {
    /// The reveal was stored as an open constraint.
    Stored,
    /// Only one candidate was still possible, so it was asserted outright.
    Resolved(CardId),
    /// An identical constraint was already on file.
    Duplicate,
    /// Every candidate was already ruled out for this player.
    Impossible,
}

enum WorkItem {
    Cell {
        card: CardId,
        player: PlayerId,
        state: CellState,
    },
    Solution {
        card: CardId,
        status: SolutionStatus,
    },
}

/// Everything known about one game in progress: the tri-state possession
/// grid, the envelope status per card, and the open reveal constraints.
///
/// Facts only ever move from unknown to settled. Conflicting reports are
/// ignored (and narrated) in normal play; trial mode turns them into errors
/// so a hypothesis can be refuted.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    universe: Universe,
    roster: Roster,
    cells: Vec<CellState>,
    solution: Vec<SolutionStatus>,
    constraints: ConstraintStore,
    generation: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct Checkpoint {
    cells: Vec<CellState>,
    solution: Vec<SolutionStatus>,
    constraints: ConstraintStore,
    generation: u64,
}

impl KnowledgeBase {
    pub fn new(universe: Universe, roster: Roster) -> Self {
        let cells = vec![CellState::Unknown; universe.card_count() * roster.player_count()];
        let solution = vec![SolutionStatus::Undetermined; universe.card_count()];
        Self {
            universe,
            roster,
            cells,
            solution,
            constraints: ConstraintStore::default(),
            generation: 0,
        }
    }

    pub(crate) fn from_parts(
        universe: Universe,
        roster: Roster,
        cells: Vec<CellState>,
        solution: Vec<SolutionStatus>,
        constraints: ConstraintStore,
        generation: u64,
    ) -> Self {
        Self {
            universe,
            roster,
            cells,
            solution,
            constraints,
            generation,
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn constraints(&self) -> &ConstraintStore {
        &self.constraints
    }

    /// Monotonic counter bumped on every recorded change. Cached derived
    /// values stay valid exactly as long as this does not move.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cell(&self, card: CardId, player: PlayerId) -> CellState {
        self.cells[self.cell_index(card, player)]
    }

    pub fn solution_status(&self, card: CardId) -> SolutionStatus {
        self.solution[card.index()]
    }

    pub fn present_count(&self, player: PlayerId) -> usize {
        (0..self.universe.card_count())
            .filter(|&index| self.cell(CardId(index), player) == CellState::Present)
            .count()
    }

    pub fn unknown_cards_for(&self, player: PlayerId) -> Vec<CardId> {
        (0..self.universe.card_count())
            .map(CardId)
            .filter(|&card| self.cell(card, player) == CellState::Unknown)
            .collect()
    }

    /// All undecided cells, cards in id order and seats inside each card.
    pub fn unknown_cells(&self) -> Vec<(CardId, PlayerId)> {
        let mut cells = Vec::new();
        for index in 0..self.universe.card_count() {
            for seat in 0..self.roster.player_count() {
                let (card, player) = (CardId(index), PlayerId(seat));
                if self.cell(card, player) == CellState::Unknown {
                    cells.push((card, player));
                }
            }
        }
        cells
    }

    pub fn has_unknown_cells(&self) -> bool {
        self.cells.contains(&CellState::Unknown)
    }

    pub fn holder_of(&self, card: CardId) -> Option<PlayerId> {
        (0..self.roster.player_count())
            .map(PlayerId)
            .find(|&player| self.cell(card, player) == CellState::Present)
    }

    /// Records that a player does or does not hold a card, cascading the
    /// consequences of a confirmed holding. Conflicting reports leave the
    /// grid untouched. Propagation is not run here; callers decide when.
    pub fn assert_fact(&mut self, card: CardId, player: PlayerId, fact: Fact) -> FactOutcome {
        match self.apply_fact(Mode::Normal, card, player, fact.cell_state()) {
            Ok(outcome) => outcome,
            // Normal mode absorbs conflicts rather than erroring.
            Err(_) => FactOutcome::Rejected,
        }
    }

    /// Records a reveal: `player` showed one of `cards`. Candidates already
    /// ruled out are dropped up front. A single survivor becomes a plain
    /// fact; anything else is stored and propagated.
    pub fn add_constraint(&mut self, player: PlayerId, cards: &[CardId]) -> ConstraintOutcome {
        let possible: Vec<CardId> = cards
            .iter()
            .copied()
            .filter(|&card| {
                self.cell(card, player) != CellState::Absent && !self.held_elsewhere(card, player)
            })
            .collect();

        if possible.is_empty() {
            tracing::warn!(
                target: "cluedo_core::knowledge",
                player = self.roster.name(player),
                message = "reveal contradicts the grid, no candidate card is possible"
            );
            return ConstraintOutcome::Impossible;
        }

        let constraint = Constraint::new(player, possible);
        if constraint.len() == 1 {
            let card = constraint.cards()[0];
            tracing::info!(
                target: "cluedo_core::knowledge",
                player = self.roster.name(player),
                card = self.universe.name(card),
                message = "reveal pins down the shown card"
            );
            self.assert_fact(card, player, Fact::Present);
            return ConstraintOutcome::Resolved(card);
        }

        if self.constraints.contains(&constraint) {
            tracing::debug!(
                target: "cluedo_core::knowledge",
                player = self.roster.name(player),
                message = "reveal already on file"
            );
            return ConstraintOutcome::Duplicate;
        }

        self.constraints.push(constraint);
        self.touch();
        if let Err(error) = solver::propagate(self, Mode::Normal) {
            tracing::error!(
                target: "cluedo_core::solver",
                %error,
                message = "propagation aborted unexpectedly"
            );
        }
        ConstraintOutcome::Stored
    }

    /// Overrides the number of cards a player holds, for tables where the
    /// deal was uneven or a player left.
    pub fn set_hand_limit(&mut self, player: PlayerId, limit: usize) {
        self.roster.set_limit(player, limit);
        self.touch();
    }

    pub(crate) fn apply_fact(
        &mut self,
        mode: Mode,
        card: CardId,
        player: PlayerId,
        state: CellState,
    ) -> Result<FactOutcome, SolveError> {
        debug_assert!(state.is_known());
        let current = self.cell(card, player);
        if current == state {
            return Ok(FactOutcome::Unchanged);
        }
        if current.is_known() {
            self.on_cell_conflict(mode, card, player, current, state)?;
            return Ok(FactOutcome::Rejected);
        }

        self.write_cell(card, player, state);
        let mut queue = VecDeque::new();
        if state == CellState::Present {
            self.enqueue_present_cascade(&mut queue, card, player);
        }
        self.drain(mode, &mut queue)?;
        Ok(FactOutcome::Applied)
    }

    pub(crate) fn apply_solution(
        &mut self,
        mode: Mode,
        card: CardId,
        status: SolutionStatus,
    ) -> Result<FactOutcome, SolveError> {
        debug_assert!(status.is_settled());
        let current = self.solution_status(card);
        if current == status {
            return Ok(FactOutcome::Unchanged);
        }
        if current.is_settled() {
            self.on_solution_conflict(mode, card, current, status)?;
            return Ok(FactOutcome::Rejected);
        }

        self.write_solution(card, status);
        let mut queue = VecDeque::new();
        if status == SolutionStatus::Confirmed {
            self.enqueue_confirmed_cascade(&mut queue, card);
        }
        self.drain(mode, &mut queue)?;
        Ok(FactOutcome::Applied)
    }

    pub(crate) fn constraints_mut(&mut self) -> &mut ConstraintStore {
        &mut self.constraints
    }

    pub(crate) fn touch(&mut self) {
        self.generation += 1;
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            cells: self.cells.clone(),
            solution: self.solution.clone(),
            constraints: self.constraints.clone(),
            generation: self.generation,
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.cells = checkpoint.cells;
        self.solution = checkpoint.solution;
        self.constraints = checkpoint.constraints;
        self.generation = checkpoint.generation;
    }

    pub(crate) fn cells_snapshot(&self) -> Vec<CellState> {
        self.cells.clone()
    }

    pub(crate) fn solution_snapshot(&self) -> Vec<SolutionStatus> {
        self.solution.clone()
    }

    fn cell_index(&self, card: CardId, player: PlayerId) -> usize {
        card.index() * self.roster.player_count() + player.index()
    }

    fn held_elsewhere(&self, card: CardId, player: PlayerId) -> bool {
        (0..self.roster.player_count())
            .map(PlayerId)
            .any(|seat| seat != player && self.cell(card, seat) == CellState::Present)
    }

    fn write_cell(&mut self, card: CardId, player: PlayerId, state: CellState) {
        let index = self.cell_index(card, player);
        self.cells[index] = state;
        self.touch();
    }

    fn write_solution(&mut self, card: CardId, status: SolutionStatus) {
        self.solution[card.index()] = status;
        self.touch();
    }

    fn enqueue_present_cascade(
        &self,
        queue: &mut VecDeque<WorkItem>,
        card: CardId,
        player: PlayerId,
    ) {
        for seat in 0..self.roster.player_count() {
            let other = PlayerId(seat);
            if other != player {
                queue.push_back(WorkItem::Cell {
                    card,
                    player: other,
                    state: CellState::Absent,
                });
            }
        }
        queue.push_back(WorkItem::Solution {
            card,
            status: SolutionStatus::Eliminated,
        });
    }

    fn enqueue_confirmed_cascade(&self, queue: &mut VecDeque<WorkItem>, card: CardId) {
        for &sibling in self.universe.cards_in(self.universe.category(card)) {
            if sibling != card {
                queue.push_back(WorkItem::Solution {
                    card: sibling,
                    status: SolutionStatus::Eliminated,
                });
            }
        }
        for seat in 0..self.roster.player_count() {
            queue.push_back(WorkItem::Cell {
                card,
                player: PlayerId(seat),
                state: CellState::Absent,
            });
        }
    }

    fn drain(&mut self, mode: Mode, queue: &mut VecDeque<WorkItem>) -> Result<(), SolveError> {
        while let Some(item) = queue.pop_front() {
            match item {
                WorkItem::Cell {
                    card,
                    player,
                    state,
                } => {
                    let current = self.cell(card, player);
                    if current == state {
                        continue;
                    }
                    if current.is_known() {
                        self.on_cell_conflict(mode, card, player, current, state)?;
                        continue;
                    }
                    self.write_cell(card, player, state);
                    if state == CellState::Present {
                        self.enqueue_present_cascade(queue, card, player);
                    }
                }
                WorkItem::Solution { card, status } => {
                    let current = self.solution_status(card);
                    if current == status {
                        continue;
                    }
                    if current.is_settled() {
                        self.on_solution_conflict(mode, card, current, status)?;
                        continue;
                    }
                    self.write_solution(card, status);
                    if status == SolutionStatus::Confirmed {
                        self.enqueue_confirmed_cascade(queue, card);
                    }
                }
            }
        }
        Ok(())
    }

    fn on_cell_conflict(
        &self,
        mode: Mode,
        card: CardId,
        player: PlayerId,
        held: CellState,
        told: CellState,
    ) -> Result<(), SolveError> {
        if mode.is_trial() {
            return Err(SolveError::Contradiction {
                card,
                player: Some(player),
            });
        }
        tracing::warn!(
            target: "cluedo_core::knowledge",
            card = self.universe.name(card),
            player = self.roster.name(player),
            held = %held,
            told = %told,
            message = "conflicting report ignored, earlier knowledge wins"
        );
        Ok(())
    }

    fn on_solution_conflict(
        &self,
        mode: Mode,
        card: CardId,
        held: SolutionStatus,
        told: SolutionStatus,
    ) -> Result<(), SolveError> {
        if mode.is_trial() {
            return Err(SolveError::Contradiction { card, player: None });
        }
        tracing::warn!(
            target: "cluedo_core::knowledge",
            card = self.universe.name(card),
            held = %held,
            told = %told,
            message = "conflicting envelope status ignored, earlier knowledge wins"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConstraintOutcome, FactOutcome, KnowledgeBase};
    use crate::model::card::{CardId, CellState, Fact, SolutionStatus};
    use crate::model::player::{PlayerId, Roster};
    use crate::model::universe::Universe;
    use crate::solver::Mode;

    fn three_player_base() -> KnowledgeBase {
        let universe = Universe::reference();
        let names = vec!["Io".to_string(), "A".to_string(), "B".to_string()];
        let roster = Roster::deal(names, universe.dealt_count());
        KnowledgeBase::new(universe, roster)
    }

    fn card(kb: &KnowledgeBase, name: &str) -> CardId {
        kb.universe().lookup(name).unwrap()
    }

    #[test]
    fn present_cascades_to_other_seats_and_envelope() {
        let mut kb = three_player_base();
        let corda = card(&kb, "Corda");
        let outcome = kb.assert_fact(corda, PlayerId(0), Fact::Present);
        assert_eq!(outcome, FactOutcome::Applied);
        assert_eq!(kb.cell(corda, PlayerId(1)), CellState::Absent);
        assert_eq!(kb.cell(corda, PlayerId(2)), CellState::Absent);
        assert_eq!(kb.solution_status(corda), SolutionStatus::Eliminated);
    }

    #[test]
    fn conflicting_report_leaves_grid_untouched() {
        let mut kb = three_player_base();
        let corda = card(&kb, "Corda");
        kb.assert_fact(corda, PlayerId(0), Fact::Present);
        let before = kb.generation();
        let outcome = kb.assert_fact(corda, PlayerId(1), Fact::Present);
        assert_eq!(outcome, FactOutcome::Rejected);
        assert_eq!(kb.cell(corda, PlayerId(1)), CellState::Absent);
        assert_eq!(kb.generation(), before);
    }

    #[test]
    fn repeating_a_fact_changes_nothing() {
        let mut kb = three_player_base();
        let plum = card(&kb, "Plum");
        kb.assert_fact(plum, PlayerId(2), Fact::Absent);
        let before = kb.generation();
        assert_eq!(
            kb.assert_fact(plum, PlayerId(2), Fact::Absent),
            FactOutcome::Unchanged
        );
        assert_eq!(kb.generation(), before);
    }

    #[test]
    fn confirmed_envelope_card_clears_its_row_and_category() {
        let mut kb = three_player_base();
        let chiave = card(&kb, "Chiave");
        let corda = card(&kb, "Corda");
        kb.apply_solution(Mode::Normal, chiave, SolutionStatus::Confirmed)
            .unwrap();
        assert_eq!(kb.solution_status(corda), SolutionStatus::Eliminated);
        for seat in 0..3 {
            assert_eq!(kb.cell(chiave, PlayerId(seat)), CellState::Absent);
        }
    }

    #[test]
    fn reveal_with_single_survivor_is_asserted_outright() {
        let mut kb = three_player_base();
        let corda = card(&kb, "Corda");
        let cucina = card(&kb, "Cucina");
        let mustard = card(&kb, "Mustard");
        kb.assert_fact(corda, PlayerId(0), Fact::Present);
        kb.assert_fact(cucina, PlayerId(0), Fact::Present);
        let outcome = kb.add_constraint(PlayerId(1), &[mustard, corda, cucina]);
        assert_eq!(outcome, ConstraintOutcome::Resolved(mustard));
        assert_eq!(kb.cell(mustard, PlayerId(1)), CellState::Present);
        assert!(kb.constraints().is_empty());
    }

    #[test]
    fn reveal_with_no_survivors_is_impossible() {
        let mut kb = three_player_base();
        let corda = card(&kb, "Corda");
        let cucina = card(&kb, "Cucina");
        kb.assert_fact(corda, PlayerId(0), Fact::Present);
        kb.assert_fact(cucina, PlayerId(0), Fact::Present);
        let outcome = kb.add_constraint(PlayerId(1), &[corda, cucina]);
        assert_eq!(outcome, ConstraintOutcome::Impossible);
        assert!(kb.constraints().is_empty());
    }

    #[test]
    fn duplicate_reveals_are_stored_once() {
        let mut kb = three_player_base();
        let mustard = card(&kb, "Mustard");
        let pugnale = card(&kb, "Pugnale");
        let veranda = card(&kb, "Veranda");
        assert_eq!(
            kb.add_constraint(PlayerId(1), &[mustard, pugnale, veranda]),
            ConstraintOutcome::Stored
        );
        assert_eq!(
            kb.add_constraint(PlayerId(1), &[veranda, mustard, pugnale]),
            ConstraintOutcome::Duplicate
        );
        assert_eq!(kb.constraints().len(), 1);
    }

    #[test]
    fn checkpoint_restore_undoes_trial_writes() {
        let mut kb = three_player_base();
        let plum = card(&kb, "Plum");
        let checkpoint = kb.checkpoint();
        let generation = kb.generation();
        kb.apply_fact(Mode::Trial, plum, PlayerId(1), CellState::Present)
            .unwrap();
        assert_ne!(kb.cell(plum, PlayerId(1)), CellState::Unknown);
        kb.restore(checkpoint);
        assert_eq!(kb.cell(plum, PlayerId(1)), CellState::Unknown);
        assert_eq!(kb.solution_status(plum), SolutionStatus::Undetermined);
        assert_eq!(kb.generation(), generation);
    }

    #[test]
    fn conflicting_envelope_status_is_rejected() {
        let mut kb = three_player_base();
        let corda = card(&kb, "Corda");
        // Holding a card eliminates it from the envelope.
        kb.assert_fact(corda, PlayerId(0), Fact::Present);
        assert_eq!(kb.solution_status(corda), SolutionStatus::Eliminated);

        let outcome = kb
            .apply_solution(Mode::Normal, corda, SolutionStatus::Confirmed)
            .unwrap();
        assert_eq!(outcome, FactOutcome::Rejected);
        assert_eq!(kb.solution_status(corda), SolutionStatus::Eliminated);

        let result = kb.apply_solution(Mode::Trial, corda, SolutionStatus::Confirmed);
        assert!(result.is_err());
    }

    #[test]
    fn trial_mode_turns_conflicts_into_errors() {
        let mut kb = three_player_base();
        let corda = card(&kb, "Corda");
        kb.assert_fact(corda, PlayerId(0), Fact::Present);
        let result = kb.apply_fact(Mode::Trial, corda, PlayerId(1), CellState::Present);
        assert!(result.is_err());
    }

    #[test]
    fn hand_limit_override_moves_the_generation() {
        let mut kb = three_player_base();
        let before = kb.generation();
        kb.set_hand_limit(PlayerId(1), 3);
        assert_eq!(kb.roster().limit(PlayerId(1)), 3);
        assert!(kb.generation() > before);
    }
}
