//! Proof by contradiction over the cells propagation left open.
//!
//! Each undecided cell is hypothesized to be a holding on a scratch copy of
//! the knowledge. A hypothesis whose consequences break the grid proves the
//! opposite fact for real; one that merely survives proves nothing.

use crate::knowledge::KnowledgeBase;
use crate::model::card::{CardId, CellState, Fact};
use crate::model::player::PlayerId;

use super::propagate::{Mode, SolveError, propagate, run_fixpoint};

/// Result of one scan round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// One hypothesis failed; its negation is now recorded and propagated.
    Proved { card: CardId, player: PlayerId },
    /// Every hypothesis survived; the grid is consistent as it stands.
    Exhausted,
}

/// Tries every undecided cell as a hypothetical holding, stopping at the
/// first disproof. At most one new fact is recorded per call, after which
/// the regular rules run again on the enlarged knowledge.
pub fn run_deep_scan(kb: &mut KnowledgeBase) -> ScanOutcome {
    let candidates = kb.unknown_cells();
    tracing::debug!(
        target: "cluedo_core::deep_scan",
        cells = candidates.len(),
        message = "scanning undecided cells for forced facts"
    );
    for (card, player) in candidates {
        let checkpoint = kb.checkpoint();
        let verdict = hypothesize(kb, card, player);
        kb.restore(checkpoint);
        let Err(error) = verdict else { continue };
        tracing::info!(
            target: "cluedo_core::deep_scan",
            card = kb.universe().name(card),
            player = kb.roster().name(player),
            %error,
            message = "hypothesis breaks the grid, so the card is not there"
        );
        kb.assert_fact(card, player, Fact::Absent);
        if let Err(error) = run_fixpoint(kb, Mode::Normal) {
            tracing::error!(
                target: "cluedo_core::solver",
                %error,
                message = "propagation aborted unexpectedly"
            );
        }
        return ScanOutcome::Proved { card, player };
    }
    ScanOutcome::Exhausted
}

fn hypothesize(kb: &mut KnowledgeBase, card: CardId, player: PlayerId) -> Result<(), SolveError> {
    kb.apply_fact(Mode::Trial, card, player, CellState::Present)?;
    propagate(kb, Mode::Trial)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ScanOutcome, run_deep_scan};
    use crate::knowledge::KnowledgeBase;
    use crate::model::card::{CardId, CellState, Fact};
    use crate::model::player::{PlayerId, Roster};
    use crate::model::universe::Universe;

    fn tiny_base(limits: &[usize]) -> KnowledgeBase {
        // Two suspects, two weapons, three rooms: seven cards, four dealt.
        let universe = Universe::new(
            vec!["S1".into(), "S2".into()],
            vec!["W1".into(), "W2".into()],
            vec!["R1".into(), "R2".into(), "R3".into()],
        );
        let names = (0..limits.len()).map(|i| format!("P{i}")).collect();
        let roster = Roster::with_limits(names, limits.to_vec());
        KnowledgeBase::new(universe, roster)
    }

    fn card(kb: &KnowledgeBase, name: &str) -> CardId {
        kb.universe().lookup(name).unwrap()
    }

    #[test]
    fn consistent_grid_exhausts_without_new_facts() {
        let mut kb = tiny_base(&[2, 2]);
        let generation = kb.generation();
        assert_eq!(run_deep_scan(&mut kb), ScanOutcome::Exhausted);
        assert_eq!(kb.generation(), generation);
    }

    #[test]
    fn scan_restores_state_before_asserting() {
        let mut kb = tiny_base(&[2, 2]);
        let s1 = card(&kb, "S1");
        let r1 = card(&kb, "R1");
        let r2 = card(&kb, "R2");
        kb.assert_fact(s1, PlayerId(0), Fact::Present);
        kb.add_constraint(PlayerId(0), &[r1, r2]);
        // The reveal must still be open: a refuted trial may not leak the
        // facts derived while testing the hypothesis.
        assert_eq!(kb.cell(r1, PlayerId(0)), CellState::Unknown);
        assert_eq!(kb.cell(r2, PlayerId(0)), CellState::Unknown);
        assert_eq!(kb.constraints().len(), 1);
    }
}
