//! Rejection sampling over candidate deals.
//!
//! Deduction only ever records certainties; most game states stay partly
//! open. This sampler draws complete worlds blind (one envelope card per
//! category, the rest dealt into open hand slots), throws away every world
//! that violates a recorded fact, hand limit, or reveal, and tallies the
//! survivors into empirical probabilities. Certain cells are reported
//! exactly and never sampled.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::knowledge::KnowledgeBase;
use crate::model::card::{CardId, Category, CellState, SolutionStatus};
use crate::model::player::PlayerId;

use super::cache::{ReportCache, ReportKey};

/// Circuit breakers for one sampling run. Neither cap aborts anything;
/// running dry just degrades the result to the uniform fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorConfig {
    pub max_attempts: usize,
    pub time_budget: Duration,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20_000,
            time_budget: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SamplingStats {
    pub attempts: usize,
    pub accepted: usize,
    pub rejected_draws: usize,
    pub rejected_deals: usize,
    pub rejected_constraints: usize,
}

/// Empirical probabilities per card: chance of being the envelope card and,
/// per seat, chance of sitting in that hand. Settled cells carry exact
/// 1.0/0.0 values.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityReport {
    solution: Vec<f32>,
    holdings: Vec<f32>,
    seats: usize,
    pub stats: SamplingStats,
    pub degenerate: bool,
    pub fallback: bool,
}

impl ProbabilityReport {
    pub fn solution(&self, card: CardId) -> f32 {
        self.solution[card.index()]
    }

    pub fn holding(&self, card: CardId, player: PlayerId) -> f32 {
        self.holdings[card.index() * self.seats + player.index()]
    }
}

/// Owns the sampling configuration and the cached report. All randomness
/// flows through the caller's generator, so a fixed seed and a generous
/// time budget give reproducible reports.
#[derive(Debug, Default)]
pub struct ProbabilityEstimator {
    config: EstimatorConfig,
    cache: ReportCache,
}

impl ProbabilityEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            cache: ReportCache::default(),
        }
    }

    pub fn config(&self) -> EstimatorConfig {
        self.config
    }

    /// Returns probabilities for the current knowledge, sampling fresh
    /// worlds only when the knowledge has changed since the cached run.
    pub fn estimate<R: Rng + ?Sized>(
        &mut self,
        kb: &KnowledgeBase,
        min_valid_samples: usize,
        rng: &mut R,
    ) -> &ProbabilityReport {
        let key = ReportKey::new(kb.generation(), min_valid_samples);
        let report = match self.cache.take_if(key) {
            Some(report) => report,
            None => build_report(kb, self.config, min_valid_samples, rng),
        };
        self.cache.store(key, report)
    }
}

fn build_report<R: Rng + ?Sized>(
    kb: &KnowledgeBase,
    config: EstimatorConfig,
    min_valid: usize,
    rng: &mut R,
) -> ProbabilityReport {
    let cards = kb.universe().card_count();
    let seats = kb.roster().player_count();

    let candidates: Vec<Vec<CardId>> = Category::ALL
        .iter()
        .map(|&category| {
            kb.universe()
                .cards_in(category)
                .iter()
                .copied()
                .filter(|&card| kb.solution_status(card) != SolutionStatus::Eliminated)
                .collect()
        })
        .collect();
    if candidates.iter().any(Vec::is_empty) {
        tracing::warn!(
            target: "cluedo_core::prob",
            message = "a category has no envelope candidate left, knowledge is contradictory"
        );
        return degenerate_report(kb);
    }

    let holders: Vec<Option<PlayerId>> = (0..cards).map(|index| kb.holder_of(CardId(index))).collect();
    let placed = holders.iter().filter(|holder| holder.is_some()).count();
    let open_slots: Vec<usize> = (0..seats)
        .map(|seat| {
            let player = PlayerId(seat);
            kb.roster()
                .limit(player)
                .saturating_sub(kb.present_count(player))
        })
        .collect();
    let slot_total: usize = open_slots.iter().sum();

    let mut stats = SamplingStats::default();

    // A deal only closes when the undealt cards exactly fill the open
    // slots; anything else means the limits no longer match the grid and
    // no sampled world can be valid.
    let dealable = cards.saturating_sub(Category::ALL.len() + placed);
    if dealable == slot_total {
        let mut solution_tallies = vec![0u32; cards];
        let mut holding_tallies = vec![0u32; cards * seats];
        let deadline = Instant::now() + config.time_budget;

        while stats.accepted < min_valid
            && stats.attempts < config.max_attempts
            && Instant::now() < deadline
        {
            stats.attempts += 1;

            let drawn: Vec<CardId> = candidates
                .iter()
                .map(|set| set[rng.gen_range(0..set.len())])
                .collect();
            if drawn.iter().any(|&card| holders[card.index()].is_some()) {
                stats.rejected_draws += 1;
                continue;
            }

            let pool: Vec<CardId> = (0..cards)
                .map(CardId)
                .filter(|card| holders[card.index()].is_none() && !drawn.contains(card))
                .collect();
            let unassignable = pool.iter().any(|&card| {
                (0..seats).all(|seat| kb.cell(card, PlayerId(seat)) == CellState::Absent)
            });
            if unassignable {
                stats.rejected_draws += 1;
                continue;
            }

            let Some(dealt) = deal_hands(kb, &pool, &open_slots, rng) else {
                stats.rejected_deals += 1;
                continue;
            };
            if !constraints_hold(kb, &holders, &dealt) {
                stats.rejected_constraints += 1;
                continue;
            }

            for &card in &drawn {
                solution_tallies[card.index()] += 1;
            }
            for &(card, player) in &dealt {
                holding_tallies[card.index() * seats + player.index()] += 1;
            }
            stats.accepted += 1;
        }

        if stats.accepted > 0 {
            return normalized_report(kb, stats, &solution_tallies, &holding_tallies);
        }
    }

    tracing::debug!(
        target: "cluedo_core::prob",
        attempts = stats.attempts,
        message = "no world survived sampling, falling back to uniform estimates"
    );
    fallback_report(kb, stats)
}

/// Deals the pool into the open slots, seat by seat, drawing uniformly
/// among the cards a seat could still hold. Returns `None` when a seat has
/// no feasible card left or the pool does not come out empty.
fn deal_hands<R: Rng + ?Sized>(
    kb: &KnowledgeBase,
    pool: &[CardId],
    open_slots: &[usize],
    rng: &mut R,
) -> Option<Vec<(CardId, PlayerId)>> {
    let mut remaining = pool.to_vec();
    let mut dealt = Vec::with_capacity(pool.len());
    for (seat, &slots) in open_slots.iter().enumerate() {
        let player = PlayerId(seat);
        for _ in 0..slots {
            let feasible: Vec<usize> = remaining
                .iter()
                .enumerate()
                .filter(|&(_, &card)| kb.cell(card, player) != CellState::Absent)
                .map(|(index, _)| index)
                .collect();
            if feasible.is_empty() {
                return None;
            }
            let pick = feasible[rng.gen_range(0..feasible.len())];
            dealt.push((remaining.swap_remove(pick), player));
        }
    }
    remaining.is_empty().then_some(dealt)
}

fn constraints_hold(
    kb: &KnowledgeBase,
    holders: &[Option<PlayerId>],
    dealt: &[(CardId, PlayerId)],
) -> bool {
    kb.constraints().iter().all(|constraint| {
        constraint.cards().iter().any(|&card| {
            holders[card.index()] == Some(constraint.player())
                || dealt.contains(&(card, constraint.player()))
        })
    })
}

fn normalized_report(
    kb: &KnowledgeBase,
    stats: SamplingStats,
    solution_tallies: &[u32],
    holding_tallies: &[u32],
) -> ProbabilityReport {
    let cards = kb.universe().card_count();
    let seats = kb.roster().player_count();
    let accepted = stats.accepted as f32;
    let mut solution = vec![0.0_f32; cards];
    let mut holdings = vec![0.0_f32; cards * seats];
    for index in 0..cards {
        let card = CardId(index);
        solution[index] = match kb.solution_status(card) {
            SolutionStatus::Confirmed => 1.0,
            SolutionStatus::Eliminated => 0.0,
            SolutionStatus::Undetermined => solution_tallies[index] as f32 / accepted,
        };
        for seat in 0..seats {
            let cell = index * seats + seat;
            holdings[cell] = match kb.cell(card, PlayerId(seat)) {
                CellState::Present => 1.0,
                CellState::Absent => 0.0,
                CellState::Unknown => holding_tallies[cell] as f32 / accepted,
            };
        }
    }
    tracing::debug!(
        target: "cluedo_core::prob",
        attempts = stats.attempts,
        accepted = stats.accepted,
        message = "sampling complete"
    );
    ProbabilityReport {
        solution,
        holdings,
        seats,
        stats,
        degenerate: false,
        fallback: false,
    }
}

// Exact values for everything already settled, zeros for the rest. Used
// when a category has no candidate left and sampling has nothing to draw.
fn degenerate_report(kb: &KnowledgeBase) -> ProbabilityReport {
    let cards = kb.universe().card_count();
    let seats = kb.roster().player_count();
    let mut solution = vec![0.0_f32; cards];
    let mut holdings = vec![0.0_f32; cards * seats];
    for index in 0..cards {
        let card = CardId(index);
        if kb.solution_status(card) == SolutionStatus::Confirmed {
            solution[index] = 1.0;
        }
        for seat in 0..seats {
            if kb.cell(card, PlayerId(seat)) == CellState::Present {
                holdings[index * seats + seat] = 1.0;
            }
        }
    }
    ProbabilityReport {
        solution,
        holdings,
        seats,
        stats: SamplingStats::default(),
        degenerate: true,
        fallback: false,
    }
}

// When no sampled world survives the budget, spread each unplaced card
// uniformly over its structurally possible destinations: the seats whose
// cell is not ruled out, plus the envelope while the card is not
// eliminated. Every cell keeps an estimate.
fn fallback_report(kb: &KnowledgeBase, stats: SamplingStats) -> ProbabilityReport {
    let cards = kb.universe().card_count();
    let seats = kb.roster().player_count();
    let mut solution = vec![0.0_f32; cards];
    let mut holdings = vec![0.0_f32; cards * seats];
    for index in 0..cards {
        let card = CardId(index);
        if let Some(holder) = kb.holder_of(card) {
            holdings[index * seats + holder.index()] = 1.0;
            continue;
        }
        let status = kb.solution_status(card);
        if status == SolutionStatus::Confirmed {
            solution[index] = 1.0;
            continue;
        }
        let feasible: Vec<usize> = (0..seats)
            .filter(|&seat| kb.cell(card, PlayerId(seat)) != CellState::Absent)
            .collect();
        let envelope = status == SolutionStatus::Undetermined;
        let options = feasible.len() + usize::from(envelope);
        if options == 0 {
            // Contradictory row; there is nothing sensible to report.
            continue;
        }
        let share = 1.0 / options as f32;
        if envelope {
            solution[index] = share;
        }
        for seat in feasible {
            holdings[index * seats + seat] = share;
        }
    }
    ProbabilityReport {
        solution,
        holdings,
        seats,
        stats,
        degenerate: false,
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::{EstimatorConfig, ProbabilityEstimator};
    use crate::knowledge::KnowledgeBase;
    use crate::model::card::{CardId, Fact};
    use crate::model::player::{PlayerId, Roster};
    use crate::model::universe::Universe;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::time::Duration;

    const EPSILON: f32 = 1e-6;

    fn three_player_base() -> KnowledgeBase {
        let universe = Universe::reference();
        let names = vec!["Io".to_string(), "A".to_string(), "B".to_string()];
        let roster = Roster::deal(names, universe.dealt_count());
        KnowledgeBase::new(universe, roster)
    }

    fn card(kb: &KnowledgeBase, name: &str) -> CardId {
        kb.universe().lookup(name).unwrap()
    }

    fn patient_config() -> EstimatorConfig {
        EstimatorConfig {
            max_attempts: 50_000,
            time_budget: Duration::from_secs(60),
        }
    }

    fn hand_of_three(kb: &mut KnowledgeBase) {
        for name in ["Scarlett", "Corda", "Cucina"] {
            let held = card(kb, name);
            kb.assert_fact(held, PlayerId(0), Fact::Present);
        }
    }

    #[test]
    fn deterministic_with_fixed_seed() {
        let mut kb = three_player_base();
        hand_of_three(&mut kb);
        let white = card(&kb, "White");
        kb.assert_fact(white, PlayerId(2), Fact::Absent);

        let mut first = ProbabilityEstimator::new(patient_config());
        let mut second = ProbabilityEstimator::new(patient_config());
        let mut rng_a = SmallRng::seed_from_u64(123);
        let mut rng_b = SmallRng::seed_from_u64(123);

        let report_a = first.estimate(&kb, 200, &mut rng_a).clone();
        let report_b = second.estimate(&kb, 200, &mut rng_b).clone();
        assert_eq!(report_a, report_b);
        assert_eq!(report_a.stats.accepted, 200);
    }

    #[test]
    fn certain_cells_are_reported_exactly() {
        let mut kb = three_player_base();
        hand_of_three(&mut kb);
        let corda = card(&kb, "Corda");
        let white = card(&kb, "White");
        kb.assert_fact(white, PlayerId(2), Fact::Absent);

        let mut estimator = ProbabilityEstimator::new(patient_config());
        let mut rng = SmallRng::seed_from_u64(7);
        let report = estimator.estimate(&kb, 200, &mut rng);

        assert_eq!(report.holding(corda, PlayerId(0)), 1.0);
        assert_eq!(report.holding(corda, PlayerId(1)), 0.0);
        assert_eq!(report.solution(corda), 0.0);
        assert_eq!(report.holding(white, PlayerId(2)), 0.0);
        assert!(report.solution(white) > 0.0);
    }

    #[test]
    fn cache_survives_reseeding_until_knowledge_changes() {
        let mut kb = three_player_base();
        hand_of_three(&mut kb);

        let mut estimator = ProbabilityEstimator::new(patient_config());
        let mut rng = SmallRng::seed_from_u64(1);
        let first = estimator.estimate(&kb, 150, &mut rng).clone();

        // A different generator cannot disturb a cached report.
        let mut other_rng = SmallRng::seed_from_u64(999);
        let second = estimator.estimate(&kb, 150, &mut other_rng).clone();
        assert_eq!(first, second);

        let plum = card(&kb, "Plum");
        kb.assert_fact(plum, PlayerId(1), Fact::Present);
        let refreshed = estimator.estimate(&kb, 150, &mut other_rng);
        assert_eq!(refreshed.holding(plum, PlayerId(1)), 1.0);
    }

    #[test]
    fn degenerate_when_a_category_has_no_candidate() {
        let mut kb = three_player_base();
        // Every weapon lands in a hand, so each is eliminated and nothing
        // can be drawn for the weapon slot.
        for (index, name) in ["Candeliere", "Pugnale", "Tubo", "Rivoltella", "Corda", "Chiave"]
            .iter()
            .enumerate()
        {
            let weapon = card(&kb, name);
            kb.assert_fact(weapon, PlayerId(index % 3), Fact::Present);
        }
        let chiave = card(&kb, "Chiave");
        let candeliere = card(&kb, "Candeliere");

        let mut estimator = ProbabilityEstimator::new(patient_config());
        let mut rng = SmallRng::seed_from_u64(3);
        let report = estimator.estimate(&kb, 100, &mut rng);

        assert!(report.degenerate);
        assert_eq!(report.stats.attempts, 0);
        assert_eq!(report.solution(chiave), 0.0);
        assert_eq!(report.holding(candeliere, PlayerId(0)), 1.0);
    }

    #[test]
    fn exhausted_budget_falls_back_to_uniform() {
        let kb = three_player_base();
        let config = EstimatorConfig {
            max_attempts: 0,
            time_budget: Duration::from_secs(60),
        };
        let mut estimator = ProbabilityEstimator::new(config);
        let mut rng = SmallRng::seed_from_u64(5);
        let report = estimator.estimate(&kb, 100, &mut rng);

        assert!(report.fallback);
        // A fresh grid leaves four destinations per card: three seats and
        // the envelope.
        let scarlett = CardId(0);
        assert!((report.solution(scarlett) - 0.25).abs() < EPSILON);
        assert!((report.holding(scarlett, PlayerId(1)) - 0.25).abs() < EPSILON);
    }
}
