use crate::model::card::CardId;
use crate::model::player::PlayerId;

/// "This player showed one of these cards." Candidates are kept sorted and
/// deduplicated so two reports of the same reveal compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    player: PlayerId,
    cards: Vec<CardId>,
}

impl Constraint {
    pub fn new(player: PlayerId, mut cards: Vec<CardId>) -> Self {
        cards.sort_unstable();
        cards.dedup();
        Self { player, cards }
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn cards(&self) -> &[CardId] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, card: CardId) -> bool {
        self.cards.binary_search(&card).is_ok()
    }

    // Used when narrowing has ruled candidates out. The replacement is a
    // filtered subset, so it is already sorted.
    pub(crate) fn shrink_to(&mut self, cards: Vec<CardId>) {
        self.cards = cards;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintStore {
    items: Vec<Constraint>,
}

impl ConstraintStore {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Constraint> {
        self.items.get(index)
    }

    pub fn contains(&self, constraint: &Constraint) -> bool {
        self.items.iter().any(|existing| existing == constraint)
    }

    pub(crate) fn push(&mut self, constraint: Constraint) {
        self.items.push(constraint);
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&Constraint) -> bool) {
        self.items.retain(keep);
    }

    pub(crate) fn shrink(&mut self, index: usize, cards: Vec<CardId>) {
        if let Some(constraint) = self.items.get_mut(index) {
            constraint.shrink_to(cards);
        }
    }
}
