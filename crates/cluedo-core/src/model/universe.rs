use crate::model::card::{CardId, Category};

/// The full set of cards in play, grouped by category. One card per
/// category sits in the envelope; the rest are dealt out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    names: Vec<String>,
    categories: Vec<Category>,
    by_category: [Vec<CardId>; 3],
}

impl Universe {
    pub fn new(suspects: Vec<String>, weapons: Vec<String>, rooms: Vec<String>) -> Self {
        let mut names = Vec::with_capacity(suspects.len() + weapons.len() + rooms.len());
        let mut categories = Vec::with_capacity(names.capacity());
        let mut by_category: [Vec<CardId>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for (category, group) in [
            (Category::Suspect, suspects),
            (Category::Weapon, weapons),
            (Category::Room, rooms),
        ] {
            for name in group {
                let id = CardId(names.len());
                names.push(name);
                categories.push(category);
                by_category[category.index()].push(id);
            }
        }
        Self {
            names,
            categories,
            by_category,
        }
    }

    /// The classic board: six suspects, six weapons, nine rooms.
    pub fn reference() -> Self {
        let suspects = ["Scarlett", "Mustard", "White", "Green", "Peacock", "Plum"];
        let weapons = ["Candeliere", "Pugnale", "Tubo", "Rivoltella", "Corda", "Chiave"];
        let rooms = [
            "Ingresso",
            "Veranda",
            "Pranzo",
            "Cucina",
            "Ballo",
            "Serra",
            "Biliardo",
            "Biblioteca",
            "Studio",
        ];
        Self::new(
            suspects.iter().map(|s| s.to_string()).collect(),
            weapons.iter().map(|s| s.to_string()).collect(),
            rooms.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn card_count(&self) -> usize {
        self.names.len()
    }

    /// Number of cards actually dealt to players: everything except the one
    /// envelope card per category.
    pub fn dealt_count(&self) -> usize {
        self.names.len() - Category::ALL.len()
    }

    pub fn name(&self, card: CardId) -> &str {
        &self.names[card.index()]
    }

    pub fn category(&self, card: CardId) -> Category {
        self.categories[card.index()]
    }

    pub fn cards_in(&self, category: Category) -> &[CardId] {
        &self.by_category[category.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<CardId> {
        self.names.iter().position(|n| n == name).map(CardId)
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Universe};

    #[test]
    fn reference_universe_has_21_cards() {
        let universe = Universe::reference();
        assert_eq!(universe.card_count(), 21);
        assert_eq!(universe.dealt_count(), 18);
        assert_eq!(universe.cards_in(Category::Suspect).len(), 6);
        assert_eq!(universe.cards_in(Category::Weapon).len(), 6);
        assert_eq!(universe.cards_in(Category::Room).len(), 9);
    }

    #[test]
    fn lookup_resolves_names_to_ids() {
        let universe = Universe::reference();
        let corda = universe.lookup("Corda").unwrap();
        assert_eq!(universe.name(corda), "Corda");
        assert_eq!(universe.category(corda), Category::Weapon);
        assert_eq!(universe.lookup("Spanner"), None);
    }

    #[test]
    fn categories_are_contiguous_blocks() {
        let universe = Universe::reference();
        for category in Category::ALL {
            for &card in universe.cards_in(category) {
                assert_eq!(universe.category(card), category);
            }
        }
    }

    #[test]
    fn custom_universes_keep_supplied_sizes() {
        let universe = Universe::new(
            vec!["A".into(), "B".into()],
            vec!["X".into()],
            vec!["R1".into(), "R2".into(), "R3".into()],
        );
        assert_eq!(universe.card_count(), 6);
        assert_eq!(universe.dealt_count(), 3);
        assert_eq!(universe.cards_in(Category::Weapon).len(), 1);
    }
}
