use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub usize);

impl PlayerId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat {}", self.0)
    }
}

/// The seated players and how many cards each one was dealt. Seat order is
/// the order names were supplied in and doubles as turn order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
    limits: Vec<usize>,
}

impl Roster {
    /// Splits `dealt_cards` evenly across the seats. When the split is not
    /// exact, the earliest seats take one extra card, matching how a deal
    /// going around the table comes out.
    pub fn deal(names: Vec<String>, dealt_cards: usize) -> Self {
        let seats = names.len().max(1);
        let base = dealt_cards / seats;
        let remainder = dealt_cards % seats;
        let limits = (0..names.len())
            .map(|seat| base + usize::from(seat < remainder))
            .collect();
        Self { names, limits }
    }

    pub fn with_limits(names: Vec<String>, limits: Vec<usize>) -> Self {
        Self { names, limits }
    }

    pub fn player_count(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, player: PlayerId) -> &str {
        &self.names[player.index()]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn limit(&self, player: PlayerId) -> usize {
        self.limits[player.index()]
    }

    pub fn limits(&self) -> &[usize] {
        &self.limits
    }

    pub fn set_limit(&mut self, player: PlayerId, limit: usize) {
        self.limits[player.index()] = limit;
    }

    pub fn lookup(&self, name: &str) -> Option<PlayerId> {
        self.names.iter().position(|n| n == name).map(PlayerId)
    }
}
