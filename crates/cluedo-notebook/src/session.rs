//! Turn-by-turn recording of what happens at the table.

use core::fmt;

use cluedo_core::knowledge::{ConstraintOutcome, KnowledgeBase};
use cluedo_core::model::{CardId, Category, Fact, PlayerId};
use cluedo_core::solver::{self, Mode};

/// One suggestion as seen from our seat: who asked which triple, who
/// answered (if anyone), and the shown card when we got to see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub asker: PlayerId,
    pub suspect: CardId,
    pub weapon: CardId,
    pub room: CardId,
    /// The first seat after the asker that could answer; `None` when the
    /// question went all the way around.
    pub responder: Option<PlayerId>,
    /// The card the responder showed. Only we ever see one, and only for
    /// our own suggestions.
    pub shown: Option<CardId>,
}

impl Suggestion {
    fn asked(&self) -> [CardId; 3] {
        [self.suspect, self.weapon, self.room]
    }
}

/// What a recorded suggestion taught the notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Seats that passed, now known to hold none of the asked cards.
    pub passed: Vec<PlayerId>,
    pub response: ResponseRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseRecord {
    /// The whole table passed.
    Nobody,
    /// The responder showed us this card.
    Seen(CardId),
    /// The responder showed a card we could not see; recorded as a
    /// constraint over the asked triple.
    Disjunction(ConstraintOutcome),
    /// We were the responder; our own hand is already on the grid.
    OwnAnswer,
}

/// Ways a reported suggestion can be malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnError {
    /// Asker and responder are the same seat.
    AskerAnswered { seat: PlayerId },
    /// A card sits in the wrong slot of the triple.
    WrongCategory { card: CardId, expected: Category },
    /// A shown card that was not part of the question.
    ShownNotAsked { card: CardId },
    /// A shown card on a suggestion we could not have seen resolved.
    ShownNotSeen { card: CardId },
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::AskerAnswered { seat } => {
                write!(f, "{seat} cannot answer their own suggestion")
            }
            TurnError::WrongCategory { card, expected } => {
                write!(f, "{card} is not in the {expected} slot of the triple")
            }
            TurnError::ShownNotAsked { card } => {
                write!(f, "shown {card} was not part of the suggestion")
            }
            TurnError::ShownNotSeen { card } => {
                write!(f, "{card} cannot have been shown to us on this turn")
            }
        }
    }
}

impl std::error::Error for TurnError {}

/// The running notebook: the knowledge base plus our own seat.
///
/// Events are interpreted here and turned into grid facts and constraints;
/// every recording ends with one normal propagation so the grid is always
/// caught up with what the table has shown.
#[derive(Debug, Clone)]
pub struct Session {
    kb: KnowledgeBase,
    me: PlayerId,
}

impl Session {
    pub fn new(kb: KnowledgeBase, me: PlayerId) -> Self {
        Self { kb, me }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn me(&self) -> PlayerId {
        self.me
    }

    pub fn into_knowledge(self) -> KnowledgeBase {
        self.kb
    }

    /// Records a full dealt hand, ours during setup or another player's
    /// when it becomes public.
    pub fn record_hand(&mut self, player: PlayerId, cards: &[CardId]) {
        for &card in cards {
            self.kb.assert_fact(card, player, Fact::Present);
        }
        self.run_propagation();
    }

    /// Records a card shown to us outside a suggestion.
    pub fn record_reveal(&mut self, player: PlayerId, card: CardId) {
        tracing::info!(
            target: "cluedo_notebook::turns",
            player = self.kb.roster().name(player),
            card = self.kb.universe().name(card),
            message = "card revealed in private"
        );
        self.kb.assert_fact(card, player, Fact::Present);
        self.run_propagation();
    }

    /// Records one suggestion going around the table.
    ///
    /// Every seat between the asker and the responder passed and gets
    /// `Absent` on all three asked cards; when nobody answered, the whole
    /// table (asker excluded) passed. The asker is never marked, a player
    /// may ask about cards in their own hand. The answer itself lands as a
    /// plain fact when we saw the card and as a constraint otherwise.
    pub fn record_suggestion(&mut self, suggestion: Suggestion) -> Result<TurnReport, TurnError> {
        self.validate(&suggestion)?;
        tracing::info!(
            target: "cluedo_notebook::turns",
            asker = self.kb.roster().name(suggestion.asker),
            suspect = self.kb.universe().name(suggestion.suspect),
            weapon = self.kb.universe().name(suggestion.weapon),
            room = self.kb.universe().name(suggestion.room),
            message = "suggestion made"
        );

        let asked = suggestion.asked();
        let passed = self.walk_passes(&suggestion, &asked);
        let response = self.record_response(&suggestion, &asked);
        self.run_propagation();
        Ok(TurnReport { passed, response })
    }

    fn validate(&self, suggestion: &Suggestion) -> Result<(), TurnError> {
        if suggestion.responder == Some(suggestion.asker) {
            return Err(TurnError::AskerAnswered {
                seat: suggestion.asker,
            });
        }
        let slots = [
            (suggestion.suspect, Category::Suspect),
            (suggestion.weapon, Category::Weapon),
            (suggestion.room, Category::Room),
        ];
        for (card, expected) in slots {
            if self.kb.universe().category(card) != expected {
                return Err(TurnError::WrongCategory { card, expected });
            }
        }
        if let Some(card) = suggestion.shown {
            let seen = suggestion.asker == self.me
                && suggestion.responder.is_some_and(|seat| seat != self.me);
            if !seen {
                return Err(TurnError::ShownNotSeen { card });
            }
            if !suggestion.asked().contains(&card) {
                return Err(TurnError::ShownNotAsked { card });
            }
        }
        Ok(())
    }

    fn walk_passes(&mut self, suggestion: &Suggestion, asked: &[CardId; 3]) -> Vec<PlayerId> {
        let seats = self.kb.roster().player_count();
        let mut passed = Vec::new();
        let mut seat = (suggestion.asker.index() + 1) % seats;
        loop {
            let player = PlayerId(seat);
            if player == suggestion.asker || Some(player) == suggestion.responder {
                break;
            }
            for &card in asked {
                self.kb.assert_fact(card, player, Fact::Absent);
            }
            tracing::debug!(
                target: "cluedo_notebook::turns",
                player = self.kb.roster().name(player),
                message = "player passed, none of the asked cards are there"
            );
            passed.push(player);
            seat = (seat + 1) % seats;
        }
        passed
    }

    fn record_response(&mut self, suggestion: &Suggestion, asked: &[CardId; 3]) -> ResponseRecord {
        let Some(responder) = suggestion.responder else {
            tracing::info!(
                target: "cluedo_notebook::turns",
                message = "nobody answered the suggestion"
            );
            return ResponseRecord::Nobody;
        };
        if responder == self.me {
            return ResponseRecord::OwnAnswer;
        }
        if let Some(card) = suggestion.shown {
            tracing::info!(
                target: "cluedo_notebook::turns",
                player = self.kb.roster().name(responder),
                card = self.kb.universe().name(card),
                message = "we were shown a card"
            );
            self.kb.assert_fact(card, responder, Fact::Present);
            return ResponseRecord::Seen(card);
        }
        ResponseRecord::Disjunction(self.kb.add_constraint(responder, asked))
    }

    fn run_propagation(&mut self) {
        if let Err(error) = solver::propagate(&mut self.kb, Mode::Normal) {
            tracing::error!(
                target: "cluedo_notebook::turns",
                %error,
                message = "propagation aborted unexpectedly"
            );
        }
    }
}
