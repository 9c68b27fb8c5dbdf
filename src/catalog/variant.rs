//! Game Variants
//!
//! One ruleset per game type, registered behind the [`GameRules`] trait.
//! The session controller is polymorphic over this trait: adding a game
//! means adding a ruleset and a registry entry, never another controller.

use serde::{Deserialize, Serialize};

use crate::core::commitment::EncodedChoice;

/// Tag selecting a game ruleset. Immutable, chosen at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    /// Binary cooperate/defect dilemma.
    Dilemma,
    /// Rock, paper, scissors.
    RockPaperScissors,
    /// Pick an integer gain in `0..=9`.
    TradeGains,
    /// Open-ended numeric score reporting.
    Asteroid,
}

impl std::fmt::Display for GameVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Dilemma => "dilemma",
            Self::RockPaperScissors => "rock_paper_scissors",
            Self::TradeGains => "trade_gains",
            Self::Asteroid => "asteroid",
        };
        f.write_str(tag)
    }
}

/// A player's choice for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    /// A token from a finite symbolic domain (e.g. `"cooperate"`).
    Symbol(String),
    /// A numeric choice or score.
    Number(u64),
}

impl Choice {
    /// Canonical textual rendering: the exact symbol token, or the decimal
    /// digits of the number. This is both the reveal payload value and the
    /// basis of the commitment preimage.
    pub fn canonical_text(&self) -> String {
        match self {
            Self::Symbol(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// The set of choices a variant admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceDomain {
    /// A finite set of lowercase tokens.
    Symbols(&'static [&'static str]),
    /// An inclusive integer range.
    Range {
        /// Smallest admissible value.
        min: u64,
        /// Largest admissible value.
        max: u64,
    },
    /// Any numeric value.
    Open,
}

impl ChoiceDomain {
    /// Check domain membership. Exact matching only.
    pub fn validate(&self, choice: &Choice) -> Result<(), ChoiceError> {
        match (self, choice) {
            (Self::Symbols(_), Choice::Symbol(s)) if s.is_empty() => Err(ChoiceError::Empty),
            (Self::Symbols(tokens), Choice::Symbol(s)) => {
                if tokens.contains(&s.as_str()) {
                    Ok(())
                } else {
                    Err(ChoiceError::UnknownSymbol { symbol: s.clone() })
                }
            }
            (Self::Range { min, max }, Choice::Number(n)) => {
                if n >= min && n <= max {
                    Ok(())
                } else {
                    Err(ChoiceError::OutOfRange {
                        value: *n,
                        min: *min,
                        max: *max,
                    })
                }
            }
            (Self::Open, Choice::Number(_)) => Ok(()),
            (Self::Symbols(_), Choice::Number(_)) => Err(ChoiceError::WrongKind {
                expected: "symbol",
            }),
            (Self::Range { .. } | Self::Open, Choice::Symbol(_)) => Err(ChoiceError::WrongKind {
                expected: "number",
            }),
        }
    }
}

/// Invalid choice for a variant's domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChoiceError {
    /// Empty choice, rejected before hashing.
    #[error("choice is empty")]
    Empty,

    /// Symbol not in the variant's token set.
    #[error("unknown symbol: {symbol}")]
    UnknownSymbol {
        /// The offending token.
        symbol: String,
    },

    /// Number outside the variant's range.
    #[error("value {value} outside range [{min}, {max}]")]
    OutOfRange {
        /// The offending value.
        value: u64,
        /// Smallest admissible value.
        min: u64,
        /// Largest admissible value.
        max: u64,
    },

    /// Choice kind does not match the domain.
    #[error("choice kind mismatch, expected a {expected}")]
    WrongKind {
        /// The kind the domain admits.
        expected: &'static str,
    },
}

/// Capability a variant plugs into the shared session engine.
///
/// Default methods derive validation, encoding, and the reveal payload from
/// [`GameRules::domain`], so most rulesets only declare their domain. The
/// encode path here is the single producer of [`EncodedChoice`], at commit
/// time and at reveal time alike.
pub trait GameRules: Send + Sync {
    /// The tag this ruleset is registered under.
    fn variant(&self) -> GameVariant;

    /// The choice domain.
    fn domain(&self) -> ChoiceDomain;

    /// Check a choice against the domain.
    fn validate(&self, choice: &Choice) -> Result<(), ChoiceError> {
        self.domain().validate(choice)
    }

    /// Canonically encode a validated choice for the commitment preimage.
    fn encode(&self, choice: &Choice) -> Result<EncodedChoice, ChoiceError> {
        self.validate(choice)?;
        EncodedChoice::new(self.render(choice).into_bytes()).ok_or(ChoiceError::Empty)
    }

    /// Render the reveal payload value. Must stay in lockstep with
    /// [`GameRules::encode`]: the ledger hashes this rendering verbatim.
    fn render(&self, choice: &Choice) -> String {
        choice.canonical_text()
    }
}

struct DilemmaRules;

impl GameRules for DilemmaRules {
    fn variant(&self) -> GameVariant {
        GameVariant::Dilemma
    }

    fn domain(&self) -> ChoiceDomain {
        ChoiceDomain::Symbols(&["cooperate", "defect"])
    }
}

struct RockPaperScissorsRules;

impl GameRules for RockPaperScissorsRules {
    fn variant(&self) -> GameVariant {
        GameVariant::RockPaperScissors
    }

    fn domain(&self) -> ChoiceDomain {
        ChoiceDomain::Symbols(&["rock", "paper", "scissors"])
    }
}

struct TradeGainsRules;

impl GameRules for TradeGainsRules {
    fn variant(&self) -> GameVariant {
        GameVariant::TradeGains
    }

    fn domain(&self) -> ChoiceDomain {
        ChoiceDomain::Range { min: 0, max: 9 }
    }
}

struct AsteroidRules;

impl GameRules for AsteroidRules {
    fn variant(&self) -> GameVariant {
        GameVariant::Asteroid
    }

    fn domain(&self) -> ChoiceDomain {
        ChoiceDomain::Open
    }
}

/// Registered rulesets, one per [`GameVariant`].
static REGISTRY: &[&(dyn GameRules)] = &[
    &DilemmaRules,
    &RockPaperScissorsRules,
    &TradeGainsRules,
    &AsteroidRules,
];

/// Look up the ruleset for a variant.
pub fn rules(variant: GameVariant) -> &'static dyn GameRules {
    REGISTRY
        .iter()
        .copied()
        .find(|r| r.variant() == variant)
        .unwrap_or_else(|| unreachable!("variant {variant} missing from registry"))
}

/// All registered rulesets.
pub fn all() -> impl Iterator<Item = &'static dyn GameRules> {
    REGISTRY.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_registered() {
        for variant in [
            GameVariant::Dilemma,
            GameVariant::RockPaperScissors,
            GameVariant::TradeGains,
            GameVariant::Asteroid,
        ] {
            assert_eq!(rules(variant).variant(), variant);
        }
        assert_eq!(all().count(), 4);
    }

    #[test]
    fn test_dilemma_domain() {
        let rules = rules(GameVariant::Dilemma);
        assert!(rules.validate(&Choice::Symbol("cooperate".into())).is_ok());
        assert!(rules.validate(&Choice::Symbol("defect".into())).is_ok());
        assert!(matches!(
            rules.validate(&Choice::Symbol("betray".into())),
            Err(ChoiceError::UnknownSymbol { .. })
        ));
        assert!(matches!(
            rules.validate(&Choice::Number(1)),
            Err(ChoiceError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_trade_gains_range() {
        let rules = rules(GameVariant::TradeGains);
        assert!(rules.validate(&Choice::Number(0)).is_ok());
        assert!(rules.validate(&Choice::Number(9)).is_ok());
        assert!(matches!(
            rules.validate(&Choice::Number(10)),
            Err(ChoiceError::OutOfRange { value: 10, .. })
        ));
        assert!(matches!(
            rules.validate(&Choice::Symbol("5".into())),
            Err(ChoiceError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_asteroid_open_domain() {
        let rules = rules(GameVariant::Asteroid);
        assert!(rules.validate(&Choice::Number(0)).is_ok());
        assert!(rules.validate(&Choice::Number(u64::MAX)).is_ok());
        assert!(rules.validate(&Choice::Symbol("high".into())).is_err());
    }

    #[test]
    fn test_empty_symbol_rejected() {
        let rules = rules(GameVariant::Dilemma);
        assert_eq!(
            rules.validate(&Choice::Symbol(String::new())),
            Err(ChoiceError::Empty)
        );
        assert!(rules.encode(&Choice::Symbol(String::new())).is_err());
    }

    #[test]
    fn test_canonical_encoding() {
        let dilemma = rules(GameVariant::Dilemma);
        let encoded = dilemma.encode(&Choice::Symbol("cooperate".into())).unwrap();
        assert_eq!(encoded.as_bytes(), b"cooperate");

        let gains = rules(GameVariant::TradeGains);
        let encoded = gains.encode(&Choice::Number(7)).unwrap();
        assert_eq!(encoded.as_bytes(), b"7");
        assert_eq!(gains.render(&Choice::Number(7)), "7");
    }

    #[test]
    fn test_encode_rejects_out_of_domain() {
        let rules = rules(GameVariant::RockPaperScissors);
        assert!(rules.encode(&Choice::Symbol("lizard".into())).is_err());
    }
}
