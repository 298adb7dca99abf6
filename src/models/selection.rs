use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The shortest trip that can be planned, in days.
pub const MIN_TRIP_DAYS: u8 = 1;
/// The longest trip that can be planned, in days.
pub const MAX_TRIP_DAYS: u8 = 5;

/// The spending level a traveler picks for the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetTier {
    Cheap,
    Moderate,
    Luxury,
}

impl BudgetTier {
    /// All tiers, in the order they are offered to the user.
    pub const ALL: [BudgetTier; 3] = [BudgetTier::Cheap, BudgetTier::Moderate, BudgetTier::Luxury];

    /// The label used in prompts and responses.
    pub fn label(self) -> &'static str {
        match self {
            BudgetTier::Cheap => "Cheap",
            BudgetTier::Moderate => "Moderate",
            BudgetTier::Luxury => "Luxury",
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BudgetTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BudgetTier::ALL
            .into_iter()
            .find(|tier| tier.label().eq_ignore_ascii_case(wanted))
            .ok_or(())
    }
}

/// Who the user is traveling with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelerCategory {
    Solo,
    Couple,
    Family,
    Friends,
}

impl TravelerCategory {
    /// All categories, in the order they are offered to the user.
    pub const ALL: [TravelerCategory; 4] = [
        TravelerCategory::Solo,
        TravelerCategory::Couple,
        TravelerCategory::Family,
        TravelerCategory::Friends,
    ];

    /// The label used in prompts and responses.
    pub fn label(self) -> &'static str {
        match self {
            TravelerCategory::Solo => "Solo",
            TravelerCategory::Couple => "Couple",
            TravelerCategory::Family => "Family",
            TravelerCategory::Friends => "Friends",
        }
    }

    /// The title shown on the selection card.
    fn card_title(self) -> &'static str {
        match self {
            TravelerCategory::Solo => "Just Me",
            TravelerCategory::Couple => "A Couple",
            TravelerCategory::Family => "Family",
            TravelerCategory::Friends => "Friends",
        }
    }
}

impl fmt::Display for TravelerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TravelerCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TravelerCategory::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted) || c.card_title().eq_ignore_ascii_case(wanted))
            .ok_or(())
    }
}

/// The trip parameters as submitted by the caller, before validation.
///
/// Every field is optional and enumerations arrive as plain strings so that a
/// bad value is reported against its field instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TripSelectionInput {
    pub destination: Option<String>,
    pub duration_days: Option<i64>,
    pub budget: Option<String>,
    pub traveler: Option<String>,
}

/// A validated set of trip parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSelection {
    /// Opaque place label, never empty.
    pub destination: String,
    /// Always within `MIN_TRIP_DAYS..=MAX_TRIP_DAYS`.
    pub duration_days: u8,
    pub budget: BudgetTier,
    pub traveler: TravelerCategory,
}
