use crate::error::InputError;
use crate::models::selection::{
    BudgetTier, MAX_TRIP_DAYS, MIN_TRIP_DAYS, TravelerCategory, TripSelection, TripSelectionInput,
};

/// Validates a trip selection.
///
/// Fields are checked in form order (destination, duration, budget, traveler)
/// and the first problem found is reported. Nothing is coerced: a value that is
/// missing or out of range always blocks generation.
///
/// # Arguments
///
/// * `input` - The selection as submitted.
///
/// # Returns
///
/// A `Result` containing the validated `TripSelection`.
pub fn validate_selection(input: &TripSelectionInput) -> Result<TripSelection, InputError> {
    let destination = input
        .destination
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| InputError::new("destination", "Please choose a destination"))?;

    let duration_days = validate_duration(input.duration_days)?;

    let budget = match input.budget.as_deref().map(str::trim) {
        None | Some("") => return Err(InputError::new("budget", "Please choose a budget")),
        Some(raw) => raw
            .parse::<BudgetTier>()
            .map_err(|_| InputError::new("budget", format!("Unknown budget: {}", raw)))?,
    };

    let traveler = match input.traveler.as_deref().map(str::trim) {
        None | Some("") => {
            return Err(InputError::new("traveler", "Please choose who you are traveling with"));
        }
        Some(raw) => raw
            .parse::<TravelerCategory>()
            .map_err(|_| InputError::new("traveler", format!("Unknown traveler category: {}", raw)))?,
    };

    Ok(TripSelection {
        destination: destination.to_string(),
        duration_days,
        budget,
        traveler,
    })
}

/// Validates the trip duration in days.
fn validate_duration(days: Option<i64>) -> Result<u8, InputError> {
    let days = days.ok_or_else(|| InputError::new("duration_days", "Please enter the trip duration"))?;

    if days < i64::from(MIN_TRIP_DAYS) {
        return Err(InputError::new("duration_days", "Enter valid trip duration"));
    }

    if days > i64::from(MAX_TRIP_DAYS) {
        return Err(InputError::new(
            "duration_days",
            format!("Trip duration cannot exceed {} days", MAX_TRIP_DAYS),
        ));
    }

    // Bounded by MAX_TRIP_DAYS above.
    Ok(days as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(destination: &str, days: i64, budget: &str, traveler: &str) -> TripSelectionInput {
        TripSelectionInput {
            destination: Some(destination.to_string()),
            duration_days: Some(days),
            budget: Some(budget.to_string()),
            traveler: Some(traveler.to_string()),
        }
    }

    #[test]
    fn accepts_complete_selection() {
        let selection = validate_selection(&input(" Paris ", 3, "Cheap", "Couple")).unwrap();
        assert_eq!(selection.destination, "Paris");
        assert_eq!(selection.duration_days, 3);
        assert_eq!(selection.budget, BudgetTier::Cheap);
        assert_eq!(selection.traveler, TravelerCategory::Couple);
    }

    #[test]
    fn accepts_both_duration_bounds() {
        assert!(validate_selection(&input("Rome", 1, "Luxury", "Solo")).is_ok());
        assert!(validate_selection(&input("Rome", 5, "Luxury", "Solo")).is_ok());
    }

    #[test]
    fn rejects_out_of_range_durations() {
        for days in [-3, 0, 6, 30] {
            let err = validate_selection(&input("Rome", days, "Cheap", "Solo")).unwrap_err();
            assert_eq!(err.field, "duration_days", "duration {} should be rejected", days);
        }

        let err = validate_selection(&input("Rome", 6, "Cheap", "Solo")).unwrap_err();
        assert_eq!(err.message, "Trip duration cannot exceed 5 days");
    }

    #[test]
    fn reports_first_missing_field() {
        let err = validate_selection(&TripSelectionInput::default()).unwrap_err();
        assert_eq!(err.field, "destination");

        let mut partial = input("Lisbon", 2, "Moderate", "Family");
        partial.destination = Some("   ".to_string());
        assert_eq!(validate_selection(&partial).unwrap_err().field, "destination");

        let mut partial = input("Lisbon", 2, "Moderate", "Family");
        partial.duration_days = None;
        partial.budget = None;
        assert_eq!(validate_selection(&partial).unwrap_err().field, "duration_days");

        let mut partial = input("Lisbon", 2, "Moderate", "Family");
        partial.budget = None;
        partial.traveler = None;
        assert_eq!(validate_selection(&partial).unwrap_err().field, "budget");

        let mut partial = input("Lisbon", 2, "Moderate", "Family");
        partial.traveler = Some(String::new());
        assert_eq!(validate_selection(&partial).unwrap_err().field, "traveler");
    }

    #[test]
    fn rejects_values_outside_enumerations() {
        let err = validate_selection(&input("Oslo", 2, "Priceless", "Solo")).unwrap_err();
        assert_eq!(err.field, "budget");
        assert!(err.message.contains("Priceless"));

        let err = validate_selection(&input("Oslo", 2, "Cheap", "Pets")).unwrap_err();
        assert_eq!(err.field, "traveler");
    }
}
