use crate::models::selection::TripSelection;

/// Placeholder for the destination label.
pub const LOCATION_PLACEHOLDER: &str = "{location}";
/// Placeholder for the trip duration. The built-in template uses it twice.
pub const DAYS_PLACEHOLDER: &str = "{totalDays}";
/// Placeholder for the traveler category.
pub const TRAVELER_PLACEHOLDER: &str = "{traveller}";
/// Placeholder for the budget tier.
pub const BUDGET_PLACEHOLDER: &str = "{budget}";

/// Every placeholder `build_prompt` substitutes.
pub const PLACEHOLDERS: [&str; 4] = [
    LOCATION_PLACEHOLDER,
    DAYS_PLACEHOLDER,
    TRAVELER_PLACEHOLDER,
    BUDGET_PLACEHOLDER,
];

/// The template used when no override file is configured.
pub const DEFAULT_TEMPLATE: &str = "Generate Travel Plan for Location: {location}, for {totalDays} Days \
for {traveller} with a {budget} budget. Give me a Hotels options list with HotelName, Hotel address, \
Price, hotel image url, geo coordinates, rating, descriptions and suggest itinerary with placeName, \
Place Details, Place Image Url, Geo Coordinates, ticket Pricing, rating, Time travel each of the \
location for {totalDays} days with each day plan with best time to visit in JSON format.";

/// Fills the prompt template with the user's trip parameters.
///
/// Every occurrence of every placeholder is replaced in a single pass over the
/// template, so substituted values are never scanned again. The function is
/// pure: the same template and selection always produce the same text.
///
/// # Arguments
///
/// * `template` - The prompt template.
/// * `selection` - The validated trip parameters.
///
/// # Returns
///
/// The text to send to the AI service.
pub fn build_prompt(template: &str, selection: &TripSelection) -> String {
    let days = selection.duration_days.to_string();
    let mut prompt = String::with_capacity(template.len() + selection.destination.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        prompt.push_str(&rest[..start]);
        let tail = &rest[start..];

        match PLACEHOLDERS.iter().find(|placeholder| tail.starts_with(**placeholder)) {
            Some(placeholder) => {
                let value = match *placeholder {
                    LOCATION_PLACEHOLDER => selection.destination.as_str(),
                    DAYS_PLACEHOLDER => days.as_str(),
                    TRAVELER_PLACEHOLDER => selection.traveler.label(),
                    _ => selection.budget.label(),
                };
                prompt.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                prompt.push('{');
                rest = &tail[1..];
            }
        }
    }

    prompt.push_str(rest);
    prompt
}

/// Lists the placeholders a template does not mention.
pub fn missing_placeholders(template: &str) -> Vec<&'static str> {
    PLACEHOLDERS
        .into_iter()
        .filter(|placeholder| !template.contains(placeholder))
        .collect()
}
