//! Prompt construction for plan generation and quick search.
//!
//! Pure string assembly; no I/O.

use voyage_store::TripDetails;

/// Country whose trips are domestic for the (Seoul-based) traveler.
const DOMESTIC_COUNTRY: &str = "Korea";

/// Countries that get a structured inter-city transport comparison.
const GUIDED_COUNTRIES: [&str; 2] = ["Japan", "Korea"];

/// Output example included verbatim in the plan prompt.
const OUTPUT_EXAMPLE: &str = r#"{
  "tripTitle": "Lively cities and quiet nature: 4 days",
  "tripOverview": "This trip balances the city's culture with its best natural sights. It covers the main attractions efficiently, samples local food and leaves time to rest.",
  "estimatedCost": "About 1,200,000 KRW per person (flights excluded)",
  "dailyItinerary": [{
    "day": "Day 1",
    "date": "2025-10-01",
    "theme": "Arrival and first impressions",
    "schedule": [{
      "time": "15:00",
      "activity": "Arrive and transfer downtown",
      "description": "Clear immigration and collect your bags. Follow the signs to the rail platforms. Exchange a pre-booked ticket or buy one at the counter for the airport express. Sit back and watch the scenery on the way in. Check which exit is closest to your hotel before you arrive.",
      "transportation": "Airport express train, about 45 min, 15,000 KRW"
    }]
  }],
  "hotelRecommendations": [{ "name": "City Center Hotel", "area": "Downtown", "priceRange": "150,000-250,000 KRW", "rating": 4.5, "notes": "Connected to the main station; ideal for shopping and sightseeing." }],
  "transportationGuide": [{
    "method": "KTX/SRT",
    "tips": "Fastest and most punctual option. Book ahead on weekends and holidays; stations connect directly to the subway.",
    "duration": "About 2h30m to 3h",
    "cost": "About 59,800 KRW one way, standard class",
    "recommended": true
  }],
  "restaurantRecommendations": [{ "name": "Central Market Diner", "area": "Central Market", "rating": 4.4, "notes": "Fresh seafood loved by locals; expect a queue at meal times." }]
}"#;

/// Build the plan-generation prompt for `trip`.
pub fn build_plan_prompt(trip: &TripDetails) -> String {
    let country = trip.country_or_default();
    let destination = &trip.destination;
    let domestic = country.eq_ignore_ascii_case(DOMESTIC_COUNTRY);
    let guided = GUIDED_COUNTRIES
        .iter()
        .any(|c| country.eq_ignore_ascii_case(c));

    let must_visit = if trip.must_visit_places.is_empty() {
        "The traveler has no required places to visit.".to_owned()
    } else {
        format!(
            "The traveler must visit these places:\n- {}\nInclude every one of them in the itinerary.",
            trip.must_visit_places.join("\n- ")
        )
    };

    let cost_basis = if domestic {
        "including transportation"
    } else {
        "excluding flights"
    };
    let timing = if domestic {
        "Use the real timetables of the chosen transport (for example the KTX schedule)."
    } else {
        "Use realistic international flight times (depart after 9am, arrive before 8pm)."
    };
    let guide_rule = if guided {
        "Compare the main options (train, bus, car, flights) with usage tips, duration and cost, and return them as an array of objects with fields method, tips, duration, cost and recommended (boolean)."
    } else {
        "Set this field to null."
    };

    let mut prompt = String::with_capacity(4096);
    prompt.push_str(&format!(
        "You are an expert travel planner for {country}. Plan a detailed trip to {destination}, {country} from {start} to {end}.\n\n",
        start = trip.start_date,
        end = trip.end_date,
    ));
    prompt.push_str(&must_visit);
    prompt.push_str("\n\n## Hotels\n");
    prompt.push_str(
        "- Recommend a balanced mix: 2-3 good-value hotels and 2-3 luxury five-star hotels.\n\
         - All hotels must be central with convenient transport.\n",
    );
    prompt.push_str("\n## Transportation guide\n");
    prompt.push_str(&format!(
        "- Focus on moving between the main cities or areas within {destination}.\n\
         - Compare each option's pros and cons, duration and cost, and recommend the most efficient.\n"
    ));
    prompt.push_str("\n## Rules\n");
    let rules = [
        "tripTitle: one attractive sentence that captures the trip and destination.".to_owned(),
        "tripOverview: 3-4 sentences summarizing the concept and main activities.".to_owned(),
        format!("estimatedCost: total per-person cost in KRW, {cost_basis}."),
        "Hotels and restaurants: at least 5 real places each.".to_owned(),
        "Ratings: every recommendation has a rating out of 5; sort by rating, highest first.".to_owned(),
        "Schedule: at least 5 time slots per day, including breakfast, lunch and dinner.".to_owned(),
        format!("Realistic connections: {timing}"),
        "transportation: for every schedule item give the concrete route (line, bus number, walking), duration and fare.".to_owned(),
        "description: at least five sentences per activity with duration and tips.".to_owned(),
        "Route: plan an efficient order of visits that includes every required place.".to_owned(),
        format!("transportationGuide: {guide_rule}"),
        "Output: return only pure JSON in the format below, with no commentary and no markdown.".to_owned(),
    ];
    for (i, rule) in rules.iter().enumerate() {
        prompt.push_str(&format!("{}. {rule}\n", i + 1));
    }
    prompt.push_str("\n## Output example\n");
    prompt.push_str(OUTPUT_EXAMPLE);
    prompt.push('\n');
    prompt
}

/// Build the quick-answer search prompt.
pub fn build_search_prompt(query: &str) -> String {
    format!("Give a concise, useful answer to this travel question: \"{query}\"")
}
