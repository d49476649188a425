//! Built-in seed dialogues for the few-shot hub.
//!
//! Strong per-domain examples so experience generation and the simulator
//! have good patterns to draw on before any real dialogues have been
//! accepted. Written into the hub whenever a domain has fewer than
//! [`MIN_EXAMPLES_PER_DOMAIN`] examples.

use serde::{Deserialize, Serialize};

pub const MIN_EXAMPLES_PER_DOMAIN: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTurn {
    pub role: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDialogue {
    pub goal: String,
    pub domain: String,
    pub context: String,
    pub user_persona: String,
    pub turns: Vec<SeedTurn>,
}

fn turn(role: &str, text: &str) -> SeedTurn {
    SeedTurn { role: role.into(), text: text.into() }
}

/// The static seed corpus, one entry per `seed_few_shot_hub.py` dialogue.
pub fn seed_dialogues() -> Vec<SeedDialogue> {
    vec![
        SeedDialogue {
            goal: "Book a hotel room for tonight in the city centre".into(),
            domain: "hotel".into(),
            context: "Traveling for business, need one night, prefer central location.".into(),
            user_persona: "Business traveler".into(),
            turns: vec![
                turn("User", "Hi, I need to book a hotel room for tonight. Something in the city centre please."),
                turn("SupportBot", "I can help with that. We have several mid-range options in the centre with good availability tonight. Do you have a preference for star rating or budget?"),
                turn("User", "Something mid-range is fine. Do any have parking?"),
                turn("SupportBot", "Yes, a couple of our central hotels offer on-site parking. I can check availability for tonight if you'd like."),
                turn("User", "Yes please, that would be great."),
                turn("SupportBot", "I've found availability. One has parking and is in your budget. Shall I hold the room for you?"),
                turn("User", "Perfect, yes please. Thank you!"),
            ],
        },
        SeedDialogue {
            goal: "Find a budget hotel for the weekend with free wifi".into(),
            domain: "hotel".into(),
            context: "Weekend trip, two guests, need wifi for work.".into(),
            user_persona: "Budget-conscious traveler".into(),
            turns: vec![
                turn("User", "I'm looking for a budget hotel for the weekend. Free wifi is important."),
                turn("SupportBot", "We have a few budget options with free wifi. How many guests, and any area preference?"),
                turn("User", "Two of us, and we'd like to be near the station if possible."),
                turn("SupportBot", "There's a well-rated budget option near the station with free wifi. I can check weekend availability."),
                turn("User", "That sounds good. Can you confirm the rate?"),
                turn("SupportBot", "Rates for that weekend are in the budget range. I can reserve it for you now."),
                turn("User", "Yes please, that works. Thanks!"),
            ],
        },
        SeedDialogue {
            goal: "Reserve a hotel room for 2 nights with a swimming pool".into(),
            domain: "hotel".into(),
            context: "Family short break, want a pool.".into(),
            user_persona: "Family traveler".into(),
            turns: vec![
                turn("User", "I'd like to reserve a room for two nights. Do you have anything with a swimming pool?"),
                turn("SupportBot", "Yes, we have hotels with pools. What area do you prefer, and how many guests?"),
                turn("User", "North side if possible, two adults and two kids."),
                turn("SupportBot", "There's a family-friendly option on the north side with a pool. I can check availability for your dates."),
                turn("User", "Please do. We're looking at next weekend."),
                turn("SupportBot", "They have availability next weekend. I can hold the room\u{2014}shall I confirm the reservation?"),
                turn("User", "Yes, that's perfect. Thank you!"),
            ],
        },
        SeedDialogue {
            goal: "Book accommodation near the city center for one night".into(),
            domain: "hotel".into(),
            context: "Late arrival, need one night close to centre.".into(),
            user_persona: "Solo traveler".into(),
            turns: vec![
                turn("User", "I need a room for one night, as close to the city center as possible. I'll be arriving quite late."),
                turn("SupportBot", "We have central options with late check-in. Do you have a budget in mind?"),
                turn("User", "Moderate is fine. Is 24-hour reception available?"),
                turn("SupportBot", "Yes, several of our central hotels have 24-hour reception so late arrival is no problem. I can reserve one for you."),
                turn("User", "Great, please go ahead. Thanks!"),
            ],
        },
        SeedDialogue {
            goal: "Find a 4-star hotel with parking for a business stay".into(),
            domain: "hotel".into(),
            context: "Business trip, need parking and good wifi.".into(),
            user_persona: "Business traveler".into(),
            turns: vec![
                turn("User", "I'm looking for a 4-star hotel with parking for a business trip."),
                turn("SupportBot", "We have 4-star options with parking. Which area and how many nights?"),
                turn("User", "Near the business district, three nights."),
                turn("SupportBot", "There's a 4-star hotel in the business district with parking and good reviews. I can check your dates."),
                turn("User", "Please do. I need good wifi too."),
                turn("SupportBot", "That one has business-grade wifi. Availability for three nights looks good. Shall I confirm the booking?"),
                turn("User", "Yes please. That's exactly what I needed. Thank you!"),
            ],
        },
        SeedDialogue {
            goal: "Book a table for dinner tonight at an Italian restaurant".into(),
            domain: "restaurant".into(),
            context: "Anniversary dinner, two people, prefer Italian.".into(),
            user_persona: "Couple".into(),
            turns: vec![
                turn("User", "Hi, I'd like to book a table for dinner tonight. We're looking for Italian."),
                turn("SupportBot", "We have several Italian restaurants. For how many people and what time?"),
                turn("User", "Two people, around 7:30?"),
                turn("SupportBot", "I can check availability for two at 7:30. Any area or price preference?"),
                turn("User", "City centre, moderate price is fine."),
                turn("SupportBot", "There's availability at a well-rated Italian in the centre. I can hold the table for you."),
                turn("User", "Perfect, yes please. Thank you!"),
            ],
        },
        SeedDialogue {
            goal: "Find a restaurant with vegetarian options near the hotel".into(),
            domain: "restaurant".into(),
            context: "Staying at central hotel, need veggie options.".into(),
            user_persona: "Vegetarian traveler".into(),
            turns: vec![
                turn("User", "Can you recommend a restaurant with good vegetarian options near the hotel?"),
                turn("SupportBot", "We have a few nearby with strong vegetarian menus. Do you want to book a table or just get recommendations?"),
                turn("User", "Recommendations first. Maybe one that does lunch?"),
                turn("SupportBot", "There's one five minutes away that does lunch and has a dedicated veggie selection. I can give you opening times and how to book if you like."),
                turn("User", "Yes, that would be great. Thanks!"),
            ],
        },
        SeedDialogue {
            goal: "Book a taxi to the airport for tomorrow morning".into(),
            domain: "taxi".into(),
            context: "Early flight, need reliable pickup.".into(),
            user_persona: "Traveler".into(),
            turns: vec![
                turn("User", "I need to book a taxi to the airport for tomorrow morning. My flight is early."),
                turn("SupportBot", "I can arrange that. What time do you need pickup and what's the pickup address?"),
                turn("User", "Pickup at 5:30 AM from the Grand Hotel in the city centre."),
                turn("SupportBot", "I've noted 5:30 AM from the Grand Hotel. We'll confirm the booking and send you the driver details. Anything else?"),
                turn("User", "No, that's all. Thank you!"),
            ],
        },
        SeedDialogue {
            goal: "Book a train ticket to London for next Friday".into(),
            domain: "train".into(),
            context: "Day trip, one passenger.".into(),
            user_persona: "Solo traveler".into(),
            turns: vec![
                turn("User", "I'd like to book a train ticket to London for next Friday."),
                turn("SupportBot", "I can help with that. Single or return? Any preferred time?"),
                turn("User", "Return, and I'd prefer morning out and evening back."),
                turn("SupportBot", "There are morning departures and evening returns. I can show you options and fares."),
                turn("User", "Yes please. What's the cheapest option?"),
                turn("SupportBot", "The off-peak return is the best value. I can reserve it for you now."),
                turn("User", "Perfect, go ahead. Thanks!"),
            ],
        },
        SeedDialogue {
            goal: "Find tourist attractions and book tickets for the museum".into(),
            domain: "attraction".into(),
            context: "Weekend visit, interested in the main museum.".into(),
            user_persona: "Tourist".into(),
            turns: vec![
                turn("User", "I'm visiting this weekend and would like to see the main museum. Can I book tickets?"),
                turn("SupportBot", "Yes. The main museum has weekend availability. How many tickets and which day?"),
                turn("User", "Two tickets for Saturday please."),
                turn("SupportBot", "Saturday is available. I can complete the booking\u{2014}any time preference?"),
                turn("User", "Morning if possible."),
                turn("SupportBot", "Morning slots are open. I'll confirm two tickets for Saturday morning."),
                turn("User", "Great, thank you!"),
            ],
        },
    ]
}

/// Seed dialogues for a single domain.
pub fn seed_dialogues_by_domain(domain: &str) -> Vec<SeedDialogue> {
    seed_dialogues().into_iter().filter(|d| d.domain == domain).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_configured_domain_has_at_least_one_seed() {
        for domain in ["hotel", "restaurant", "taxi", "train", "attraction"] {
            assert!(
                !seed_dialogues_by_domain(domain).is_empty(),
                "no seed dialogues for {domain}"
            );
        }
    }
}
