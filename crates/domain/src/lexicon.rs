//! Static keyword and phrase tables shared by the simulator, quality judge,
//! and evaluator. Kept in one module so the constants are grep-able and
//! tested in isolation instead of scattered as string literals.

/// Words that mark a user turn as abusive; `HeuristicFilters::profanity`
/// rejects any turn containing one of these.
pub const PROFANITY_WORDS: &[&str] = &[
    "damn", "hell", "stupid", "idiot", "shut up", "crap",
];

/// Keyword table used by `infer_domain` to classify a free-text goal when no
/// explicit domain tag is present.
pub const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    ("hotel", &["hotel", "room", "stay", "accommodation", "guesthouse"]),
    ("restaurant", &["restaurant", "dinner", "lunch", "eat", "dining", "table", "food"]),
    ("taxi", &["taxi", "cab", "pickup", "drop off", "ride"]),
    ("train", &["train", "railway", "station", "departure", "arrival"]),
    ("attraction", &["attraction", "museum", "park", "visit", "sightseeing", "tour"]),
];

/// Keywords whose presence in a SupportBot turn suggests the transaction
/// reached a conclusion, used by the goal-check and completion heuristics.
pub const COMPLETION_KEYWORDS: &[&str] = &[
    "confirmed",
    "booked",
    "reserved",
    "all set",
    "you're all set",
    "booking is complete",
    "reservation is complete",
    "i've confirmed",
    "i have confirmed",
];

/// Requestable slot names the goal-completion-rate metric looks for in goal
/// text and then checks for a corresponding answer in the dialogue.
pub const GCR_REQUESTABLES: &[&str] = &[
    "address", "phone", "postcode", "price", "reference", "area", "type",
];

/// Synonyms considered when checking whether a requestable slot was actually
/// answered in the dialogue text (the dialogue might say "cost" for "price").
pub const GCR_SYNONYMS: &[(&str, &[&str])] = &[
    ("address", &["address", "location", "where"]),
    ("phone", &["phone", "number", "contact"]),
    ("postcode", &["postcode", "zip", "post code"]),
    ("price", &["price", "cost", "fee", "rate", "pricing"]),
    ("reference", &["reference", "confirmation number", "booking number", "ref number"]),
    ("area", &["area", "location", "neighborhood", "neighbourhood", "part of town"]),
    ("type", &["type", "kind", "category"]),
];

/// Keywords that identify the user's intent category, used by the
/// intent-consistency advanced metric.
pub const INTENT_CATEGORIES: &[(&str, &[&str])] = &[
    ("booking", &["book", "reserve", "reservation", "ticket"]),
    ("search", &["find", "search", "looking for", "look for"]),
    ("info", &["information", "details", "tell me", "explain"]),
];

/// Time-of-day / date tokens checked by the slot-coverage advanced metric
/// alongside any bare digit token from the goal text.
pub const SLOT_TIME_TOKENS: &[&str] = &["morning", "evening", "tonight", "today", "tomorrow"];

/// Phrases that, if present verbatim in a dialogue's text, indicate the
/// simulated agents contradicted themselves (state-tracking heuristic).
pub const CONTRADICTION_PHRASES: &[&str] = &[
    "i thought you said",
    "you already told me",
    "that contradicts",
    "earlier you said",
];

/// Keywords on the user side that indicate the task-success-rate intent was
/// actually pursued in the dialogue, keyed by domain.
pub const TSR_INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("hotel", &["hotel", "room", "stay", "book", "reserve"]),
    ("restaurant", &["restaurant", "table", "dinner", "lunch", "eat"]),
    ("taxi", &["taxi", "cab", "pickup", "ride"]),
    ("train", &["train", "ticket", "station"]),
    ("attraction", &["attraction", "museum", "visit", "tour"]),
];

/// Phrases in the closing turns that indicate the user was satisfied,
/// checked by the task-success-rate metric.
pub const TSR_SATISFACTION_KEYWORDS: &[&str] = &[
    "thank", "thanks", "great", "perfect", "that's all", "that works", "appreciate it",
];

/// Deterministic paraphrases for common User-side openers, used when the
/// simulator falls back to a templated turn instead of calling the LLM.
/// Picking among these by turn index keeps repeated fallbacks from reading
/// identically.
pub const USER_FALLBACK_VARIANTS: &[&str] = &[
    "Could you tell me more about that?",
    "That sounds good, can you go ahead?",
    "Is there anything else I should know?",
    "Okay, what's the next step?",
];

/// Deterministic paraphrases for SupportBot fallback turns, varied the same
/// way as `USER_FALLBACK_VARIANTS`.
pub const SUPPORTBOT_FALLBACK_VARIANTS: &[&str] = &[
    "Let me check that for you.",
    "I can help with that, one moment.",
    "Here's what I found, does that work?",
    "I've noted that, anything else I can help with?",
];

/// Look up the domain for a free-text goal by keyword match. Falls back to
/// `"unknown"` when no domain's keywords match.
pub fn infer_domain(goal: &str) -> &'static str {
    let lower = goal.to_lowercase();
    for (domain, keywords) in DOMAIN_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return domain;
        }
    }
    "unknown"
}

/// Jaccard similarity over whitespace-split lowercase tokens, used by the
/// simulator to detect when the last two turns are near-duplicates.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    use std::collections::HashSet;
    let sa: HashSet<&str> = a.split_whitespace().collect();
    let sb: HashSet<&str> = b.split_whitespace().collect();
    if sa.is_empty() && sb.is_empty() {
        return 1.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_hotel_domain_from_keyword() {
        assert_eq!(infer_domain("I need a room for tonight"), "hotel");
    }

    #[test]
    fn infers_restaurant_domain_from_keyword() {
        assert_eq!(infer_domain("book a table for dinner"), "restaurant");
    }

    #[test]
    fn unmatched_goal_falls_back_to_unknown() {
        assert_eq!(infer_domain("xyzzy plugh"), "unknown");
    }

    #[test]
    fn jaccard_identical_strings_is_one() {
        assert_eq!(jaccard_similarity("hello there friend", "hello there friend"), 1.0);
    }

    #[test]
    fn jaccard_disjoint_strings_is_zero() {
        assert_eq!(jaccard_similarity("alpha beta", "gamma delta"), 0.0);
    }
}
