//! Goal normalization: MultiWOZ slot-string goals ("hotel-name: Alpha-Milton
//! guest house") are turned into a natural-language sentence before being
//! handed to the experience generator or used directly as a fallback.

/// Convert a possibly MultiWOZ-format goal into natural language. A goal
/// already in natural language (no `:` or `;`) passes through unchanged.
pub fn normalize_goal(goal: &str) -> String {
    let mut goal = goal.trim().to_string();

    if goal.starts_with('{') && goal.ends_with('}') {
        goal = goal[1..goal.len() - 1].trim().to_string();
    }

    if !goal.contains(':') && !goal.contains(';') {
        return goal;
    }

    let lower = goal.to_lowercase();

    if lower.contains("train-leaveat:") {
        if let Some(leaveat) = slot_value(&goal, "train-leaveat:") {
            return format!("Catch a train leaving at {leaveat}");
        }
    }
    if lower.contains("train-") {
        return "Book or find information about a train journey".to_string();
    }
    if lower.contains("attraction") {
        return "Find information about attractions or things to do".to_string();
    }
    if let Some(rest) = goal.strip_prefix("hotel-name:") {
        let name = rest.trim();
        return format!("Book a room at {name}");
    }
    if let Some(rest) = goal.strip_prefix("restaurant-name:") {
        let name = rest.trim();
        return format!("Find information about {name}");
    }
    if lower.contains("taxi-") {
        let mut parts = Vec::new();
        if let Some(v) = slot_value(&goal, "taxi-leaveat:") {
            parts.push(format!("leaving at {v}"));
        }
        if let Some(v) = slot_value(&goal, "taxi-departure:") {
            parts.push(format!("from {}", strip_list_punctuation(&v)));
        }
        if let Some(v) = slot_value(&goal, "taxi-destination:") {
            parts.push(format!("to {}", strip_list_punctuation(&v)));
        }
        if !parts.is_empty() {
            return format!("Book a taxi {}", parts.join(" "));
        }
    }

    // Generic fallback: replace known slot prefixes, join with "and",
    // collapse whitespace, strip list punctuation.
    let mut generic = goal
        .replace("hotel-name:", "book a room at")
        .replace("restaurant-name:", "find information about")
        .replace("taxi-leaveat:", "taxi leaving at")
        .replace("taxi-departure:", "from")
        .replace("taxi-destination:", "to")
        .replace(';', " and");
    generic = generic.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_list_punctuation(&generic).trim().to_string()
}

/// Heuristic used by the response parser to decide whether an LLM-returned
/// goal string needs re-normalizing: true if it still looks like a MultiWOZ
/// slot string rather than natural language.
pub fn looks_like_slot_format(goal: &str) -> bool {
    goal.contains(':') && (goal.contains('-') || goal.contains(';'))
}

/// Pull the text after `prefix` up to the next `;`, trimmed.
fn slot_value(goal: &str, prefix: &str) -> Option<String> {
    let lower = goal.to_lowercase();
    let idx = lower.find(prefix)?;
    let after = &goal[idx + prefix.len()..];
    let value = after.split(';').next().unwrap_or(after);
    Some(value.trim().to_string())
}

fn strip_list_punctuation(s: &str) -> String {
    s.replace(['[', ']', '\'', '"'], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_language_passes_through() {
        assert_eq!(normalize_goal("Book a hotel room for tonight"), "Book a hotel room for tonight");
    }

    #[test]
    fn train_leaveat_becomes_sentence() {
        assert_eq!(normalize_goal("train-leaveat: 11:30"), "Catch a train leaving at 11:30");
    }

    #[test]
    fn hotel_name_becomes_booking_sentence() {
        assert_eq!(
            normalize_goal("hotel-name: Alpha-Milton guest house"),
            "Book a room at Alpha-Milton guest house"
        );
    }

    #[test]
    fn taxi_slots_combine_into_one_sentence() {
        let goal = "taxi-leaveat: 10:00; taxi-departure: [Jesus College]; taxi-destination: 'Pizza Hut'";
        assert_eq!(
            normalize_goal(goal),
            "Book a taxi leaving at 10:00 from Jesus College to Pizza Hut"
        );
    }

    #[test]
    fn strips_outer_braces() {
        assert_eq!(normalize_goal("{train-leaveat: 09:00}"), "Catch a train leaving at 09:00");
    }
}
