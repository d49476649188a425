//! Domain-keyed fallback utterances used when an LLM call fails or a
//! generated turn needs a deterministic substitute. Data, not inline
//! strings in the simulator, so operators can retune copy (prices, venue
//! wording) without a rebuild.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainFallbacks {
    pub opening: String,
    pub price: String,
    pub availability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vegetarian: Option<String>,
    pub generic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackCatalog {
    domains: HashMap<String, DomainFallbacks>,
    pub default_generic: String,
}

impl FallbackCatalog {
    /// Load `data_dir/fallback_responses.json` if present, else the
    /// built-in default catalog.
    pub fn load(data_dir: &std::path::Path) -> Self {
        let path = data_dir.join("fallback_responses.json");
        if let Ok(raw) = std::fs::read_to_string(&path) {
            if let Ok(catalog) = serde_json::from_str(&raw) {
                return catalog;
            }
            tracing::warn!(path = %path.display(), "malformed fallback_responses.json, using defaults");
        }
        Self::default_catalog()
    }

    pub fn default_catalog() -> Self {
        let mut domains = HashMap::new();
        domains.insert(
            "hotel".to_string(),
            DomainFallbacks {
                opening: "I can help you book at {venue}. What dates do you need the room for?".into(),
                price: "{venue} is £65 per night. Would you like to proceed with the booking?".into(),
                availability: "Yes, I have availability at {venue}. Would you like to confirm the booking?".into(),
                vegetarian: None,
                generic: "I can help you with that. Let me provide some options for {goal}.".into(),
            },
        );
        domains.insert(
            "restaurant".to_string(),
            DomainFallbacks {
                opening: "I'd be happy to help you with {venue}. How many people and what time?".into(),
                price: "{venue} is reasonably priced. Would you like me to book a table?".into(),
                availability: "I can check availability at {venue}. What date, time, and how many people?".into(),
                vegetarian: Some("Yes, {venue} has good vegetarian options. Would you like me to book a table?".into()),
                generic: "I can help you with that. Let me provide some options for {goal}.".into(),
            },
        );
        domains.insert(
            "taxi".to_string(),
            DomainFallbacks {
                opening: "I'd be happy to help you with {goal}. How can I assist?".into(),
                price: "The estimated fare is £25-30. Would you like me to book the taxi?".into(),
                availability: "I can arrange that taxi for you. What pickup time works?".into(),
                vegetarian: None,
                generic: "I can help you with that. Let me provide some options for {goal}.".into(),
            },
        );
        domains.insert(
            "train".to_string(),
            DomainFallbacks {
                opening: "I'd be happy to help you with {goal}. How can I assist?".into(),
                price: "Tickets range from £30-45 depending on the service. Which would you prefer?".into(),
                availability: "I can check train times for you. What's your preferred departure window?".into(),
                vegetarian: None,
                generic: "I can help you with that. Let me provide some options for {goal}.".into(),
            },
        );
        domains.insert(
            "attraction".to_string(),
            DomainFallbacks {
                opening: "I'd be happy to help you with {goal}. How can I assist?".into(),
                price: "Tickets range from £15-25. Which would you prefer?".into(),
                availability: "I can check availability for you. What day were you thinking?".into(),
                vegetarian: None,
                generic: "I can help you with that. Let me provide some options for {goal}.".into(),
            },
        );
        Self {
            domains,
            default_generic: "I can help you with that. Let me provide some options for {goal}.".into(),
        }
    }

    pub fn for_domain(&self, domain: &str) -> Option<&DomainFallbacks> {
        self.domains.get(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_covers_every_configured_domain() {
        let catalog = FallbackCatalog::default_catalog();
        for domain in ["hotel", "restaurant", "taxi", "train", "attraction"] {
            assert!(catalog.for_domain(domain).is_some(), "missing {domain}");
        }
    }

    #[test]
    fn load_falls_back_to_defaults_when_file_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = FallbackCatalog::load(tmp.path());
        assert!(catalog.for_domain("hotel").is_some());
    }
}
