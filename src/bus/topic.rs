//! Topic names and topic filters.
//!
//! Topics are `/`-separated levels. Filters may use `+` to match exactly one
//! level and `#` (last level only) to match the remaining levels, including
//! none.

use super::BusError;

/// Check a topic used for publishing. Wildcards are not allowed.
pub fn validate_topic(topic: &str) -> Result<(), BusError> {
    if topic.is_empty() || topic.contains(['+', '#']) {
        return Err(BusError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

/// Check a topic filter used for subscribing.
pub fn validate_filter(filter: &str) -> Result<(), BusError> {
    if filter.is_empty() {
        return Err(BusError::InvalidTopic(filter.to_string()));
    }

    let levels: Vec<&str> = filter.split('/').collect();
    for (i, level) in levels.iter().enumerate() {
        let is_last = i == levels.len() - 1;
        let valid = match *level {
            "#" => is_last,
            "+" => true,
            other => !other.contains(['+', '#']),
        };
        if !valid {
            return Err(BusError::InvalidTopic(filter.to_string()));
        }
    }
    Ok(())
}

/// Return true if `topic` is selected by `filter`.
pub fn matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
