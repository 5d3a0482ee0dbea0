//! Query-string handling for pushState-bearing events.

use url::form_urlencoded;

use super::PushState;

/// Parses `?a=1&b=2` (leading `?` optional) into ordered pairs.
pub fn parse_query(search: &str) -> Vec<(String, String)> {
    let query = search.strip_prefix('?').unwrap_or(search);
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// `current ∪ push_state`, push_state winning on key conflict.
///
/// A conflicting key takes the place of its first occurrence in `current`;
/// new keys are appended in push_state order.
pub fn merge_query(current: &[(String, String)], push_state: &PushState) -> Vec<(String, String)> {
    let mut merged = Vec::with_capacity(current.len() + push_state.len());
    for (key, value) in current {
        match push_state.get(key) {
            None => merged.push((key.clone(), value.clone())),
            Some(replacement) => {
                if !merged.iter().any(|(merged_key, _)| merged_key == key) {
                    merged.extend(
                        replacement
                            .values()
                            .iter()
                            .map(|value| (key.clone(), value.clone())),
                    );
                }
            }
        }
    }
    for (key, values) in push_state {
        if current.iter().any(|(current_key, _)| current_key == key) {
            continue;
        }
        merged.extend(values.values().iter().map(|value| (key.clone(), value.clone())));
    }
    merged
}

/// Serializes pairs into a search string: `""` or `?k=v&…`.
pub fn to_search(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("?{query}")
}

/// The search string a pushState-bearing event navigates to. An empty
/// pushState clears the query.
pub fn pushed_search(current_search: &str, push_state: &PushState) -> String {
    if push_state.is_empty() {
        return String::new();
    }
    to_search(&merge_query(&parse_query(current_search), push_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::QueryValue;

    fn push_state(entries: &[(&str, QueryValue)]) -> PushState {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn appends_new_keys_after_existing_ones() {
        let pushed = pushed_search("?sort=name", &push_state(&[("page", "2".into())]));
        assert_eq!(pushed, "?sort=name&page=2");
    }

    #[test]
    fn push_state_wins_in_place() {
        let pushed = pushed_search(
            "?page=1&sort=name",
            &push_state(&[("page", "5".into()), ("q", "a b".into())]),
        );
        assert_eq!(pushed, "?page=5&sort=name&q=a+b");
    }

    #[test]
    fn list_values_replace_every_occurrence() {
        let pushed = pushed_search(
            "?tag=x&sort=name&tag=y",
            &push_state(&[("tag", QueryValue::Many(vec!["a".into(), "b".into()]))]),
        );
        assert_eq!(pushed, "?tag=a&tag=b&sort=name");
    }

    #[test]
    fn empty_push_state_clears_query() {
        assert_eq!(pushed_search("?sort=name", &PushState::new()), "");
    }

    #[test]
    fn parses_encoded_pairs() {
        assert_eq!(
            parse_query("?q=a%20b&x"),
            vec![("q".to_string(), "a b".to_string()), ("x".to_string(), String::new())]
        );
        assert!(parse_query("").is_empty());
    }
}
