use crate::error::StoreError;

/// Maps a record type tag to its remote collection name.
///
/// The rule is fixed: upper-case the first letter and append `s`. It is not an
/// English pluraliser, so inputs it would mangle are rejected instead:
/// an empty tag, a tag that already ends in `s`, and tags containing `/` or
/// whitespace (the routing key uses `/` as its separator).
pub fn collection_name(kind: &str) -> Result<String, StoreError> {
    let mut chars = kind.chars();
    let first = chars
        .next()
        .ok_or_else(|| StoreError::InvalidRecord("empty type tag".to_string()))?;

    if kind.contains('/') || kind.chars().any(char::is_whitespace) {
        return Err(StoreError::InvalidRecord(format!(
            "type tag {:?} contains a separator",
            kind
        )));
    }

    if kind.ends_with('s') || kind.ends_with('S') {
        return Err(StoreError::InvalidRecord(format!(
            "type tag {:?} is already plural",
            kind
        )));
    }

    let mut name: String = first.to_uppercase().collect();
    name.push_str(chars.as_str());
    name.push('s');
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_capitalizes_and_pluralizes() {
        assert_eq!(collection_name("session").unwrap(), "Sessions");
        assert_eq!(collection_name("user").unwrap(), "Users");
        assert_eq!(collection_name("Game").unwrap(), "Games");
    }

    #[test]
    fn test_collection_name_rejects_bad_tags() {
        assert!(collection_name("").is_err());
        assert!(collection_name("status").is_err());
        assert!(collection_name("a/b").is_err());
        assert!(collection_name("two words").is_err());
    }
}
