//! `key=value` command tokens.

use tracing::warn;

/// Split `key=value` tokens at the first `=`, keeping their order.
/// Tokens without `=` are ignored with a warning.
pub fn parse_key_values<S: AsRef<str>>(tokens: &[S]) -> Vec<(String, String)> {
    tokens
        .iter()
        .filter_map(|token| {
            let token = token.as_ref();
            match token.split_once('=') {
                Some((key, value)) => Some((key.to_string(), value.to_string())),
                None => {
                    warn!(token, "Ignoring argument without '='");
                    None
                }
            }
        })
        .collect()
}

/// Last value given for `key`.
pub fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_values() {
        let pairs = parse_key_values(&["env=test", "stray", "path=a=b", "exp="]);
        assert_eq!(
            pairs,
            vec![
                ("env".to_string(), "test".to_string()),
                ("path".to_string(), "a=b".to_string()),
                ("exp".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_last_value_wins() {
        let pairs = parse_key_values(&["env=test", "env=prod"]);
        assert_eq!(last_value(&pairs, "env"), Some("prod"));
        assert_eq!(last_value(&pairs, "exp"), None);
    }
}
