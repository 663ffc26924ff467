//! Lowercase word tokenizer.

/// Shortest token kept, in characters.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Splits text into lowercase tokens.
///
/// A token is a maximal run of alphanumeric or underscore characters with at
/// least [`MIN_TOKEN_CHARS`] characters; everything else separates tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_and_lowercases() {
        assert_eq!(
            tokenize("Wireless Headphones, noise-cancelling (2nd gen)"),
            vec!["wireless", "headphones", "noise", "cancelling", "2nd", "gen"]
        );
    }

    #[test]
    fn drops_single_character_tokens() {
        assert_eq!(tokenize("a b cd e"), vec!["cd"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn keeps_unicode_words() {
        assert_eq!(tokenize("Café Crème"), vec!["café", "crème"]);
    }
}
