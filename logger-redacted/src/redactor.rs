use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::borrow::Cow;

/// Replaces identifiers with short, stable correlation hashes.
///
/// The same identifier always hashes to the same token, so redacted audit events for
/// one subject can still be correlated without exposing the identifier itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierRedactor {
    enabled: bool,
}

impl IdentifierRedactor {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Redact a single identifier. Empty identifiers stay empty.
    pub fn redact<'a>(&self, identifier: &'a str) -> Cow<'a, str> {
        if !self.enabled || identifier.is_empty() {
            return Cow::Borrowed(identifier);
        }
        Cow::Owned(self.token(identifier))
    }

    /// Redact every occurrence of `identifiers` inside free-form text.
    ///
    /// Matches are taken from the original text in one left-to-right pass, so inserted
    /// tokens are never matched again.
    pub fn redact_in<'a>(&self, text: &'a str, identifiers: &[&str]) -> Cow<'a, str> {
        if !self.enabled {
            return Cow::Borrowed(text);
        }

        // Longest first so "UUID-10" wins over "UUID-1" at the same position.
        let mut ordered: Vec<&str> = identifiers.iter().copied().filter(|id| !id.is_empty()).collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        ordered.dedup();

        let mut result = String::with_capacity(text.len());
        let mut copied = 0;
        let mut position = 0;
        while position < text.len() {
            let rest = &text[position..];
            match ordered.iter().find(|id| rest.starts_with(**id)) {
                Some(identifier) => {
                    result.push_str(&text[copied..position]);
                    result.push_str(&self.token(identifier));
                    position += identifier.len();
                    copied = position;
                }
                None => {
                    position += rest.chars().next().map_or(1, char::len_utf8);
                }
            }
        }

        if copied == 0 {
            return Cow::Borrowed(text);
        }
        result.push_str(&text[copied..]);
        Cow::Owned(result)
    }

    fn token(&self, identifier: &str) -> String {
        format!("ID[{}]", hash_value(identifier))
    }
}

fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    general_purpose::STANDARD.encode(&result[..8])
}
