//! Identifier rules for item types and names.
//!
//! Types arrive as plural path segments (`/blog-posts`) and are stored in
//! their singular form (`blog-post`). Both the singular type and the name must
//! fully match their pattern before any repository access happens.

use crate::error::{Result, StoreError};
use crate::inflection;
use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern a singular type must fully match.
pub const TYPE_PATTERN: &str = r"^[a-z][a-z0-9]*(?:[-_][a-z0-9]+)*$";

/// Pattern a name must fully match.
pub const NAME_PATTERN: &str = r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$";

static TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(TYPE_PATTERN).expect("valid type regex"));
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(NAME_PATTERN).expect("valid name regex"));

/// Check a singular type against [`TYPE_PATTERN`].
///
/// # Errors
/// Returns `StoreError::InvalidType` when the candidate does not match.
pub fn validate_type(candidate: &str) -> Result<()> {
    if TYPE_RE.is_match(candidate) {
        Ok(())
    } else {
        Err(StoreError::InvalidType(candidate.to_string()))
    }
}

/// Check a name against [`NAME_PATTERN`].
///
/// # Errors
/// Returns `StoreError::InvalidName` when the candidate does not match.
pub fn validate_name(candidate: &str) -> Result<()> {
    if NAME_RE.is_match(candidate) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(candidate.to_string()))
    }
}

/// Grammatical number conversion for type segments.
pub trait Pluralizer: Send + Sync {
    /// Singular form of `word`.
    fn singular(&self, word: &str) -> String;

    /// Plural form of `word`.
    fn plural(&self, word: &str) -> String;

    /// Whether `word` is already a plural form.
    ///
    /// A word is plural when singularizing and re-pluralizing it gives the
    /// same word back. Uncountable nouns are therefore plural too.
    fn is_plural(&self, word: &str) -> bool {
        !word.is_empty() && self.plural(&self.singular(word)) == word
    }
}

/// English rules: irregular plurals, uncountable nouns and suffix rules.
///
/// Only the last word of a `-` or `_` separated compound is inflected, so
/// `blog-posts` becomes `blog-post`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishPluralizer;

impl EnglishPluralizer {
    fn split_last_word(word: &str) -> (&str, &str) {
        word.rfind(['-', '_'])
            .map_or(("", word), |idx| word.split_at(idx + 1))
    }

    fn inflect_last_word(word: &str, inflect: fn(&str) -> String) -> String {
        let (head, tail) = Self::split_last_word(word);
        format!("{head}{}", inflect(tail))
    }
}

impl Pluralizer for EnglishPluralizer {
    fn singular(&self, word: &str) -> String {
        Self::inflect_last_word(word, inflection::singular)
    }

    fn plural(&self, word: &str) -> String {
        Self::inflect_last_word(word, inflection::plural)
    }

    /// Irregular plurals and uncountable nouns are plural; any other word is
    /// plural when the plural rules leave it unchanged.
    fn is_plural(&self, word: &str) -> bool {
        let (_, tail) = Self::split_last_word(word);
        inflection::is_plural(tail)
    }
}

/// Turn a plural path segment into a validated singular type.
///
/// # Errors
/// Returns `StoreError::NotPlural` when the segment is not plural, and
/// `StoreError::InvalidType` when its singular form fails [`validate_type`].
pub fn resolve_type(pluralizer: &dyn Pluralizer, type_plural: &str) -> Result<String> {
    if !pluralizer.is_plural(type_plural) {
        return Err(StoreError::NotPlural(type_plural.to_string()));
    }

    let item_type = pluralizer.singular(type_plural);
    validate_type(&item_type)?;
    Ok(item_type)
}
