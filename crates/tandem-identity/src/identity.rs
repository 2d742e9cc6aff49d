//! The anonymous participant profile and the rules for editing it.
//!
//! An [`Identity`] is everything matchmaking needs to know about a person:
//! which language they speak, which one they are learning, and what they
//! like to talk about. Nothing here is personally identifying; the alias
//! is generated.

use std::collections::BTreeSet;

use tandem_protocol::IdentityId;

/// Language assumed for a participant who never said otherwise.
pub const DEFAULT_NATIVE_LANGUAGE: &str = "pt";
/// Language assumed to be the learning goal when none is given.
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";
/// Region assumed when none is given.
pub const DEFAULT_REGION: &str = "BR";

// ---------------------------------------------------------------------------
// ProfileLimits
// ---------------------------------------------------------------------------

/// Bounds applied to every profile edit.
#[derive(Debug, Clone)]
pub struct ProfileLimits {
    /// At most this many interests are kept. Default: 10.
    pub max_interests: usize,
    /// Interests, regions and language codes are cut to this many
    /// characters. Default: 32.
    pub max_label_chars: usize,
}

impl Default for ProfileLimits {
    fn default() -> Self {
        Self {
            max_interests: 10,
            max_label_chars: 32,
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A stable anonymous profile representing one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    /// Display name shown to partners, e.g. `"QuietOtter42"`.
    pub alias: String,
    pub native_language: String,
    pub target_language: String,
    /// Ordered so that shared-interest lists come out deterministic.
    pub interests: BTreeSet<String>,
    pub region: String,
}

impl Identity {
    /// Creates an identity with the default languages and region and no
    /// interests.
    pub fn new(id: IdentityId, alias: impl Into<String>) -> Self {
        Self {
            id,
            alias: alias.into(),
            native_language: DEFAULT_NATIVE_LANGUAGE.to_string(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            interests: BTreeSet::new(),
            region: DEFAULT_REGION.to_string(),
        }
    }

    /// Sets both languages. Handy when building identities by hand.
    pub fn with_languages(
        mut self,
        native: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.native_language = native.into();
        self.target_language = target.into();
        self
    }

    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Applies a profile edit, sanitizing every field on the way in.
    ///
    /// Fields that are `None`, or that are empty after sanitizing, leave
    /// the current value alone. An explicit empty interest list clears
    /// the interests.
    pub fn apply(&mut self, update: &ProfileUpdate, limits: &ProfileLimits) {
        if let Some(lang) = update
            .native_language
            .as_deref()
            .and_then(|raw| normalize_language(raw, limits))
        {
            self.native_language = lang;
        }
        if let Some(lang) = update
            .target_language
            .as_deref()
            .and_then(|raw| normalize_language(raw, limits))
        {
            self.target_language = lang;
        }
        if let Some(interests) = &update.interests {
            self.interests = sanitize_interests(interests, limits);
        }
        if let Some(region) = update
            .region
            .as_deref()
            .map(|raw| sanitize_text(raw, limits.max_label_chars))
            .filter(|region| !region.is_empty())
        {
            self.region = region;
        }
    }
}

// ---------------------------------------------------------------------------
// ProfileUpdate
// ---------------------------------------------------------------------------

/// A partial profile edit. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub native_language: Option<String>,
    pub target_language: Option<String>,
    pub interests: Option<Vec<String>>,
    pub region: Option<String>,
}

impl ProfileUpdate {
    /// Returns `true` if applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.native_language.is_none()
            && self.target_language.is_none()
            && self.interests.is_none()
            && self.region.is_none()
    }
}

// ---------------------------------------------------------------------------
// Sanitizing
// ---------------------------------------------------------------------------

/// Strips angle brackets, trims whitespace, and cuts to `max_chars`
/// characters (not bytes).
pub fn sanitize_text(raw: &str, max_chars: usize) -> String {
    let stripped: String = raw.chars().filter(|c| !matches!(c, '<' | '>')).collect();
    stripped.trim().chars().take(max_chars).collect()
}

fn normalize_language(raw: &str, limits: &ProfileLimits) -> Option<String> {
    let lang = sanitize_text(raw, limits.max_label_chars).to_lowercase();
    (!lang.is_empty()).then_some(lang)
}

fn sanitize_interests(raw: &[String], limits: &ProfileLimits) -> BTreeSet<String> {
    let mut interests = BTreeSet::new();
    for interest in raw {
        if interests.len() == limits.max_interests {
            break;
        }
        let interest = sanitize_text(interest, limits.max_label_chars);
        if !interest.is_empty() {
            interests.insert(interest);
        }
    }
    interests
}
