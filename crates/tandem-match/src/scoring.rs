//! Who may be paired with whom, and how good the pairing is.

use tandem_identity::Identity;

/// Returns `true` when each side speaks what the other is learning.
pub fn is_reciprocal(a: &Identity, b: &Identity) -> bool {
    a.native_language == b.target_language && a.target_language == b.native_language
}

/// Scores a potential pairing: 1 for reciprocity plus one per shared
/// interest. `None` when the pair is not reciprocal.
pub fn score(candidate: &Identity, partner: &Identity) -> Option<usize> {
    is_reciprocal(candidate, partner)
        .then(|| 1 + candidate.interests.intersection(&partner.interests).count())
}

/// The interests both sides listed, in sorted order.
pub fn shared_interests(a: &Identity, b: &Identity) -> Vec<String> {
    a.interests.intersection(&b.interests).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_protocol::IdentityId;

    fn person(id: u64, native: &str, target: &str, interests: &[&str]) -> Identity {
        Identity::new(IdentityId(id), format!("P{id}"))
            .with_languages(native, target)
            .with_interests(interests.iter().copied())
    }

    #[test]
    fn test_is_reciprocal_mirror_languages() {
        let a = person(1, "es", "en", &[]);
        let b = person(2, "en", "es", &[]);
        assert!(is_reciprocal(&a, &b));
        assert!(is_reciprocal(&b, &a));
    }

    #[test]
    fn test_is_reciprocal_one_sided_is_false() {
        // b speaks what a learns, but learns something a doesn't speak.
        let a = person(1, "es", "en", &[]);
        let b = person(2, "en", "fr", &[]);
        assert!(!is_reciprocal(&a, &b));
    }

    #[test]
    fn test_score_counts_shared_interests() {
        let a = person(1, "es", "en", &["music", "hiking", "film"]);
        let b = person(2, "en", "es", &["music", "film", "travel"]);
        assert_eq!(score(&a, &b), Some(3));
    }

    #[test]
    fn test_score_without_interests_is_base() {
        let a = person(1, "es", "en", &[]);
        let b = person(2, "en", "es", &["music"]);
        assert_eq!(score(&a, &b), Some(1));
    }

    #[test]
    fn test_score_non_reciprocal_is_none() {
        let a = person(1, "es", "en", &["music"]);
        let b = person(2, "es", "en", &["music"]);
        assert_eq!(score(&a, &b), None);
    }

    #[test]
    fn test_shared_interests_sorted() {
        let a = person(1, "es", "en", &["travel", "music", "art"]);
        let b = person(2, "en", "es", &["music", "art"]);
        assert_eq!(shared_interests(&a, &b), vec!["art", "music"]);
    }
}
