//! The translation port.
//!
//! Translation is an external capability. The relay asks a [`Translator`]
//! to rewrite each chat line into the partner's language and never lets a
//! slow or failing provider hold up delivery: after
//! [`RelayConfig::translation_timeout`](crate::RelayConfig::translation_timeout)
//! or on any error, the partner simply gets the original text.

use std::future::Future;
use std::time::Duration;

/// Source-language value meaning "let the provider detect it".
pub const AUTO_DETECT: &str = "auto";

/// Errors a translation provider may report.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// The provider answered with an error or could not be reached.
    #[error("translation provider failed: {0}")]
    Provider(String),

    /// The provider does not handle this language pair.
    #[error("unsupported language pair {source_lang} → {target_lang}")]
    Unsupported {
        source_lang: String,
        target_lang: String,
    },
}

/// Rewrites text from one language into another.
///
/// # Example
///
/// ```rust
/// use tandem::{TranslateError, Translator};
///
/// /// Shouts everything. Not very useful.
/// struct Shouty;
///
/// impl Translator for Shouty {
///     async fn translate(
///         &self,
///         text: &str,
///         _source: &str,
///         _target: &str,
///     ) -> Result<String, TranslateError> {
///         Ok(text.to_uppercase())
///     }
/// }
/// ```
pub trait Translator: Send + Sync + 'static {
    /// Translates `text` from `source` (or [`AUTO_DETECT`]) into `target`.
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> impl Future<Output = Result<String, TranslateError>> + Send;
}

/// A translator that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Translator for Passthrough {
    async fn translate(
        &self,
        text: &str,
        _source: &str,
        _target: &str,
    ) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }
}

/// Translates with a deadline, falling back to the original text.
///
/// Never fails: provider errors and timeouts are logged and swallowed.
pub async fn translate_or_original<T: Translator>(
    translator: &T,
    text: &str,
    target: &str,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, translator.translate(text, AUTO_DETECT, target)).await {
        Ok(Ok(translated)) => translated,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, target, "translation failed, relaying original");
            text.to_string()
        }
        Err(_) => {
            tracing::warn!(?timeout, target, "translation timed out, relaying original");
            text.to_string()
        }
    }
}
