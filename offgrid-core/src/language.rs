//! Site language, derived from the URL path.
//!
//! Chinese pages live at the root (`/cities/`), English pages under `/en/`.
//! The caching core only needs the language for cosmetic offline messaging
//! and for localizing predicted navigation targets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A language the site is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Simplified Chinese, served from the root.
    #[default]
    Zh,
    /// English, served under `/en/`.
    En,
}

impl Language {
    /// Detects the language of a page from its path.
    ///
    /// ```
    /// use offgrid_core::Language;
    ///
    /// assert_eq!(Language::from_path("/en/cities/"), Language::En);
    /// assert_eq!(Language::from_path("/cities/"), Language::Zh);
    /// assert_eq!(Language::from_path("/enroll"), Language::Zh);
    /// ```
    pub fn from_path(path: &str) -> Self {
        if path == "/en" || path.starts_with("/en/") {
            Language::En
        } else {
            Language::Zh
        }
    }

    /// Path prefix of this language (empty for the root language).
    pub fn prefix(&self) -> &'static str {
        match self {
            Language::Zh => "",
            Language::En => "/en",
        }
    }

    /// Rewrites a root-relative path into this language.
    pub fn localize(&self, path: &str) -> String {
        format!("{}{}", self.prefix(), path)
    }

    /// Short language code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }

    /// Banner text shown while the page has no connectivity.
    pub fn offline_notice(&self) -> &'static str {
        match self {
            Language::Zh => "您当前处于离线状态，部分内容可能无法访问",
            Language::En => "You are offline. Some content may be unavailable.",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
