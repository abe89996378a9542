//! Locale metadata and string bundles

use serde::Serialize;
use std::collections::HashMap;

/// A selectable locale for the language picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocaleInfo {
    pub code: &'static str,
    /// English name
    pub name: &'static str,
    /// Name in the locale's own script
    pub native: &'static str,
}

/// Every locale the application can switch to
pub const SUPPORTED_LOCALES: &[LocaleInfo] = &[
    LocaleInfo { code: "en", name: "English", native: "English" },
    LocaleInfo { code: "hi", name: "Hindi", native: "हिन्दी" },
    LocaleInfo { code: "bn", name: "Bengali", native: "বাংলা" },
    LocaleInfo { code: "ta", name: "Tamil", native: "தமிழ்" },
    LocaleInfo { code: "te", name: "Telugu", native: "తెలుగు" },
    LocaleInfo { code: "mr", name: "Marathi", native: "मराठी" },
    LocaleInfo { code: "gu", name: "Gujarati", native: "ગુજરાતી" },
    LocaleInfo { code: "kn", name: "Kannada", native: "ಕನ್ನಡ" },
    LocaleInfo { code: "ml", name: "Malayalam", native: "മലയാളം" },
    LocaleInfo { code: "pa", name: "Punjabi", native: "ਪੰਜਾਬੀ" },
    LocaleInfo { code: "or", name: "Odia", native: "ଓଡ଼ିଆ" },
    LocaleInfo { code: "as", name: "Assamese", native: "অসমীয়া" },
    LocaleInfo { code: "ur", name: "Urdu", native: "اردو" },
];

/// Look up a supported locale by code
pub fn find_locale(code: &str) -> Option<&'static LocaleInfo> {
    SUPPORTED_LOCALES.iter().find(|info| info.code == code)
}

/// Localized strings for one locale
///
/// May be partial; missing keys fall back to the default locale.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocaleBundle {
    pub code: String,
    pub strings: HashMap<String, String>,
}

impl LocaleBundle {
    pub fn new(code: impl Into<String>, strings: HashMap<String, String>) -> Self {
        Self {
            code: code.into(),
            strings,
        }
    }

    /// Value for `key`, treating empty values as absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
