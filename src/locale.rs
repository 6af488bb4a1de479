//! Persisted UI language preference.

use crate::error::Result;
use crate::store::{ConfigStore, keys};

/// Stored language tag; `None` means follow the system locale.
pub fn language(store: &dyn ConfigStore) -> Option<String> {
    store.get_string(keys::LANGUAGE).filter(|l| !l.is_empty())
}

/// Persist `lang`; `None` or an empty tag clears the preference.
pub fn set_language(store: &dyn ConfigStore, lang: Option<&str>) -> Result<()> {
    store.set_string(keys::LANGUAGE, lang.unwrap_or("").trim())
}

/// Locale identifier to activate for a stored tag.
pub fn locale_for(lang: &str) -> String {
    match lang {
        "zh" => "zh-CN".to_string(),
        other => other.to_string(),
    }
}
