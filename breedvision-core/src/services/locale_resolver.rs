//! Active locale and string resolution
//!
//! Bundles are nested TOML tables flattened to dotted keys
//! (`[result] match = "Match"` becomes `result.match`). Lookups never fail:
//! a key missing from the active bundle falls back to the default locale,
//! and a key missing there too renders as a visible marker.

use crate::error::LocaleError;
use crate::lock_or_recover;
use crate::models::{find_locale, LocaleBundle, LocaleInfo, SUPPORTED_LOCALES};
use crate::providers::LocaleStore;
use breedvision_common::events::{BreedVisionEvent, EventBus};
use breedvision_common::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Storage key under which the selected locale code is persisted
pub const LOCALE_STORAGE_KEY: &str = "selectedLanguage";

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.toml")),
    ("hi", include_str!("../../locales/hi.toml")),
    ("ta", include_str!("../../locales/ta.toml")),
    ("bn", include_str!("../../locales/bn.toml")),
];

/// Marker rendered for a key absent from every bundle
pub fn missing_marker(key: &str) -> String {
    format!("[missing: {}]", key)
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) -> Result<()> {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        match value {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(nested) => flatten(&key, nested, out)?,
            other => {
                return Err(Error::Config(format!(
                    "locale key {} must be a string, found {}",
                    key,
                    other.type_str()
                )))
            }
        }
    }
    Ok(())
}

/// Parse one nested TOML bundle
pub fn parse_bundle(code: &str, source: &str) -> Result<LocaleBundle> {
    let table: toml::Table = source.parse()?;
    let mut strings = HashMap::new();
    flatten("", &table, &mut strings)?;
    Ok(LocaleBundle::new(code, strings))
}

/// All loaded bundles keyed by locale code
#[derive(Debug, Clone, Default)]
pub struct LocaleCatalog {
    bundles: HashMap<String, LocaleBundle>,
}

impl LocaleCatalog {
    /// Bundles compiled into the binary
    ///
    /// Every supported locale gets a bundle, empty when no translation ships
    /// for it, so it resolves entirely through the default locale.
    pub fn builtin() -> Result<Self> {
        let mut catalog = Self::default();
        for (code, source) in BUILTIN_SOURCES {
            catalog.insert(parse_bundle(code, source)?);
        }
        for info in SUPPORTED_LOCALES {
            catalog
                .bundles
                .entry(info.code.to_string())
                .or_insert_with(|| LocaleBundle::new(info.code, HashMap::new()));
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, bundle: LocaleBundle) {
        self.bundles.insert(bundle.code.clone(), bundle);
    }

    pub fn with_bundle(mut self, bundle: LocaleBundle) -> Self {
        self.insert(bundle);
        self
    }

    pub fn bundle(&self, code: &str) -> Option<&LocaleBundle> {
        self.bundles.get(code)
    }
}

/// Owns the active locale
///
/// The active code is persisted through the `LocaleStore` and announced on
/// the event bus; resolution is total over all keys.
pub struct LocaleResolver {
    catalog: LocaleCatalog,
    default_code: String,
    active: Mutex<String>,
    store: Arc<dyn LocaleStore>,
    event_bus: EventBus,
}

impl LocaleResolver {
    /// Initial locale is the persisted one when supported, else `default_code`
    pub fn new(
        catalog: LocaleCatalog,
        default_code: &str,
        store: Arc<dyn LocaleStore>,
        event_bus: EventBus,
    ) -> std::result::Result<Self, LocaleError> {
        if find_locale(default_code).is_none() || catalog.bundle(default_code).is_none() {
            return Err(LocaleError::Unsupported(default_code.to_string()));
        }

        let active = match store.get(LOCALE_STORAGE_KEY) {
            Some(code) if find_locale(&code).is_some() => code,
            Some(code) => {
                warn!(code = %code, "Ignoring unsupported persisted locale");
                default_code.to_string()
            }
            None => default_code.to_string(),
        };
        info!(locale = %active, default = %default_code, "Locale resolver initialized");

        Ok(Self {
            catalog,
            default_code: default_code.to_string(),
            active: Mutex::new(active),
            store,
            event_bus,
        })
    }

    /// Switch the active locale
    ///
    /// Persists and notifies within one step. The write is skipped when the
    /// store already holds `code`; notification always happens. A failed
    /// write is logged and the switch proceeds for this process.
    pub fn set_locale(&self, code: &str) -> std::result::Result<(), LocaleError> {
        if !self.is_supported(code) {
            return Err(LocaleError::Unsupported(code.to_string()));
        }

        let mut active = lock_or_recover(&self.active);
        let old_code = active.clone();
        if self.store.get(LOCALE_STORAGE_KEY).as_deref() != Some(code) {
            if let Err(e) = self.store.set(LOCALE_STORAGE_KEY, code) {
                warn!(code = %code, error = %e, "Failed to persist locale selection");
            }
        }
        if old_code != code {
            *active = code.to_string();
            info!(old = %old_code, new = %code, "Locale changed");
        }

        self.event_bus.emit_lossy(BreedVisionEvent::LocaleChanged {
            old_code,
            new_code: code.to_string(),
            timestamp: breedvision_common::time::now(),
        });
        Ok(())
    }

    /// Localized string for `key` in the active locale
    pub fn resolve(&self, key: &str) -> String {
        let active = lock_or_recover(&self.active).clone();
        self.resolve_in(&active, key)
    }

    /// Localized string for `key` in a specific locale, with fallback
    pub fn resolve_in(&self, code: &str, key: &str) -> String {
        if let Some(value) = self.catalog.bundle(code).and_then(|b| b.get(key)) {
            return value.to_string();
        }
        if let Some(value) = self.catalog.bundle(&self.default_code).and_then(|b| b.get(key)) {
            return value.to_string();
        }
        debug!(key = %key, locale = %code, "No translation in any bundle");
        missing_marker(key)
    }

    pub fn active_code(&self) -> String {
        lock_or_recover(&self.active).clone()
    }

    pub fn active_locale(&self) -> &'static LocaleInfo {
        let code = self.active_code();
        find_locale(&code).unwrap_or(&SUPPORTED_LOCALES[0])
    }

    pub fn available(&self) -> &'static [LocaleInfo] {
        SUPPORTED_LOCALES
    }

    pub fn is_supported(&self, code: &str) -> bool {
        find_locale(code).is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreedVisionEvent> {
        self.event_bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryLocaleStore;

    fn resolver_with(store: Arc<MemoryLocaleStore>) -> LocaleResolver {
        LocaleResolver::new(
            LocaleCatalog::builtin().unwrap(),
            "en",
            store,
            EventBus::new(16),
        )
        .unwrap()
    }

    #[test]
    fn test_builtin_catalog_flattens_nested_tables() {
        let catalog = LocaleCatalog::builtin().unwrap();
        let en = catalog.bundle("en").unwrap();
        assert_eq!(en.get("result.match"), Some("Match"));
        assert_eq!(en.get("auth.error.weak_password"), Some("Password must be at least 6 characters."));
        for info in SUPPORTED_LOCALES {
            assert!(catalog.bundle(info.code).is_some(), "no bundle for {}", info.code);
        }
    }

    #[test]
    fn test_non_string_value_rejected() {
        assert!(matches!(parse_bundle("en", "[app]\ntitle = 3"), Err(Error::Config(_))));
    }

    #[test]
    fn test_persisted_locale_restored() {
        let store = Arc::new(MemoryLocaleStore::new().with_value(LOCALE_STORAGE_KEY, "hi"));
        let resolver = resolver_with(store);
        assert_eq!(resolver.active_code(), "hi");
        assert_eq!(resolver.active_locale().native, "हिन्दी");
    }

    #[test]
    fn test_unsupported_persisted_locale_ignored() {
        let store = Arc::new(MemoryLocaleStore::new().with_value(LOCALE_STORAGE_KEY, "xx"));
        assert_eq!(resolver_with(store).active_code(), "en");
    }

    #[test]
    fn test_unsupported_default_rejected() {
        let result = LocaleResolver::new(
            LocaleCatalog::builtin().unwrap(),
            "zz",
            Arc::new(MemoryLocaleStore::new()),
            EventBus::new(4),
        );
        assert!(matches!(result, Err(LocaleError::Unsupported(code)) if code == "zz"));
    }

    #[test]
    fn test_fallback_to_default_then_marker() {
        let store = Arc::new(MemoryLocaleStore::new());
        let resolver = resolver_with(store);
        resolver.set_locale("hi").unwrap();

        assert_eq!(resolver.resolve("result.match"), "मिलान");
        // hi ships no malformed-response string
        assert_eq!(
            resolver.resolve("analysis.error.malformed"),
            resolver.resolve_in("en", "analysis.error.malformed")
        );
        assert_eq!(resolver.resolve("no.such.key"), "[missing: no.such.key]");
    }

    #[test]
    fn test_empty_value_falls_back() {
        let mut strings = HashMap::new();
        strings.insert("result.match".to_string(), String::new());
        let catalog = LocaleCatalog::builtin()
            .unwrap()
            .with_bundle(LocaleBundle::new("te", strings));
        let resolver = LocaleResolver::new(
            catalog,
            "en",
            Arc::new(MemoryLocaleStore::new().with_value(LOCALE_STORAGE_KEY, "te")),
            EventBus::new(4),
        )
        .unwrap();
        assert_eq!(resolver.resolve("result.match"), "Match");
    }

    #[test]
    fn test_set_same_locale_notifies_without_write() {
        let store = Arc::new(MemoryLocaleStore::new().with_value(LOCALE_STORAGE_KEY, "en"));
        let resolver = resolver_with(store.clone());
        let mut rx = resolver.subscribe();

        resolver.set_locale("en").unwrap();
        assert_eq!(store.write_count(), 0);
        assert!(matches!(
            rx.try_recv().unwrap(),
            BreedVisionEvent::LocaleChanged { old_code, new_code, .. } if old_code == "en" && new_code == "en"
        ));
    }

    #[test]
    fn test_reselecting_active_locale_overwrites_stale_stored_code() {
        let store = Arc::new(MemoryLocaleStore::new().with_value(LOCALE_STORAGE_KEY, "xx"));
        let resolver = resolver_with(store.clone());
        assert_eq!(resolver.active_code(), "en");

        resolver.set_locale("en").unwrap();
        assert_eq!(store.get(LOCALE_STORAGE_KEY).as_deref(), Some("en"));
        assert_eq!(store.write_count(), 1);

        resolver.set_locale("en").unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_unsupported_set_leaves_state_untouched() {
        let store = Arc::new(MemoryLocaleStore::new());
        let resolver = resolver_with(store.clone());
        let mut rx = resolver.subscribe();

        assert_eq!(
            resolver.set_locale("zz"),
            Err(LocaleError::Unsupported("zz".to_string()))
        );
        assert_eq!(resolver.active_code(), "en");
        assert_eq!(store.write_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    struct FailingStore;

    impl LocaleStore for FailingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("disk full".to_string()))
        }
    }

    #[test]
    fn test_storage_failure_does_not_block_switch() {
        let resolver = LocaleResolver::new(
            LocaleCatalog::builtin().unwrap(),
            "en",
            Arc::new(FailingStore),
            EventBus::new(4),
        )
        .unwrap();
        resolver.set_locale("ta").unwrap();
        assert_eq!(resolver.active_code(), "ta");
        assert_eq!(resolver.resolve("result.match"), "பொருத்தம்");
    }
}
