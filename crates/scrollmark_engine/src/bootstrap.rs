//! Default seeding and typed access to the settings tier.

use scrollmark_core::{
    validate_bindings, ChordBinding, MarkSet, Settings, SettingsError, UrlMarkIndex,
    CAPTURED_TAB_SIZE, MARK_KEY, PERMANENT_MARKS, SCROLL_KEY, URLS,
};
use scrollmark_logging::{scrollmark_info, scrollmark_warn};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::storage::{get_typed, KeyValueStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum SaveSettingsError {
    #[error(transparent)]
    Invalid(#[from] SettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Default value of every settings key, in seeding order.
pub fn default_entries() -> Vec<(&'static str, Value)> {
    let defaults = Settings::default();
    vec![
        (MARK_KEY, binding_value(&defaults.mark_key)),
        (SCROLL_KEY, binding_value(&defaults.scroll_key)),
        (CAPTURED_TAB_SIZE, Value::String(defaults.captured_tab_size)),
        (PERMANENT_MARKS, Value::Bool(defaults.permanent_marks)),
        (URLS, json!({})),
    ]
}

/// Writes the default of each key that is absent or malformed, one key at a
/// time. Valid stored values are never touched, so new keys added by an
/// upgrade get their defaults without clobbering the user's settings.
///
/// Returns the keys that were written.
pub async fn seed_defaults(store: &dyn KeyValueStore) -> Result<Vec<&'static str>, StorageError> {
    let mut seeded = Vec::new();
    for (key, default) in default_entries() {
        let current = store.get(key).await?;
        if current.as_ref().is_some_and(|value| is_well_formed(key, value)) {
            continue;
        }
        if current.is_some() {
            scrollmark_warn!("Stored setting {} is malformed; restoring default", key);
        }
        store.set(key, default).await?;
        seeded.push(key);
    }
    if !seeded.is_empty() {
        scrollmark_info!("Seeded default settings: {:?}", seeded);
    }
    Ok(seeded)
}

/// Reads the settings, falling back to the default for each key that is
/// missing, malformed or unreadable.
pub async fn load_settings(store: &dyn KeyValueStore) -> Settings {
    let defaults = Settings::default();
    Settings {
        mark_key: read_or(store, MARK_KEY, defaults.mark_key, |b: &ChordBinding| {
            b.keys.is_valid()
        })
        .await,
        scroll_key: read_or(store, SCROLL_KEY, defaults.scroll_key, |b: &ChordBinding| {
            b.keys.is_valid()
        })
        .await,
        captured_tab_size: read_or(store, CAPTURED_TAB_SIZE, defaults.captured_tab_size, |_| true)
            .await,
        permanent_marks: read_or(store, PERMANENT_MARKS, defaults.permanent_marks, |_| true).await,
    }
}

/// Reads the per-URL mark index. Entries are decoded one by one, so a
/// malformed entry is skipped without hiding the marks of other pages. A
/// value that is not an object reads as empty.
pub async fn load_url_index(store: &dyn KeyValueStore) -> Result<UrlMarkIndex, StorageError> {
    let entries = match store.get(URLS).await? {
        Some(Value::Object(entries)) => entries,
        Some(_) => {
            scrollmark_warn!("Ignoring {}: not an object", URLS);
            return Ok(UrlMarkIndex::new());
        }
        None => return Ok(UrlMarkIndex::new()),
    };

    let mut index = UrlMarkIndex::new();
    for (url, entry) in entries {
        match serde_json::from_value::<MarkSet>(entry) {
            Ok(marks) => {
                index.insert(url, marks);
            }
            Err(err) => scrollmark_warn!("Skipping malformed marks for {}: {}", url, err),
        }
    }
    Ok(index)
}

/// Validates and stores the user's settings. Nothing is written when the
/// chords break the rules.
pub async fn save_settings(
    store: &dyn KeyValueStore,
    settings: &Settings,
) -> Result<(), SaveSettingsError> {
    save_bindings(store, &settings.mark_key, &settings.scroll_key).await?;
    store
        .set(CAPTURED_TAB_SIZE, Value::String(settings.captured_tab_size.clone()))
        .await?;
    store
        .set(PERMANENT_MARKS, Value::Bool(settings.permanent_marks))
        .await?;
    Ok(())
}

/// Writes both chord bindings, as the options page does, once they are
/// valid and distinct.
pub async fn save_bindings(
    store: &dyn KeyValueStore,
    mark_key: &ChordBinding,
    scroll_key: &ChordBinding,
) -> Result<(), SaveSettingsError> {
    validate_bindings(mark_key, scroll_key)?;
    store.set(MARK_KEY, binding_value(mark_key)).await?;
    store.set(SCROLL_KEY, binding_value(scroll_key)).await?;
    Ok(())
}

fn binding_value(binding: &ChordBinding) -> Value {
    json!({
        "string": binding.string,
        "keys": {
            "ctrl": binding.keys.ctrl,
            "alt": binding.keys.alt,
            "shift": binding.keys.shift,
            "key": binding.keys.key,
        },
    })
}

fn is_well_formed(key: &str, value: &Value) -> bool {
    match key {
        MARK_KEY | SCROLL_KEY => decodes_as::<ChordBinding>(value, |b| b.keys.is_valid()),
        CAPTURED_TAB_SIZE => value.is_string(),
        PERMANENT_MARKS => value.is_boolean(),
        URLS => value.is_object(),
        _ => true,
    }
}

fn decodes_as<T: DeserializeOwned>(value: &Value, accept: impl Fn(&T) -> bool) -> bool {
    serde_json::from_value::<T>(value.clone())
        .map(|decoded| accept(&decoded))
        .unwrap_or(false)
}

async fn read_or<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
    default: T,
    accept: impl Fn(&T) -> bool,
) -> T {
    match get_typed::<T>(store, key).await {
        Ok(Some(value)) if accept(&value) => value,
        Ok(Some(_)) => {
            scrollmark_warn!("Stored setting {} is invalid; using default", key);
            default
        }
        Ok(None) => default,
        Err(err) => {
            scrollmark_warn!("Could not read setting {}: {}", key, err);
            default
        }
    }
}
