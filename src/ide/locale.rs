//! Known locales, the active selection and its observers.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::input::resource::{
    DEFAULT_LOCALE,
    OFF_LOCALE,
};
use crate::storage::{
    CURRENT_LANGUAGE_KEY,
    MemoryStateStore,
    StateStore,
};

const OFF_LABEL: &str = "🚫 Off";
const DEFAULT_LABEL: &str = "🌐 Default";
const CURRENT_SUFFIX: &str = " ✅ (Current)";

/// Language tag to flag glyph.
const FLAGS: &[(&str, &str)] = &[
    ("ar", "🇸🇦"),
    ("bg", "🇧🇬"),
    ("cs", "🇨🇿"),
    ("da", "🇩🇰"),
    ("de", "🇩🇪"),
    ("el", "🇬🇷"),
    ("en", "🇬🇧"),
    ("es", "🇪🇸"),
    ("et", "🇪🇪"),
    ("fi", "🇫🇮"),
    ("fr", "🇫🇷"),
    ("he", "🇮🇱"),
    ("hi", "🇮🇳"),
    ("hr", "🇭🇷"),
    ("hu", "🇭🇺"),
    ("id", "🇮🇩"),
    ("it", "🇮🇹"),
    ("ja", "🇯🇵"),
    ("ko", "🇰🇷"),
    ("lt", "🇱🇹"),
    ("lv", "🇱🇻"),
    ("nb", "🇳🇴"),
    ("nl", "🇳🇱"),
    ("no", "🇳🇴"),
    ("pl", "🇵🇱"),
    ("pt", "🇵🇹"),
    ("ro", "🇷🇴"),
    ("ru", "🇷🇺"),
    ("sk", "🇸🇰"),
    ("sl", "🇸🇮"),
    ("sr", "🇷🇸"),
    ("sv", "🇸🇪"),
    ("th", "🇹🇭"),
    ("tr", "🇹🇷"),
    ("uk", "🇺🇦"),
    ("vi", "🇻🇳"),
    ("zh", "🇨🇳"),
];

/// Flag glyph for a language tag, if one is known.
#[must_use]
pub fn flag_for(tag: &str) -> Option<&'static str> {
    FLAGS.iter().find(|(code, _)| code.eq_ignore_ascii_case(tag)).map(|(_, glyph)| *glyph)
}

/// Label shown for a discovered locale, e.g. `🇫🇷 FR`.
#[must_use]
pub fn label_for(tag: &str) -> String {
    match flag_for(tag) {
        Some(glyph) => format!("{glyph} {}", tag.to_uppercase()),
        None => tag.to_uppercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleEntry {
    pub tag: String,
    pub label: String,
    pub glyph: Option<&'static str>,
}

impl LocaleEntry {
    fn discovered(tag: &str) -> Self {
        Self { tag: tag.to_string(), label: label_for(tag), glyph: flag_for(tag) }
    }

    fn reserved(tag: &str, label: &str) -> Self {
        Self { tag: tag.to_string(), label: label.to_string(), glyph: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&str) + Send + Sync>;

/// Registry of locales and the active selection.
///
/// Observers run synchronously, in subscription order, inside
/// [`LocaleRegistry::set_active`]. They must not block.
pub struct LocaleRegistry {
    active: String,
    discovered: Vec<LocaleEntry>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    store: Arc<dyn StateStore>,
}

impl Default for LocaleRegistry {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStateStore::default()))
    }
}

impl LocaleRegistry {
    /// Creates a registry whose selection is restored from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        let mut registry = Self {
            active: DEFAULT_LOCALE.to_string(),
            discovered: Vec::new(),
            observers: Vec::new(),
            next_subscription: 0,
            store,
        };
        registry.restore();
        registry
    }

    /// Switches to another store and reloads the persisted selection.
    ///
    /// Observers are not notified.
    pub fn attach_store(&mut self, store: Arc<dyn StateStore>) {
        self.store = store;
        self.restore();
    }

    fn restore(&mut self) {
        self.active = match self.store.get(CURRENT_LANGUAGE_KEY) {
            Ok(Some(tag)) if !tag.is_empty() => tag,
            Ok(_) => DEFAULT_LOCALE.to_string(),
            Err(error) => {
                tracing::warn!(%error, "Failed to restore the selected locale");
                DEFAULT_LOCALE.to_string()
            }
        };
        tracing::debug!(active = %self.active, "Locale selection restored");
    }

    /// Raw selection, possibly `"Off"`.
    #[must_use]
    pub fn active(&self) -> &str {
        &self.active
    }

    /// Selection to look keys up in; `"Off"` reads as `"D"`.
    #[must_use]
    pub fn active_for_lookup(&self) -> &str {
        if self.active == OFF_LOCALE { DEFAULT_LOCALE } else { &self.active }
    }

    #[must_use]
    pub fn is_off(&self) -> bool {
        self.active == OFF_LOCALE
    }

    /// Discovered locales in discovery order.
    #[must_use]
    pub fn locales(&self) -> &[LocaleEntry] {
        &self.discovered
    }

    #[must_use]
    pub fn is_known(&self, tag: &str) -> bool {
        is_reserved(tag) || self.discovered.iter().any(|entry| entry.tag == tag)
    }

    /// Label of any known tag, reserved ones included.
    #[must_use]
    pub fn label(&self, tag: &str) -> String {
        match tag {
            OFF_LOCALE => OFF_LABEL.to_string(),
            DEFAULT_LOCALE => DEFAULT_LABEL.to_string(),
            _ => label_for(tag),
        }
    }

    /// Returns true if the locale was not known yet.
    pub fn add_locale(&mut self, tag: &str) -> bool {
        if tag.is_empty() || self.is_known(tag) {
            return false;
        }
        tracing::debug!(tag, "Locale discovered");
        self.discovered.push(LocaleEntry::discovered(tag));
        true
    }

    /// Drops a discovered locale; the active one falls back to `"D"`.
    ///
    /// Returns true if the locale was known. Reserved tags are never removed.
    pub fn remove_locale(&mut self, tag: &str) -> bool {
        let Some(position) = self.discovered.iter().position(|entry| entry.tag == tag) else {
            return false;
        };
        self.discovered.remove(position);
        tracing::debug!(tag, "Locale removed");

        if self.active == tag {
            self.set_active(DEFAULT_LOCALE);
        }
        true
    }

    /// Removes every discovered locale missing from `tags`.
    pub fn retain_discovered(&mut self, tags: &BTreeSet<String>) {
        let stale: Vec<String> = self
            .discovered
            .iter()
            .filter(|entry| !tags.contains(&entry.tag))
            .map(|entry| entry.tag.clone())
            .collect();
        for tag in stale {
            self.remove_locale(&tag);
        }
    }

    /// Falls back to `"D"` when the selection names no known locale.
    ///
    /// Returns true if the selection changed.
    pub fn validate_active(&mut self) -> bool {
        if self.is_known(&self.active) {
            return false;
        }
        tracing::info!(active = %self.active, "Selected locale is not available");
        self.set_active(DEFAULT_LOCALE);
        true
    }

    /// Sets, persists and broadcasts the selection.
    pub fn set_active(&mut self, tag: &str) {
        self.active = tag.to_string();

        if let Err(error) = self.store.set(CURRENT_LANGUAGE_KEY, tag) {
            tracing::warn!(%error, "Failed to persist the selected locale");
        }
        tracing::info!("Language set to {tag}");

        for (_, observer) in &self.observers {
            observer(tag);
        }
    }

    pub fn subscribe(&mut self, observer: impl Fn(&str) + Send + Sync + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns true if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }

    /// Picker entries: the reserved ones, then discovered locales.
    /// The active entry's label is marked as current.
    #[must_use]
    pub fn picker_items(&self) -> Vec<LocaleEntry> {
        let mut items = vec![
            LocaleEntry::reserved(OFF_LOCALE, OFF_LABEL),
            LocaleEntry::reserved(DEFAULT_LOCALE, DEFAULT_LABEL),
        ];
        items.extend(self.discovered.iter().cloned());

        if let Some(current) = items.iter_mut().find(|entry| entry.tag == self.active) {
            current.label.push_str(CURRENT_SUFFIX);
        }
        items
    }
}

impl std::fmt::Debug for LocaleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleRegistry")
            .field("active", &self.active)
            .field("discovered", &self.discovered)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

fn is_reserved(tag: &str) -> bool {
    tag == OFF_LOCALE || tag == DEFAULT_LOCALE
}
