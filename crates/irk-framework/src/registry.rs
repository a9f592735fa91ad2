//! The handler registry.
//!
//! The registry keeps one ordered sequence of [`Entry`] values per
//! [`EventClass`]. New entries are always inserted at the front, so the most
//! recently loaded handler is the first one the dispatcher evaluates.
//!
//! Locks are only held for the duration of a single insert, retain or
//! snapshot and never across an `.await`; the dispatcher works on a
//! [`Registry::entries_for`] snapshot, so a registry mutation never disturbs
//! a dispatch that is already walking the sequence.

use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, error};

use irk_core::{EventClass, Pattern, error::panic_message};

use crate::handler::{BoxedHandler, Handler};

// =============================================================================
// Entry
// =============================================================================

/// An immutable `(source, pattern, handler)` registry entry.
pub struct Entry {
    source: Arc<str>,
    name: Arc<str>,
    pattern: Pattern,
    handler: Arc<dyn Handler>,
}

impl Entry {
    /// Creates an entry that owns `handler`.
    pub fn new(source: impl Into<Arc<str>>, pattern: Pattern, handler: BoxedHandler) -> Self {
        Self::from_shared(source, pattern, Arc::from(handler))
    }

    /// Creates an entry around an already shared handler.
    ///
    /// Two entries built from the same `Arc` are the same handler for
    /// deduplication and unload purposes.
    pub fn from_shared(
        source: impl Into<Arc<str>>,
        pattern: Pattern,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            source: source.into(),
            name: Arc::from(handler.type_name()),
            pattern,
            handler,
        }
    }

    /// Sets the name the entry is selected by on unload.
    ///
    /// Defaults to the handler's type name; the loader uses the name of the
    /// factory the handler was built by.
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// The name of the package the handler was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn source_arc(&self) -> &Arc<str> {
        &self.source
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// The name this entry is loaded and unloaded by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handler's type name.
    pub fn type_name(&self) -> &'static str {
        self.handler.type_name()
    }

    /// Identity of the handler instance, stable for the entry's lifetime.
    pub fn handler_id(&self) -> usize {
        Arc::as_ptr(&self.handler) as *const () as usize
    }

    fn matches_removal(&self, source: &str, name: Option<&str>) -> bool {
        &*self.source == source && name.is_none_or(|name| &*self.name == name)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("source", &self.source)
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("handler", &self.type_name())
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Three ordered handler sequences, one per event class.
#[derive(Default)]
pub struct Registry {
    sequences: [RwLock<Vec<Arc<Entry>>>; 3],
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sequence(&self, class: EventClass) -> &RwLock<Vec<Arc<Entry>>> {
        &self.sequences[class.index()]
    }

    /// Prepends `entry` to the sequence for `class`.
    ///
    /// No uniqueness is enforced; a later entry shadows earlier ones with the
    /// same rule.
    pub fn insert(&self, class: EventClass, entry: Entry) {
        debug!(
            class = %class,
            source = entry.source(),
            handler = entry.type_name(),
            rule = entry.pattern().rule(),
            "Registering handler"
        );
        self.sequence(class).write().insert(0, Arc::new(entry));
    }

    /// Returns a snapshot of the sequence for `class`, in dispatch order.
    pub fn entries_for(&self, class: EventClass) -> Vec<Arc<Entry>> {
        self.sequence(class).read().clone()
    }

    /// Removes every entry of `source`, across all classes, whose
    /// [`name`](Entry::name) equals `name` when one is given.
    ///
    /// Each removed handler's `unload` runs exactly once, even if the handler
    /// was registered more than once. Returns the number of entries removed;
    /// removing an unknown source is a no-op.
    pub async fn remove(&self, source: &str, name: Option<&str>) -> usize {
        let mut removed = Vec::new();
        for sequence in &self.sequences {
            sequence.write().retain(|entry| {
                if entry.matches_removal(source, name) {
                    removed.push(Arc::clone(entry));
                    false
                } else {
                    true
                }
            });
        }

        unload_each(&removed).await;
        removed.len()
    }

    /// Removes every entry and unloads every handler.
    pub async fn clear(&self) -> usize {
        let mut removed = Vec::new();
        for sequence in &self.sequences {
            removed.append(&mut *sequence.write());
        }

        unload_each(&removed).await;
        removed.len()
    }

    /// Total number of entries across all classes.
    pub fn len(&self) -> usize {
        self.sequences.iter().map(|s| s.read().len()).sum()
    }

    /// Number of entries registered for `class`.
    pub fn len_of(&self, class: EventClass) -> usize {
        self.sequence(class).read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct source names currently present, in first-seen order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for sequence in &self.sequences {
            for entry in sequence.read().iter() {
                if seen.insert(entry.source().to_string()) {
                    out.push(entry.source().to_string());
                }
            }
        }
        out
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for class in EventClass::ALL {
            map.entry(&class.as_str(), &self.len_of(class));
        }
        map.finish()
    }
}

/// Calls `unload` once per distinct handler in `entries`.
async fn unload_each(entries: &[Arc<Entry>]) {
    let mut unloaded = HashSet::new();
    for entry in entries {
        if !unloaded.insert(entry.handler_id()) {
            continue;
        }
        let result = AssertUnwindSafe(entry.handler().unload())
            .catch_unwind()
            .await;
        match result {
            Ok(()) => debug!(
                source = entry.source(),
                handler = entry.type_name(),
                "Handler unloaded"
            ),
            Err(payload) => error!(
                source = entry.source(),
                handler = entry.type_name(),
                panic = %panic_message(payload.as_ref()),
                "Handler panicked while unloading"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Counting, Other};

    fn entry(source: &str, handler: Arc<dyn Handler>) -> Entry {
        let pattern = Pattern::compile(handler.rule()).unwrap();
        Entry::from_shared(source, pattern, handler)
    }

    #[test]
    fn test_insert_is_lifo() {
        let registry = Registry::new();
        let a = Counting::shared("a");
        let b = Counting::shared("b");
        registry.insert(EventClass::Message, entry("first", a));
        registry.insert(EventClass::Message, entry("second", b));

        let sources: Vec<_> = registry
            .entries_for(EventClass::Message)
            .iter()
            .map(|e| e.source().to_string())
            .collect();
        assert_eq!(sources, ["second", "first"]);
        assert_eq!(registry.len_of(EventClass::Command), 0);
        assert_eq!(registry.sources(), ["second", "first"]);
    }

    #[tokio::test]
    async fn test_remove_unloads_each_handler_once() {
        let registry = Registry::new();
        let shared = Counting::new("x");
        let handler: Arc<dyn Handler> = shared.clone();
        registry.insert(EventClass::Message, entry("pkg", handler.clone()));
        registry.insert(EventClass::Command, entry("pkg", handler));
        registry.insert(EventClass::Message, entry("other", Counting::shared("y")));

        assert_eq!(registry.remove("pkg", None).await, 2);
        assert_eq!(shared.unloads(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.entries_for(EventClass::Command).is_empty());
    }

    #[tokio::test]
    async fn test_remove_by_type_name() {
        let registry = Registry::new();
        let keep = Counting::new("keep");
        let gone = Other::new("gone");
        registry.insert(EventClass::Message, entry("pkg", keep.clone()));
        registry.insert(EventClass::Message, entry("pkg", gone.clone()));

        assert_eq!(registry.remove("pkg", Some("Other")).await, 1);
        assert_eq!(gone.unloads(), 1);
        assert_eq!(keep.unloads(), 0);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_source_is_noop() {
        let registry = Registry::new();
        registry.insert(EventClass::Membership, entry("pkg", Counting::shared("k")));
        assert_eq!(registry.remove("nope", None).await, 0);
        assert_eq!(registry.remove("nope", Some("Counting")).await, 0);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = Registry::new();
        let h = Counting::new("a");
        registry.insert(EventClass::Message, entry("one", h.clone()));
        registry.insert(EventClass::Command, entry("two", Counting::shared("b")));
        assert_eq!(registry.clear().await, 2);
        assert!(registry.is_empty());
        assert_eq!(h.unloads(), 1);
    }
}
