//! Ordered, name-indexed element registry.
//!
//! The [`Registry`] is the single reusable abstraction for every "named,
//! ordered, deduplicated collection" need in the tool: discovered design
//! units, libraries, file groups. It keeps an insertion-ordered sequence
//! alongside a case-normalized name index, trading a small memory overhead
//! for O(1) lookup without sacrificing deterministic iteration order —
//! build and test ordering must be reproducible.

use std::collections::HashMap;

/// Registry name used when none is supplied.
const DEFAULT_NAME: &str = "no_name";

/// Errors for registry contract violations.
///
/// These are usage errors: callers that trip them have a programming bug,
/// and the error propagates rather than being absorbed. Routine misses
/// (absent names) are `Option::None`, never errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// An index outside `[0, len)` was passed to [`Registry::get_by_index`].
    #[error("registry index {index} out of range for {len} elements")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The registry size at the time of access.
        len: usize,
    },

    /// [`Registry::update`] was called with an element that has no name.
    #[error("registry element has no name to match on")]
    Unnamed,
}

/// Capability trait for elements stored in a [`Registry`].
///
/// Elements returning `Some(name)` are indexed and deduplicated by their
/// case-normalized name. Elements returning `None` still get ordered
/// membership, deduplicated by equality instead of name.
pub trait RegistryItem {
    /// The element's name, if it has one.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// An insertion-ordered collection with O(1) case-insensitive name lookup.
///
/// Invariant: the ordered sequence and the name index are always in sync —
/// every named element appears in the index exactly once and vice versa,
/// and insertion order is preserved across updates.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    name: String,
    items: Vec<T>,
    by_name: HashMap<String, usize>,
}

impl<T: RegistryItem + PartialEq> Registry<T> {
    /// Creates an empty registry with the default name.
    pub fn new() -> Self {
        Self::with_name(DEFAULT_NAME)
    }

    /// Creates an empty registry with the given name (case-normalized).
    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            items: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Returns the registry's own (case-normalized) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the registry (case-normalized).
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_lowercase();
    }

    /// Inserts an element, returning `true` if insertion occurred.
    ///
    /// Named elements are rejected when another element already holds the
    /// same case-normalized name; nameless elements are rejected when an
    /// equal element is already present. A duplicate is a silent no-op,
    /// not an error.
    pub fn add(&mut self, element: T) -> bool {
        match element.name() {
            Some(name) => {
                let key = name.to_lowercase();
                if self.by_name.contains_key(&key) {
                    return false;
                }
                self.by_name.insert(key, self.items.len());
                self.items.push(element);
                true
            }
            None => {
                if self.items.contains(&element) {
                    return false;
                }
                self.items.push(element);
                true
            }
        }
    }

    /// Applies [`Registry::add`] to each element in order.
    pub fn add_many<I: IntoIterator<Item = T>>(&mut self, elements: I) {
        for element in elements {
            self.add(element);
        }
    }

    /// Returns the element at `index`, or an out-of-range error.
    pub fn get_by_index(&self, index: usize) -> Result<&T, RegistryError> {
        self.items.get(index).ok_or(RegistryError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Looks up an element by case-insensitive name.
    ///
    /// A missing name is routine control flow and yields `None`, never an
    /// error.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&idx| &self.items[idx])
    }

    /// Returns the full ordered sequence as a read-only view.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Removes the element with the given case-normalized name.
    ///
    /// No-ops if the name is absent. Positions of the remaining elements
    /// are preserved and the name index is kept in sync.
    pub fn remove(&mut self, name: &str) {
        let key = name.to_lowercase();
        if let Some(idx) = self.by_name.remove(&key) {
            self.items.remove(idx);
            for slot in self.by_name.values_mut() {
                if *slot > idx {
                    *slot -= 1;
                }
            }
        }
    }

    /// Returns `true` if an element with the given name is present.
    pub fn exists(&self, name: &str) -> bool {
        self.by_name.contains_key(&name.to_lowercase())
    }

    /// Returns the number of stored elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the registry holds no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes all elements.
    pub fn clear(&mut self) {
        self.items.clear();
        self.by_name.clear();
    }

    /// Replaces the stored element whose name matches `element`'s name,
    /// in place and position-preserving.
    ///
    /// Returns `Ok(true)` if a match was replaced, `Ok(false)` if no stored
    /// element carries that name, and [`RegistryError::Unnamed`] if the
    /// incoming element cannot be compared by name at all.
    pub fn update(&mut self, element: T) -> Result<bool, RegistryError> {
        let name = element.name().ok_or(RegistryError::Unnamed)?;
        match self.by_name.get(&name.to_lowercase()) {
            Some(&idx) => {
                self.items[idx] = element;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<T: RegistryItem + PartialEq> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
