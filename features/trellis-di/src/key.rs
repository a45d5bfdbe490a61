use std::{borrow::Borrow, fmt, sync::Arc};

/// Identifier under which a component can be looked up.
///
/// Keys are interned strings, cheap to clone and hash. A component is
/// always reachable under its primary name and may carry alias keys on
/// top of it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Arc<str>);

impl Key {
    pub fn new(name: impl AsRef<str>) -> Self {
        Key(Arc::from(name.as_ref()))
    }

    /// Derives the public key for a Rust type: the last path segment of
    /// its type name, lower-camel-cased. `vault::UserService` becomes
    /// `userService`.
    pub fn of_type<T: ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let tail = base.rsplit("::").next().unwrap_or(base);

        let mut chars = tail.chars();
        let name = match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        };
        Key(Arc::from(name.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::new(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key(Arc::from(name.as_str()))
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

// Hash and Eq delegate to the inner str, so str lookups into key maps
// are sound.
impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}
