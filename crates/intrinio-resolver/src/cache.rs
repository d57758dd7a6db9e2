use dashmap::DashMap;
use intrinio_core::Page;
use std::fmt;
use std::sync::Arc;

const SEPARATOR: char = '\u{1f}';

/// Normalized parameter tuple addressing one cached entry.
///
/// Absent and empty values are replaced by a sentinel that is distinct per
/// position, so `("", x)` and `(None, x)` share a key while `(None, x)` and
/// `(x, None)` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn builder() -> QueryKeyBuilder {
        QueryKeyBuilder::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.replace(SEPARATOR, "_"))
    }
}

#[derive(Debug, Default)]
pub struct QueryKeyBuilder {
    parts: Vec<String>,
}

impl QueryKeyBuilder {
    pub fn part(self, value: &str) -> Self {
        self.opt(Some(value))
    }

    pub fn opt(mut self, value: Option<&str>) -> Self {
        let position = self.parts.len() + 1;
        let part = match value {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => format!("\u{0}n{}", position),
        };
        self.parts.push(part);
        self
    }

    pub fn page(self, page_number: u32) -> QueryKey {
        self.part(&page_number.to_string()).build()
    }

    pub fn build(self) -> QueryKey {
        let mut key = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                key.push(SEPARATOR);
            }
            key.push_str(part);
        }
        QueryKey(key)
    }
}

/// Concurrent store keyed by [`QueryKey`]. Entries are only ever added or
/// overwritten; the last writer wins.
pub struct KeyedCache<V> {
    entries: DashMap<QueryKey, V>,
}

impl<V: Clone> KeyedCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn is_cached(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &QueryKey) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn put(&self, key: QueryKey, value: V) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for KeyedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole API response pages for one data kind.
pub type PageKeyCache = KeyedCache<Arc<Page>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_absent_share_key() {
        let a = QueryKey::builder().part("AAPL").opt(Some("")).opt(None).page(1);
        let b = QueryKey::builder().part("AAPL").opt(None).opt(Some("")).page(1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sentinels_are_positional() {
        let a = QueryKey::builder().part("AAPL").opt(None).opt(Some("x")).page(1);
        let b = QueryKey::builder().part("AAPL").opt(Some("x")).opt(None).page(1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_separator_does_not_collide_with_underscores() {
        let a = QueryKey::builder().part("a_b").part("c").page(1);
        let b = QueryKey::builder().part("a").part("b_c").page(1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_page_number_is_part_of_key() {
        let a = QueryKey::builder().part("AAPL").page(1);
        let b = QueryKey::builder().part("AAPL").page(2);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "AAPL_1");
    }

    #[test]
    fn test_put_overwrites() {
        let cache: KeyedCache<u32> = KeyedCache::new();
        let key = QueryKey::builder().part("k").build();
        assert!(!cache.is_cached(&key));
        assert_eq!(cache.get(&key), None);
        cache.put(key.clone(), 1);
        cache.put(key.clone(), 2);
        assert!(cache.is_cached(&key));
        assert_eq!(cache.get(&key), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
