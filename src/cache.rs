use crate::language::ast::Program;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::trace;

/// Thread-safe LRU cache of parsed programs, keyed by a truncated digest of
/// the source text. A list plus map is plenty at the capacities scripts
/// reach in practice; writers are serialized behind one lock, and `get`
/// takes it too because a hit promotes the entry.
pub struct AstCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    items: HashMap<String, Arc<Program>>,
    /// Keys ordered most-recent first.
    order: VecDeque<String>,
}

/// First 8 bytes of the SHA-256 of the source, hex-encoded. Collisions on
/// the truncated key are possible but astronomically unlikely for realistic
/// script corpora.
fn hash(source: &str) -> String {
    hex::encode(&Sha256::digest(source.as_bytes())[..8])
}

impl AstCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                items: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// The process-wide cache used by [`crate::script::Script`].
    pub fn global() -> &'static AstCache {
        static GLOBAL: OnceLock<AstCache> = OnceLock::new();
        GLOBAL.get_or_init(|| AstCache::new(1000))
    }

    /// Looks up the parse for `source`, promoting a hit to most-recent.
    pub fn get(&self, source: &str) -> Option<Arc<Program>> {
        let key = hash(source);
        let mut inner = self.inner.lock().unwrap();
        let program = inner.items.get(&key).cloned();
        match program {
            Some(program) => {
                promote(&mut inner.order, &key);
                trace!(key, "ast cache hit");
                Some(program)
            }
            None => {
                trace!(key, "ast cache miss");
                None
            }
        }
    }

    /// Stores the parse for `source`, replacing and promoting an existing
    /// entry, or evicting the least-recent one at capacity.
    pub fn set(&self, source: &str, program: Arc<Program>) {
        let key = hash(source);
        let mut inner = self.inner.lock().unwrap();

        if inner.items.contains_key(&key) {
            inner.items.insert(key.clone(), program);
            promote(&mut inner.order, &key);
            return;
        }

        if inner.order.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_back() {
                trace!(key = oldest, "ast cache evict");
                inner.items.remove(&oldest);
            }
        }

        inner.order.push_front(key.clone());
        inner.items.insert(key, program);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn promote(order: &mut VecDeque<String>, key: &str) {
    if let Some(position) = order.iter().position(|k| k == key) {
        if let Some(entry) = order.remove(position) {
            order.push_front(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parser::parse_program;

    fn program(source: &str) -> Arc<Program> {
        Arc::new(parse_program(source).expect("parse should succeed"))
    }

    #[test]
    fn get_miss_then_hit() {
        let cache = AstCache::new(4);
        assert!(cache.get("let x = 1").is_none());
        cache.set("let x = 1", program("let x = 1"));
        assert!(cache.get("let x = 1").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn set_replaces_existing_entry() {
        let cache = AstCache::new(4);
        cache.set("let x = 1", program("let x = 1"));
        let replacement = program("let x = 1");
        cache.set("let x = 1", replacement.clone());
        let got = cache.get("let x = 1").unwrap();
        assert!(Arc::ptr_eq(&got, &replacement));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_bounds_len_and_evicts_least_recent() {
        let cache = AstCache::new(3);
        let sources = ["a", "b", "c", "d"];
        for source in sources {
            cache.set(source, program("1"));
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.get("a").is_none());
        for source in &sources[1..] {
            assert!(cache.get(source).is_some(), "{source} should remain");
        }
    }

    #[test]
    fn get_promotes_to_most_recent() {
        let cache = AstCache::new(2);
        cache.set("a", program("1"));
        cache.set("b", program("2"));
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a").is_some());
        cache.set("c", program("3"));
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = AstCache::new(2);
        cache.set("a", program("1"));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn concurrent_access_is_safe() {
        let cache = std::sync::Arc::new(AstCache::new(64));
        let mut handles = Vec::new();
        for t in 0..4 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    let source = format!("let v = {}", (t * 100 + i) % 80);
                    if cache.get(&source).is_none() {
                        cache.set(&source, program(&source));
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 64);
    }
}
