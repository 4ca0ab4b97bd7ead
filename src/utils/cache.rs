// Process-local cache for rarely-changing catalog data (facilities)
use std::collections::HashMap;
use std::sync::RwLock;

lazy_static::lazy_static! {
    static ref CACHE: RwLock<HashMap<String, String>> = RwLock::new(HashMap::new());
}

pub fn get_cached(key: &str) -> Option<String> {
    CACHE.read().ok()?.get(key).cloned()
}

pub fn set_cache(key: String, value: String) {
    if let Ok(mut cache) = CACHE.write() {
        cache.insert(key, value);
    }
}

pub fn invalidate(key: &str) {
    if let Ok(mut cache) = CACHE.write() {
        cache.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_invalidate() {
        set_cache("cache-test-key".to_string(), "v".to_string());
        assert_eq!(get_cached("cache-test-key"), Some("v".to_string()));
        invalidate("cache-test-key");
        assert_eq!(get_cached("cache-test-key"), None);
    }
}
