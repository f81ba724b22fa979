//! The closed set of cache partitions.
//!
//! `CacheName` plus the cache version is the only place partition names are
//! spelled out. Population writes to these names and activation prunes
//! everything else.

use std::collections::BTreeSet;
use std::fmt;

/// A logical cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheName {
    /// Static assets and the application shell. Versioned.
    Precache,
    /// One placeholder image per catalog category.
    FallbackImages,
    /// Last good network responses for images and API calls.
    FallbackResponses,
}

impl CacheName {
    pub const ALL: [CacheName; 3] = [CacheName::Precache, CacheName::FallbackImages, CacheName::FallbackResponses];

    /// Storage name for this partition under the given cache version.
    pub fn storage_name(self, version: u32) -> String {
        match self {
            CacheName::Precache => format!("precache-v{version}"),
            CacheName::FallbackImages => "fallback-images".to_string(),
            CacheName::FallbackResponses => "fallback-responses".to_string(),
        }
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CacheName::Precache => "precache",
            CacheName::FallbackImages => "fallback-images",
            CacheName::FallbackResponses => "fallback-responses",
        };
        f.write_str(label)
    }
}

/// The partition names that are current for one cache version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheNames {
    version: u32,
}

impl CacheNames {
    pub fn new(version: u32) -> Self {
        Self { version }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self, cache: CacheName) -> String {
        cache.storage_name(self.version)
    }

    /// Every storage name that survives activation.
    pub fn current(&self) -> BTreeSet<String> {
        CacheName::ALL.iter().map(|c| c.storage_name(self.version)).collect()
    }

    pub fn is_current(&self, storage_name: &str) -> bool {
        CacheName::ALL
            .iter()
            .any(|c| c.storage_name(self.version) == storage_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_names_for_version_one() {
        let names = CacheNames::new(1);
        assert_eq!(names.name(CacheName::Precache), "precache-v1");
        assert_eq!(names.name(CacheName::FallbackImages), "fallback-images");
        assert_eq!(names.name(CacheName::FallbackResponses), "fallback-responses");
    }

    #[test]
    fn test_current_set_is_exactly_three_names() {
        let current = CacheNames::new(1).current();
        let expected: BTreeSet<String> = ["precache-v1", "fallback-images", "fallback-responses"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(current, expected);
    }

    #[test]
    fn test_older_precache_is_not_current() {
        let names = CacheNames::new(2);
        assert!(names.is_current("precache-v2"));
        assert!(!names.is_current("precache-v1"));
        assert!(!names.is_current("legacy-v0"));
    }
}
