//! Lazily loaded, deduplicated sprite images keyed by URL.
//!
//! The cache only grows: each distinct URL is fetched at most once and its
//! outcome, success or failure, is kept for the rest of the session.

use log::{debug, warn};
use std::collections::HashMap;

/// Starts an asynchronous fetch of a sprite. Implementations must return
/// immediately; the outcome is fed back through [`SpriteCache::resolve`].
pub trait SpriteFetcher {
    fn fetch(&self, url: &str);
}

/// Result of a finished load, as seen by the render loop.
#[derive(Debug)]
pub struct Sprite<'a, I> {
    pub image: Option<&'a I>,
    pub ok: bool,
}

#[derive(Debug)]
enum Slot<I> {
    Pending,
    Loaded(I),
    Failed,
}

#[derive(Debug)]
pub struct SpriteCache<I> {
    slots: HashMap<String, Slot<I>>,
}

impl<I> SpriteCache<I> {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Begins loading `url` unless it is empty or already known.
    pub fn ensure_loaded(&mut self, url: &str, fetcher: &dyn SpriteFetcher) {
        if url.is_empty() || self.slots.contains_key(url) {
            return;
        }

        debug!("Loading sprite {}", url);
        self.slots.insert(url.to_string(), Slot::Pending);
        fetcher.fetch(url);
    }

    /// Records the outcome of a fetch started by [`ensure_loaded`].
    ///
    /// Only pending slots are resolved; a late or duplicate completion for a
    /// URL that already finished is ignored.
    ///
    /// [`ensure_loaded`]: SpriteCache::ensure_loaded
    pub fn resolve(&mut self, url: &str, image: Option<I>) {
        let Some(slot) = self.slots.get_mut(url) else {
            return;
        };
        if !matches!(slot, Slot::Pending) {
            return;
        }

        *slot = match image {
            Some(image) => Slot::Loaded(image),
            None => {
                warn!("Sprite {} failed to load", url);
                Slot::Failed
            }
        };
    }

    /// Finished load for `url`, or `None` while pending or never requested.
    pub fn lookup(&self, url: &str) -> Option<Sprite<'_, I>> {
        match self.slots.get(url)? {
            Slot::Pending => None,
            Slot::Loaded(image) => Some(Sprite {
                image: Some(image),
                ok: true,
            }),
            Slot::Failed => Some(Sprite {
                image: None,
                ok: false,
            }),
        }
    }

    /// Loaded image for `url`, if any.
    pub fn image(&self, url: &str) -> Option<&I> {
        self.lookup(url).filter(|sprite| sprite.ok)?.image
    }

    #[cfg(test)]
    pub fn is_pending(&self, url: &str) -> bool {
        matches!(self.slots.get(url), Some(Slot::Pending))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<I> Default for SpriteCache<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingFetcher {
        requests: RefCell<Vec<String>>,
    }

    impl SpriteFetcher for RecordingFetcher {
        fn fetch(&self, url: &str) {
            self.requests.borrow_mut().push(url.to_string());
        }
    }

    #[test]
    fn test_empty_url_is_ignored() {
        let fetcher = RecordingFetcher::default();
        let mut cache: SpriteCache<u32> = SpriteCache::new();
        cache.ensure_loaded("", &fetcher);
        assert!(cache.is_empty());
        assert!(fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn test_repeated_requests_fetch_once() {
        let fetcher = RecordingFetcher::default();
        let mut cache: SpriteCache<u32> = SpriteCache::new();

        for _ in 0..5 {
            cache.ensure_loaded("/a.png", &fetcher);
        }
        cache.resolve("/a.png", Some(7));
        for _ in 0..5 {
            cache.ensure_loaded("/a.png", &fetcher);
        }

        assert_eq!(fetcher.requests.borrow().as_slice(), ["/a.png"]);
        assert_eq!(cache.image("/a.png"), Some(&7));
    }

    #[test]
    fn test_pending_lookup_is_absent() {
        let fetcher = RecordingFetcher::default();
        let mut cache: SpriteCache<u32> = SpriteCache::new();
        cache.ensure_loaded("/a.png", &fetcher);

        assert!(cache.is_pending("/a.png"));
        assert!(cache.lookup("/a.png").is_none());
        assert!(cache.lookup("/never.png").is_none());
    }

    #[test]
    fn test_failure_is_permanent() {
        let fetcher = RecordingFetcher::default();
        let mut cache: SpriteCache<u32> = SpriteCache::new();
        cache.ensure_loaded("/broken.png", &fetcher);
        cache.resolve("/broken.png", None);

        // A late success must not flip a recorded failure.
        cache.resolve("/broken.png", Some(1));
        cache.ensure_loaded("/broken.png", &fetcher);

        let sprite = cache.lookup("/broken.png").unwrap();
        assert!(!sprite.ok);
        assert!(sprite.image.is_none());
        assert!(cache.image("/broken.png").is_none());
        assert_eq!(fetcher.requests.borrow().len(), 1);
    }

    #[test]
    fn test_unrequested_resolve_is_ignored() {
        let mut cache: SpriteCache<u32> = SpriteCache::new();
        cache.resolve("/stray.png", Some(3));
        assert!(cache.is_empty());
    }
}
