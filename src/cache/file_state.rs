use std::ops::Range;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use url::Url;

use super::regions::InjectedRegions;
use crate::error::LockResultExt;
use crate::host::ElementId;
use crate::injection::{DocumentContent, Place, Shred, VirtualDocument};

/// Places computed for one host element at one document stamp.
pub(super) struct CacheEntry {
    pub places: Arc<Vec<Place>>,
    pub stamp: u64,
}

impl CacheEntry {
    fn is_valid(&self, stamp: u64) -> bool {
        self.stamp == stamp && self.places.iter().all(|place| place.document.is_valid())
    }
}

/// Side tables of one host file.
///
/// Readers load `documents` without locking. Writers of the document list
/// hold `reconcile` so that concurrent registrations see each other.
#[derive(Default)]
pub(super) struct FileInjections {
    entries: DashMap<ElementId, Arc<CacheEntry>>,
    documents: ArcSwap<Vec<Arc<VirtualDocument>>>,
    regions: InjectedRegions,
    reconcile: Mutex<()>,
}

fn host_ranges(shreds: &[Shred]) -> Vec<Range<usize>> {
    shreds.iter().map(Shred::host_range).collect()
}

fn any_overlap(a: &[Range<usize>], b: &[Range<usize>]) -> bool {
    a.iter().any(|x| {
        b.iter()
            .any(|y| x == y || (x.start < y.end && y.start < x.end))
    })
}

impl FileInjections {
    /// Cached places for `element`, dropping the entry when it went stale.
    pub(super) fn lookup(&self, element: ElementId, stamp: u64) -> Option<Arc<Vec<Place>>> {
        // Two steps so the read guard is released before a removal
        let entry = self.entries.get(&element).map(|entry| Arc::clone(entry.value()))?;
        if entry.is_valid(stamp) {
            return Some(Arc::clone(&entry.places));
        }
        log::trace!(
            target: "utsushi::cache",
            "Dropping stale entry for {} (stamp {} != {})",
            element,
            entry.stamp,
            stamp
        );
        self.entries.remove(&element);
        None
    }

    pub(super) fn store(&self, element: ElementId, entry: Arc<CacheEntry>) {
        self.entries.insert(element, entry);
    }

    pub(super) fn invalidate(&self, element: ElementId) -> bool {
        self.entries.remove(&element).is_some()
    }

    pub(super) fn clear_entries(&self) {
        self.entries.clear();
    }

    pub(super) fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn documents(&self) -> Arc<Vec<Arc<VirtualDocument>>> {
        self.documents.load_full()
    }

    pub(super) fn regions(&self) -> &InjectedRegions {
        &self.regions
    }

    /// Reconcile a freshly built document with the live ones.
    ///
    /// A live document with the same shred host ranges and language takes the
    /// new content in place, even when its shreds point at host elements of a
    /// superseded host tree. Documents sharing host text with the new one in
    /// any other way are disposed.
    pub(super) fn register(
        &self,
        host_url: &Url,
        language: &str,
        content: DocumentContent,
    ) -> Arc<VirtualDocument> {
        let _reconcile = self.reconcile.lock().recover_poison("FileInjections::register");
        let ranges = host_ranges(&content.shreds);
        let current = self.documents.load_full();
        let mut kept: Vec<Arc<VirtualDocument>> = Vec::with_capacity(current.len() + 1);
        let mut reused: Option<Arc<VirtualDocument>> = None;

        for document in current.iter() {
            if !document.is_reusable() {
                log::trace!(target: "utsushi::cache", "Dropping invalid {}", document.url());
                continue;
            }
            let existing = host_ranges(&document.shreds());
            if existing == ranges && document.language() == language && reused.is_none() {
                reused = Some(Arc::clone(document));
                kept.push(Arc::clone(document));
            } else if any_overlap(&existing, &ranges) {
                log::debug!(
                    target: "utsushi::cache",
                    "Discarding {} ({}) superseded by a {} injection",
                    document.url(),
                    document.language(),
                    language
                );
                document.dispose();
            } else {
                kept.push(Arc::clone(document));
            }
        }

        for shred in content.shreds.iter() {
            self.regions.insert(shred.host_marker());
        }

        let document = match reused {
            Some(document) => {
                document.replace_content(content);
                log::debug!(
                    target: "utsushi::cache",
                    "Reused {} (generation {})",
                    document.url(),
                    document.generation()
                );
                document
            }
            None => {
                let document = Arc::new(VirtualDocument::new(host_url, language, content));
                kept.push(Arc::clone(&document));
                document
            }
        };

        self.documents.store(Arc::new(kept));
        document
    }

    /// Dispose every live document.
    pub(super) fn dispose_all(&self) {
        let _reconcile = self.reconcile.lock().recover_poison("FileInjections::dispose_all");
        for document in self.documents.swap(Arc::new(Vec::new())).iter() {
            document.dispose();
        }
    }
}
