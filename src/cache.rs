//! Reconciliation cache for injected documents.
//!
//! Per host file, three side tables are kept:
//!
//! - element → places computed at a document stamp
//! - live virtual documents, reused in place when a rebuild yields the same
//!   shred ranges and language
//! - known injected regions, used by `is_injected_offset` and `commit_all`
//!
//! Lookups start at the queried element and walk toward the file root. The
//! first cached or computed result with a shred intersecting the queried
//! element wins.

mod file_state;
mod regions;

use std::ops::Range;
use std::sync::Arc;

use dashmap::DashMap;
use url::Url;

use crate::cancel::Cancellation;
use crate::config::InjectionSettings;
use crate::error::{InjectionError, InjectionResult};
use crate::host::{ElementId, HostFile};
use crate::injection::{
    DocumentContent, HighlightToken, InjectedElement, InjectionPolicy, InjectionRequest, Place,
    Registrar, Shred, VirtualDocument, VirtualDocumentUri,
};
use crate::language::LanguageRegistry;

use file_state::{CacheEntry, FileInjections};
pub use regions::InjectedRegions;

/// Entry point of the engine: owns the side tables of every host file.
pub struct InjectionCache {
    registry: Arc<LanguageRegistry>,
    policy: Arc<dyn InjectionPolicy>,
    settings: InjectionSettings,
    files: DashMap<Url, Arc<FileInjections>>,
}

impl InjectionCache {
    pub fn new(
        registry: Arc<LanguageRegistry>,
        policy: Arc<dyn InjectionPolicy>,
        settings: InjectionSettings,
    ) -> Self {
        Self {
            registry,
            policy,
            settings,
            files: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &InjectionSettings {
        &self.settings
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    fn file_state(&self, url: &Url) -> Arc<FileInjections> {
        if let Some(state) = self.files.get(url) {
            return Arc::clone(state.value());
        }
        Arc::clone(self.files.entry(url.clone()).or_default().value())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Visit every injected document covering `element`.
    ///
    /// With `probe_upward` (and probing enabled in the settings) ancestors are
    /// consulted too, up to `max_probe_depth` levels below the root. Files that
    /// are neither physical nor backed by an original are skipped.
    pub fn enumerate<F>(
        &self,
        file: &dyn HostFile,
        element: ElementId,
        probe_upward: bool,
        cancel: &Cancellation,
        mut visitor: F,
    ) -> InjectionResult<()>
    where
        F: FnMut(&Arc<VirtualDocument>, &[Shred]),
    {
        if !file.is_physical() && !file.has_original() {
            log::trace!(target: "utsushi::cache", "Skipping non-physical {}", file.url());
            return Ok(());
        }
        if let Some(places) = self.places_for(file, element, probe_upward, cancel)? {
            for place in places.iter() {
                visitor(&place.document, &place.shreds);
            }
        }
        Ok(())
    }

    fn places_for(
        &self,
        file: &dyn HostFile,
        element: ElementId,
        probe_upward: bool,
        cancel: &Cancellation,
    ) -> InjectionResult<Option<Arc<Vec<Place>>>> {
        let Some(range) = file.text_range(element) else {
            return Ok(None);
        };
        let stamp = file.document().modification_stamp();
        let state = self.file_state(file.url());
        let root = file.root();
        let max_depth = if probe_upward && self.settings.probe_upward {
            self.settings.max_probe_depth
        } else {
            1
        };

        let mut current = Some(element);
        let mut depth = 0;
        while let Some(id) = current {
            if id == root || depth >= max_depth {
                break;
            }
            cancel.check()?;

            let places = match state.lookup(id, stamp) {
                Some(places) => places,
                None => self.compute(file, id, stamp, &state, cancel)?,
            };
            if places.iter().any(|place| place.intersects(&range)) {
                return Ok(Some(places));
            }

            current = file.parent(id);
            depth += 1;
        }
        Ok(None)
    }

    fn compute(
        &self,
        file: &dyn HostFile,
        element: ElementId,
        stamp: u64,
        state: &FileInjections,
        cancel: &Cancellation,
    ) -> InjectionResult<Arc<Vec<Place>>> {
        let requests = self.policy.discover(file, element);
        if requests.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }

        let mut registrar = self.registrar(file, cancel.clone());
        for request in &requests {
            if let Err(err) = Self::inject(&mut registrar, request) {
                if err.is_cancellation() {
                    return Err(err);
                }
                log::debug!(
                    target: "utsushi::cache",
                    "Skipped {} injection at {}: {}",
                    request.language,
                    element,
                    err
                );
            }
        }

        let places: Vec<Place> = registrar
            .finish()
            .into_iter()
            .filter(|place| place.document.is_valid())
            .collect();
        if places.is_empty() {
            return Ok(Arc::new(places));
        }

        let places = Arc::new(places);
        let entry = Arc::new(CacheEntry {
            places: Arc::clone(&places),
            stamp,
        });
        state.store(element, Arc::clone(&entry));
        for host in places.iter().flat_map(Place::host_ids) {
            state.store(host, Arc::clone(&entry));
        }
        log::debug!(
            target: "utsushi::cache",
            "Cached {} places for {} in {} at stamp {}",
            places.len(),
            element,
            file.url(),
            stamp
        );
        Ok(places)
    }

    fn inject(registrar: &mut Registrar<'_>, request: &InjectionRequest) -> InjectionResult<()> {
        registrar.start_injecting(&request.language)?;
        for placement in &request.placements {
            registrar.add_place(
                &placement.prefix,
                &placement.suffix,
                &placement.host,
                placement.range_inside_host.clone(),
            )?;
        }
        registrar.done_injecting()?;
        Ok(())
    }

    /// Documents injected into the host element `host`, each with the range
    /// inside the host it covers.
    pub fn injected_documents(
        &self,
        file: &dyn HostFile,
        host: ElementId,
        cancel: &Cancellation,
    ) -> InjectionResult<Vec<(Arc<VirtualDocument>, Range<usize>)>> {
        let mut documents = Vec::new();
        self.enumerate(file, host, false, cancel, |document, shreds| {
            for shred in shreds.iter().filter(|shred| shred.host_id() == host) {
                let start = shred.host_start();
                let range = shred.host_range();
                documents.push((
                    Arc::clone(document),
                    range.start.saturating_sub(start)..range.end.saturating_sub(start),
                ));
            }
        })?;
        Ok(documents)
    }

    /// Injected leaf at a host offset, retrying one offset to the left.
    pub fn find_injected_element_at(
        &self,
        file: &dyn HostFile,
        offset: usize,
        cancel: &Cancellation,
    ) -> InjectionResult<Option<(Arc<VirtualDocument>, InjectedElement)>> {
        if let Some(found) = self.injected_element_at(file, offset, cancel)? {
            return Ok(Some(found));
        }
        match offset.checked_sub(1) {
            Some(previous) => self.injected_element_at(file, previous, cancel),
            None => Ok(None),
        }
    }

    fn injected_element_at(
        &self,
        file: &dyn HostFile,
        offset: usize,
        cancel: &Cancellation,
    ) -> InjectionResult<Option<(Arc<VirtualDocument>, InjectedElement)>> {
        let Some(element) = file.element_at(offset) else {
            return Ok(None);
        };
        let mut found = None;
        self.enumerate(file, element, true, cancel, |document, shreds| {
            if found.is_some() {
                return;
            }
            let covers = shreds.iter().any(|shred| {
                let range = shred.host_range();
                shred.host_marker().is_valid() && range.start <= offset && offset <= range.end
            });
            if !covers {
                return;
            }
            let decoded = document.host_to_injected(offset);
            if let Some(injected) = document.element_at(decoded) {
                found = Some((Arc::clone(document), injected));
            }
        })?;
        Ok(found)
    }

    // ========================================================================
    // Documents and tokens
    // ========================================================================

    /// Shreds of the virtual document behind `virtual_url`.
    pub fn get_shreds(&self, virtual_url: &Url) -> Option<Arc<[Shred]>> {
        let id = VirtualDocumentUri::parse_id(virtual_url)?;
        self.files.iter().find_map(|file| {
            file.value()
                .documents()
                .iter()
                .find(|document| document.id() == id)
                .map(|document| document.shreds())
        })
    }

    /// Valid virtual documents currently known for a host file.
    pub fn cached_virtual_documents(&self, host_url: &Url) -> Vec<Arc<VirtualDocument>> {
        let Some(state) = self.files.get(host_url).map(|state| Arc::clone(state.value())) else {
            return Vec::new();
        };
        state
            .documents()
            .iter()
            .filter(|document| document.is_valid())
            .cloned()
            .collect()
    }

    /// Highlight tokens of a document in host coordinates.
    pub fn tokens(&self, document: &VirtualDocument) -> InjectionResult<Arc<[HighlightToken]>> {
        let lexer = self
            .registry
            .lexer(document.language())
            .ok_or_else(|| InjectionError::lexer_not_found(document.language()))?;
        Ok(document.tokens_with(lexer.as_ref()))
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Start a registrar session against `file`.
    pub fn registrar<'a>(&'a self, file: &'a dyn HostFile, cancel: Cancellation) -> Registrar<'a> {
        Registrar::new(self, file, cancel)
    }

    pub(crate) fn register(
        &self,
        file: &dyn HostFile,
        language: &str,
        content: DocumentContent,
    ) -> Arc<VirtualDocument> {
        self.file_state(file.url())
            .register(file.url(), language, content)
    }

    /// Re-validate every known region of `file`.
    ///
    /// Regions whose markers were invalidated are dropped; the rest are looked
    /// up again, rebuilding what went stale. Returns the number of regions
    /// that still carry an injection.
    pub fn commit_all(&self, file: &dyn HostFile, cancel: &Cancellation) -> InjectionResult<usize> {
        let state = self.file_state(file.url());
        let dropped = state.regions().remove_invalid();
        if dropped > 0 {
            log::debug!(
                target: "utsushi::cache",
                "Dropped {} invalid regions of {}",
                dropped,
                file.url()
            );
        }

        let mut live = 0;
        for region in state.regions().snapshot().iter() {
            cancel.check()?;
            let Some(element) = file.element_at(region.start()) else {
                continue;
            };
            let mut found = false;
            self.enumerate(file, element, true, cancel, |_, _| found = true)?;
            if found {
                live += 1;
            }
        }
        Ok(live)
    }

    /// True when `offset` lies in a known injected region of `host_url`.
    pub fn is_injected_offset(&self, host_url: &Url, offset: usize) -> bool {
        self.files
            .get(host_url)
            .is_some_and(|state| state.regions().contains(offset))
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Forget the places cached on one element.
    pub fn invalidate_element(&self, host_url: &Url, element: ElementId) {
        if let Some(state) = self.files.get(host_url).map(|state| Arc::clone(state.value()))
            && state.invalidate(element)
        {
            log::trace!(target: "utsushi::cache", "Invalidated {} in {}", element, host_url);
        }
    }

    /// Forget cached places of a file while keeping its live documents, so
    /// the next lookup can reuse them.
    pub fn clear_document(&self, host_url: &Url) {
        if let Some(state) = self.files.get(host_url).map(|state| Arc::clone(state.value())) {
            log::debug!(
                target: "utsushi::cache",
                "Cleared {} cached entries of {}",
                state.entry_count(),
                host_url
            );
            state.clear_entries();
        }
    }

    /// Drop every table of a file and dispose its documents.
    pub fn remove_file(&self, host_url: &Url) {
        if let Some((_, state)) = self.files.remove(host_url) {
            state.dispose_all();
            log::debug!(target: "utsushi::cache", "Removed {}", host_url);
        }
    }
}
