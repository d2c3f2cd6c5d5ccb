use std::ops::Range;
use std::sync::Arc;

use super::offsets::OffsetTable;
use super::patch::patch_leaves;
use super::{DocumentContent, Place, Shred, ShredParts};
use crate::cache::InjectionCache;
use crate::cancel::Cancellation;
use crate::error::{InjectionError, InjectionResult};
use crate::host::{ElementId, HostFile, InjectionHost};
use crate::language::InjectedParser;
use crate::text::intersection;

struct Session {
    language: String,
    parser: Arc<dyn InjectedParser>,
    buffer: String,
    shreds: Vec<Shred>,
    one_line: bool,
}

enum State {
    Idle,
    Injecting(Session),
}

/// Builds virtual documents for one host file.
///
/// A session is `start_injecting`, one or more `add_place`, then
/// `done_injecting`. Any failure ends the session.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use utsushi::cache::InjectionCache;
/// # use utsushi::cancel::Cancellation;
/// # use utsushi::host::{HostFile, ElementId};
/// # fn run(cache: &InjectionCache, file: &dyn HostFile, literal: ElementId) -> utsushi::error::InjectionResult<()> {
/// let host = file.injection_host(literal).expect("literal is a host");
/// let mut registrar = cache.registrar(file, Cancellation::new());
/// registrar
///     .start_injecting("sql")?
///     .add_place("(", ")", &host, 1..9)?
///     .done_injecting()?;
/// let places = registrar.finish();
/// # Ok(()) }
/// ```
pub struct Registrar<'a> {
    cache: &'a InjectionCache,
    file: &'a dyn HostFile,
    cancel: Cancellation,
    state: State,
    places: Vec<Place>,
}

impl<'a> Registrar<'a> {
    pub(crate) fn new(cache: &'a InjectionCache, file: &'a dyn HostFile, cancel: Cancellation) -> Self {
        Self {
            cache,
            file,
            cancel,
            state: State::Idle,
            places: Vec::new(),
        }
    }

    pub fn is_injecting(&self) -> bool {
        matches!(self.state, State::Injecting(_))
    }

    /// Begin a session for `language`.
    pub fn start_injecting(&mut self, language: &str) -> InjectionResult<&mut Self> {
        if let State::Injecting(previous) = std::mem::replace(&mut self.state, State::Idle) {
            let err = InjectionError::invalid_state(format!(
                "session for '{}' was not finished before starting '{}'",
                previous.language, language
            ));
            return Err(self.fail(&previous, None, err));
        }

        let parser = self
            .cache
            .registry()
            .parser(language)
            .ok_or_else(|| InjectionError::parser_not_found(language))?;

        log::debug!(
            target: "utsushi::registrar",
            "Start injecting {} into {}",
            language,
            self.file.url()
        );
        self.state = State::Injecting(Session {
            language: language.to_string(),
            parser,
            buffer: String::new(),
            shreds: Vec::new(),
            one_line: false,
        });
        Ok(self)
    }

    /// Append `prefix`, the decoded text of `range_inside_host` and `suffix`.
    pub fn add_place(
        &mut self,
        prefix: &str,
        suffix: &str,
        host: &Arc<dyn InjectionHost>,
        range_inside_host: Range<usize>,
    ) -> InjectionResult<&mut Self> {
        let State::Injecting(mut session) = std::mem::replace(&mut self.state, State::Idle) else {
            return Err(InjectionError::invalid_state(
                "add_place called without start_injecting",
            ));
        };

        match self.place(&mut session, prefix, suffix, host, range_inside_host) {
            Ok(()) => {
                self.state = State::Injecting(session);
                Ok(self)
            }
            Err(err) => Err(self.fail(&session, Some(host.id()), err)),
        }
    }

    fn place(
        &self,
        session: &mut Session,
        prefix: &str,
        suffix: &str,
        host: &Arc<dyn InjectionHost>,
        range_inside_host: Range<usize>,
    ) -> InjectionResult<()> {
        let host_range = host.text_range();
        if range_inside_host.start > range_inside_host.end
            || range_inside_host.end > host_range.len()
        {
            return Err(InjectionError::invalid_range(
                &range_inside_host,
                format!("not inside host {} of length {}", host.id(), host_range.len()),
            ));
        }

        let document = self.file.document();
        let text = document.text();
        let host_text = text.get(host_range.clone()).ok_or_else(|| {
            InjectionError::invalid_range(&host_range, "host element outside its document")
        })?;

        let mut escaper = host.create_escaper();
        let relevant = escaper.relevant_text_range(host_text);
        let mut relevant = intersection(&relevant, &range_inside_host)
            .unwrap_or(relevant.start..relevant.start);
        if host_text.get(relevant.clone()).is_none() {
            return Err(InjectionError::invalid_range(
                &relevant,
                "does not fall on character boundaries of the host text",
            ));
        }

        let start = session.buffer.len();
        session.buffer.push_str(prefix);
        let decoded_start = session.buffer.len();
        let complete = escaper.decode(host_text, relevant.clone(), &mut session.buffer);
        let decoded_len = session.buffer.len() - decoded_start;

        if !complete {
            // Keep only the part that decoded
            let end = escaper
                .offset_in_host(decoded_len, &relevant)
                .ok_or_else(|| {
                    InjectionError::escaper_contract("partial decode end has no host offset")
                })?;
            relevant = relevant.start..end.clamp(relevant.start, relevant.end);
            log::debug!(
                target: "utsushi::registrar",
                "Partial decode of {}: kept {}..{}",
                host.id(),
                relevant.start,
                relevant.end
            );
        }

        let offsets = OffsetTable::build(escaper.as_ref(), decoded_len, &relevant)?;
        session.buffer.push_str(suffix);

        let absolute = host_range.start + relevant.start..host_range.start + relevant.end;
        if let Some(last) = session.shreds.last()
            && last.host_range().end > absolute.start
        {
            return Err(InjectionError::invalid_range(
                &absolute,
                format!(
                    "placements must be in host order; previous ends at {}",
                    last.host_range().end
                ),
            ));
        }

        let recorded_text = text[absolute.clone()].to_string();
        let host_marker = document.create_range_marker(absolute, true, true);
        session.one_line |= escaper.is_one_line();
        session.shreds.push(Shred::new(ShredParts {
            host: Arc::downgrade(host),
            host_id: host.id(),
            host_marker,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            range: start..session.buffer.len(),
            range_inside_host: relevant,
            recorded_text,
            offsets,
        }));
        Ok(())
    }

    /// Parse the buffer, patch leaves and register the virtual document.
    pub fn done_injecting(&mut self) -> InjectionResult<&mut Self> {
        let State::Injecting(session) = std::mem::replace(&mut self.state, State::Idle) else {
            return Err(InjectionError::invalid_state(
                "done_injecting called without start_injecting",
            ));
        };

        match self.build(&session) {
            Ok(place) => {
                log::debug!(
                    target: "utsushi::registrar",
                    "Injected {} into {} as {} ({} shreds)",
                    session.language,
                    self.file.url(),
                    place.document.url(),
                    place.shreds.len()
                );
                self.places.push(place);
                Ok(self)
            }
            Err(err) => Err(self.fail(&session, None, err)),
        }
    }

    fn build(&self, session: &Session) -> InjectionResult<Place> {
        if session.shreds.is_empty() {
            return Err(InjectionError::invalid_state(
                "done_injecting called without any add_place",
            ));
        }

        self.cancel.check()?;
        let mut tree = session.parser.parse(&session.buffer, &self.cancel)?;

        let text = self.file.document().text();
        let view = patch_leaves(&mut tree, &session.buffer, &text, &session.shreds)?;
        let shreds: Arc<[Shred]> = session.shreds.clone().into();

        let document = self.cache.register(
            self.file,
            &session.language,
            DocumentContent {
                shreds: Arc::clone(&shreds),
                tree,
                view,
                decoded: session.buffer.clone(),
                one_line: session.one_line,
            },
        );

        if self.cache.settings().eager_tokens {
            self.cancel.check()?;
            self.cache.tokens(&document)?;
        }

        Ok(Place { document, shreds })
    }

    /// Attach diagnostics to a session failure and log it.
    ///
    /// `placing` is the host whose placement failed; it has no shred yet.
    fn fail(
        &self,
        session: &Session,
        placing: Option<ElementId>,
        err: InjectionError,
    ) -> InjectionError {
        if err.is_cancellation() {
            log::debug!(
                target: "utsushi::registrar",
                "Injection of {} into {} cancelled",
                session.language,
                self.file.url()
            );
            return err;
        }
        let err = err.with_session_context(&session.language, self.file.url().as_str(), || {
            let mut hosts: Vec<ElementId> = session.shreds.iter().map(Shred::host_id).collect();
            if let Some(host) = placing.filter(|host| !hosts.contains(host)) {
                hosts.push(host);
            }
            describe_hosts(hosts.into_iter())
        });
        log::error!(target: "utsushi::registrar", "{}", err);
        err
    }

    /// Places built so far.
    pub fn places(&self) -> &[Place] {
        &self.places
    }

    /// Places built by this registrar. An unfinished session is dropped.
    pub fn finish(self) -> Vec<Place> {
        if let State::Injecting(session) = &self.state {
            log::warn!(
                target: "utsushi::registrar",
                "Dropping unfinished injection of {} into {}",
                session.language,
                self.file.url()
            );
        }
        self.places
    }
}

fn describe_hosts(hosts: impl Iterator<Item = ElementId>) -> String {
    let hosts: Vec<String> = hosts.map(|id| id.to_string()).collect();
    if hosts.is_empty() {
        "none".to_string()
    } else {
        hosts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectionSettings;
    use crate::document::TextDocument;
    use crate::escaper::EscaperKind;
    use crate::host::{HostDocument, OutlineHostFile};
    use crate::injection::{InjectionPolicy, InjectionRequest};
    use crate::language::{LanguageRegistry, PlainTextParser};
    use url::Url;

    const SOURCE: &str = r#"a("x\ty") b("z")"#;

    fn setup() -> (InjectionCache, OutlineHostFile, Arc<dyn InjectionHost>, Arc<dyn InjectionHost>) {
        let document: Arc<dyn HostDocument> = Arc::new(TextDocument::new(SOURCE));
        let url = Url::parse("file:///tmp/calls.rs").unwrap();
        let mut builder = OutlineHostFile::builder(url, document);
        let root = builder.root();
        let first = builder.host(root, 2..9, "string", EscaperKind::Backslash);
        let second = builder.host(root, 12..15, "string", EscaperKind::Backslash);
        let file = builder.build();
        let first = file.injection_host(first).unwrap();
        let second = file.injection_host(second).unwrap();

        let registry = Arc::new(LanguageRegistry::new());
        registry.register_parser("text", Arc::new(PlainTextParser));
        let policy: Arc<dyn InjectionPolicy> =
            Arc::new(|_: &dyn HostFile, _: ElementId| -> Vec<InjectionRequest> { Vec::new() });
        let cache = InjectionCache::new(registry, policy, InjectionSettings::default());
        (cache, file, first, second)
    }

    #[test]
    fn test_session_builds_place_with_framing() {
        let (cache, file, first, second) = setup();
        let mut registrar = cache.registrar(&file, Cancellation::new());
        registrar
            .start_injecting("text")
            .unwrap()
            .add_place("<", "", &first, 0..7)
            .unwrap()
            .add_place(" ", ">", &second, 0..3)
            .unwrap()
            .done_injecting()
            .unwrap();
        assert!(!registrar.is_injecting());

        let places = registrar.finish();
        assert_eq!(places.len(), 1);
        let document = &places[0].document;
        assert_eq!(document.decoded_text().as_ref(), "<x\ty z>");
        assert_eq!(document.text().as_ref(), r#"<x\ty z>"#);
        assert!(document.is_one_line());

        let shreds = &places[0].shreds;
        assert_eq!(shreds[0].range(), 0..4);
        assert_eq!(shreds[0].host_range(), 3..8);
        assert_eq!(shreds[0].recorded_text(), r#"x\ty"#);
        assert_eq!(shreds[1].range(), 4..7);
        assert_eq!(shreds[1].host_range(), 13..14);
    }

    #[test]
    fn test_unfinished_session_is_reported_and_reset() {
        let (cache, file, first, _) = setup();
        let mut registrar = cache.registrar(&file, Cancellation::new());
        registrar
            .start_injecting("text")
            .unwrap()
            .add_place("", "", &first, 0..7)
            .unwrap();

        let err = registrar.start_injecting("text").map(|_| ()).unwrap_err();
        assert!(matches!(err, InjectionError::Session { .. }));
        assert!(!registrar.is_injecting());
        assert!(registrar.start_injecting("text").is_ok());
    }

    #[test]
    fn test_unknown_language() {
        let (cache, file, _, _) = setup();
        let mut registrar = cache.registrar(&file, Cancellation::new());
        let err = registrar.start_injecting("cobol").map(|_| ()).unwrap_err();
        assert!(matches!(err, InjectionError::ParserNotFound { .. }));
    }

    #[test]
    fn test_range_outside_host_resets_session() {
        let (cache, file, first, _) = setup();
        let mut registrar = cache.registrar(&file, Cancellation::new());
        registrar.start_injecting("text").unwrap();

        let err = registrar.add_place("", "", &first, 0..8).map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("'text'"));
        match &err {
            InjectionError::Session { hosts, .. } => assert_eq!(hosts, &first.id().to_string()),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!registrar.is_injecting());
        assert!(matches!(
            registrar.done_injecting().map(|_| ()),
            Err(InjectionError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_placements_must_follow_host_order() {
        let (cache, file, first, second) = setup();
        let mut registrar = cache.registrar(&file, Cancellation::new());
        registrar
            .start_injecting("text")
            .unwrap()
            .add_place("", "", &second, 0..3)
            .unwrap();

        let err = registrar.add_place("", "", &first, 0..7).map(|_| ()).unwrap_err();
        match err {
            InjectionError::Session { hosts, .. } => {
                assert_eq!(hosts, format!("{}, {}", second.id(), first.id()));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(registrar.finish().is_empty());
    }

    #[test]
    fn test_done_without_places() {
        let (cache, file, _, _) = setup();
        let mut registrar = cache.registrar(&file, Cancellation::new());
        registrar.start_injecting("text").unwrap();
        let err = registrar.done_injecting().map(|_| ()).unwrap_err();
        assert!(!err.is_cancellation());
        assert!(!registrar.is_injecting());
    }

    #[test]
    fn test_cancellation_passes_through_unwrapped() {
        let (cache, file, first, _) = setup();
        let cancel = Cancellation::new();
        let mut registrar = cache.registrar(&file, cancel.clone());
        registrar
            .start_injecting("text")
            .unwrap()
            .add_place("", "", &first, 0..7)
            .unwrap();

        cancel.cancel();
        let err = registrar.done_injecting().map(|_| ()).unwrap_err();
        assert!(matches!(err, InjectionError::Cancelled));
        assert!(cache.cached_virtual_documents(file.url()).is_empty());
    }
}
