//! Offset translation between host documents and injected buffers.

mod helpers;

use std::sync::Arc;

use helpers::{Fixture, find, plain_cache, whole_host_policy};
use rstest::rstest;
use utsushi::document::TextDocument;
use utsushi::error::InjectionError;
use utsushi::escaper::EscaperKind;
use utsushi::host::{HostDocument, OutlineHostFile};
use utsushi::injection::ShredChange;
use utsushi::{Cancellation, HostFile, InjectionSettings, Place};

fn inject(fixture: &Fixture, placements: &[(&str, &str, usize, std::ops::Range<usize>)]) -> Place {
    let cache = plain_cache(whole_host_policy("sql"), InjectionSettings::default());
    let mut registrar = cache.registrar(&fixture.file, Cancellation::new());
    registrar.start_injecting("sql").unwrap();
    for (prefix, suffix, host, range) in placements {
        let host = fixture.file.injection_host(fixture.hosts[*host]).unwrap();
        registrar.add_place(prefix, suffix, &host, range.clone()).unwrap();
    }
    registrar.done_injecting().unwrap();
    registrar.finish().remove(0)
}

#[test]
fn test_framed_fragment_maps_its_start() {
    let source = r#"let q = sql!(SELECT * FROM "users" WHERE id = <EXPR>);"#;
    let fragment = find(source, r#"SELECT * FROM "users" WHERE id = <EXPR>"#);
    let document = Arc::new(TextDocument::new(source));
    let url = url::Url::parse("file:///project/src/query.rs").unwrap();
    let mut builder = OutlineHostFile::builder(url, document as Arc<dyn HostDocument>);
    let root = builder.root();
    let host = builder.host(root, fragment.clone(), "macro_body", EscaperKind::Verbatim);
    let file = builder.build();

    let cache = plain_cache(whole_host_policy("sql"), InjectionSettings::default());
    let host = file.injection_host(host).unwrap();
    let mut registrar = cache.registrar(&file, Cancellation::new());
    registrar
        .start_injecting("sql")
        .unwrap()
        .add_place("(", ")", &host, 0..fragment.len())
        .unwrap()
        .done_injecting()
        .unwrap();
    let place = registrar.finish().remove(0);
    let document = &place.document;

    assert_eq!(document.host_to_injected(fragment.start), 1);
    assert_eq!(document.injected_to_host(1), fragment.start);
    assert_eq!(document.injected_to_host(0), fragment.start);
    assert_eq!(document.injected_to_host(document.decoded_text().len()), fragment.end);
    assert_eq!(
        document.decoded_text().as_ref(),
        r#"(SELECT * FROM "users" WHERE id = <EXPR>)"#
    );

    let len = document.decoded_text().len();
    assert!(document.is_in_prefix_suffix(0..1));
    assert!(document.is_in_prefix_suffix(len - 1..len));
    assert!(!document.is_in_prefix_suffix(1..7));
    assert!(document.selection_overflows_fragment(0, len));
    assert!(!document.selection_overflows_fragment(2, 4));
}

#[test]
fn test_round_trip_through_escapes() {
    let source = r#"run("SELECT * FROM \"users\" WHERE id = ?");"#;
    let fixture = Fixture::new(source, &[r#""SELECT * FROM \"users\" WHERE id = ?""#]);
    let place = inject(&fixture, &[("/*q*/", ";", 0, 0..38)]);
    let document = &place.document;

    let shred = &place.shreds[0];
    assert_eq!(shred.range().len(), document.decoded_text().len());
    assert_eq!(
        document.decoded_text().as_ref(),
        r#"/*q*/SELECT * FROM "users" WHERE id = ?;"#
    );
    assert_eq!(
        document.text().as_ref(),
        r#"/*q*/SELECT * FROM \"users\" WHERE id = ?;"#
    );
    document.with_tree(|tree| {
        assert_eq!(tree.decoded_text(), document.decoded_text().as_ref());
        assert_eq!(tree.text(), document.text().as_ref());
    });
}

#[rstest]
#[case::plain_char("S")]
#[case::escape_start(r#"\""#)]
#[case::after_escape("users")]
#[case::last_char("?")]
fn test_host_offsets_round_trip(#[case] needle: &str) {
    let source = r#"run("SELECT * FROM \"users\" WHERE id = ?");"#;
    let fixture = Fixture::new(source, &[r#""SELECT * FROM \"users\" WHERE id = ?""#]);
    let place = inject(&fixture, &[("", "", 0, 0..38)]);
    let translator = place.document.translator();

    let host = find(source, needle).start;
    assert_eq!(translator.injected_to_host(translator.host_to_injected(host)), host);
}

#[rstest]
#[case::closer_to_previous(r#", ""#, 8)]
#[case::tie_goes_forward(r#" ""#, 9)]
#[case::closer_to_next(r#""from"#, 9)]
fn test_offset_between_shreds_clamps_to_nearest_body(
    #[case] needle: &str,
    #[case] expected: usize,
) {
    let source = r#"q("select 1", "from t")"#;
    let fixture = Fixture::new(source, &[r#""select 1""#, r#""from t""#]);
    let place = inject(&fixture, &[("", "", 0, 0..10), (" ", "", 1, 0..8)]);
    let translator = place.document.translator();
    assert_eq!(place.document.decoded_text().as_ref(), "select 1 from t");

    let host = find(source, needle).start;
    assert_eq!(translator.host_to_injected(host), expected);
}

#[test]
fn test_decoded_offsets_round_trip() {
    let source = r#"run("a\tb", "c");"#;
    let fixture = Fixture::new(source, &[r#""a\tb""#, r#""c""#]);
    let place = inject(&fixture, &[("", "", 0, 0..6), (" ", "", 1, 0..3)]);
    let translator = place.document.translator();

    // "a\tb c": every decoded offset outside framing has a host position
    for decoded in [0, 1, 2, 3, 5] {
        assert_eq!(
            translator.host_to_injected(translator.injected_to_host(decoded)),
            decoded,
            "decoded offset {decoded}"
        );
    }
    // Inside the escape the host offset snaps to the escape
    let escape = find(source, r"\t").start;
    assert_eq!(translator.host_to_injected(escape + 1), 1);
    assert_eq!(translator.injected_to_host(4), find(source, "c").start);
}

#[test]
fn test_contains_range_chains_adjacent_shreds() {
    let source = r#"x = "abcdef" + "gh""#;
    let fixture = Fixture::new(source, &[r#""abcdef""#, r#""gh""#]);
    let place = inject(&fixture, &[("", "", 0, 1..4), ("", "", 0, 4..7)]);
    let translator = place.document.translator();
    let abc = find(source, "abc");
    let def = find(source, "def");

    assert_eq!(place.document.decoded_text().as_ref(), "abcdef");
    assert!(translator.contains_range(abc.start, def.end));
    assert!(translator.contains_range(def.start, def.end));
    assert!(!translator.contains_range(abc.start, find(source, "gh").end));

    let split = inject(&fixture, &[("", "", 0, 1..7), ("", "", 1, 1..3)]);
    let translator = split.document.translator();
    assert!(!translator.contains_range(abc.start, find(source, "gh").end));
}

#[test]
fn test_minimal_edit_sequence_after_host_edit() {
    let source = r#"q("select 1", "from t")"#;
    let fixture = Fixture::new(source, &[r#""select 1""#, r#""from t""#]);
    let place = inject(&fixture, &[("", "", 0, 0..10), (" ", "", 1, 0..8)]);
    let translator = place.document.translator();
    let text = fixture.document.text();
    assert_eq!(translator.minimal_edit_sequence(&text), vec![None, None]);

    let end = find(source, "from t").end;
    fixture.document.replace(end..end, "ab").unwrap();

    let text = fixture.document.text();
    assert_eq!(
        translator.minimal_edit_sequence(&text),
        vec![
            None,
            Some(ShredChange {
                shred_index: 1,
                range: 6..6,
                replacement: "ab".to_string(),
            }),
        ]
    );
}

#[test]
fn test_invalidated_shred_reports_full_deletion() {
    let source = r#"q("select 1", "from t")"#;
    let fixture = Fixture::new(source, &[r#""select 1""#, r#""from t""#]);
    let place = inject(&fixture, &[("", "", 0, 0..10), (" ", "", 1, 0..8)]);
    let translator = place.document.translator();

    fixture
        .document
        .replace(find(source, r#", "from t""#), "")
        .unwrap();

    let changes = translator.minimal_edit_sequence(&fixture.document.text());
    assert_eq!(changes[0], None);
    assert_eq!(
        changes[1],
        Some(ShredChange {
            shred_index: 1,
            range: 0..6,
            replacement: String::new(),
        })
    );
    assert!(!place.document.is_valid());
}

#[test]
fn test_view_edits_apply_back_to_host() {
    let source = r#"q("select 1", "from t")"#;
    let fixture = Fixture::new(source, &[r#""select 1""#, r#""from t""#]);
    let place = inject(&fixture, &[("", "", 0, 0..10), (" ", "", 1, 0..8)]);
    assert_eq!(place.document.text().as_ref(), "select 1 from t");

    let edits = place.document.host_edits("select 2 from tab").unwrap();
    assert_eq!(edits.len(), 2);
    assert_eq!(edits[0].host, fixture.hosts[0]);
    assert_eq!(edits[1].host, fixture.hosts[1]);

    for edit in edits.iter().rev() {
        fixture
            .document
            .replace(edit.range.clone(), &edit.replacement)
            .unwrap();
    }
    assert_eq!(
        fixture.document.text().as_ref(),
        r#"q("select 2", "from tab")"#
    );
}

#[test]
fn test_view_edit_of_framing_is_rejected() {
    let source = r#"q("select 1", "from t")"#;
    let fixture = Fixture::new(source, &[r#""select 1""#, r#""from t""#]);
    let place = inject(&fixture, &[("", "", 0, 0..10), (" ", "", 1, 0..8)]);

    let err = place.document.host_edits("select 1_from t").unwrap_err();
    assert!(matches!(err, InjectionError::FramingEdited { offset: 8 }));
}
