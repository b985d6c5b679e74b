#![allow(clippy::float_cmp)]

use super::*;
use crate::store::{FeatureEntry, GlyphRef};

const DIAGRAM: &str = r#"<svg width="400" height="300">
<g transform="translate(100 50)">
<rect id="cell" data-feature="F1" x="10" y="20" width="120" height="40"/>
<rect id="head" data-feature="F1" data-header="1" x="10" y="0" width="120" height="20"/>
</g>
<g id="grp" data-feature="F2" data-group="1"><rect id="inner"/></g>
<a id="link" href="old"><rect id="linked" data-feature="F3"/></a>
</svg>"#;

fn doc() -> DocStore {
    DocStore::parse(DIAGRAM).unwrap()
}

fn by_id(doc: &DocStore, id: &str) -> NodeId {
    doc.element_by_id(id).unwrap()
}

fn map(features: Vec<FeatureEntry>) -> FeatureMap {
    FeatureMap { title: "Rollout".into(), features }
}

fn entry(feature: &str) -> FeatureEntry {
    FeatureEntry { feature: feature.into(), ..FeatureEntry::default() }
}

fn glyph(label: &str, align: &str) -> Option<GlyphRef> {
    Some(GlyphRef { label: label.into(), align: align.into() })
}

// =============================================================
// Alignment
// =============================================================

#[test]
fn alignment_keywords_are_case_insensitive() {
    let align: Alignment = "Middle Right".parse().unwrap();
    assert_eq!(align, Alignment(vec![AlignKeyword::Middle, AlignKeyword::Right]));
    assert_eq!("".parse::<Alignment>().unwrap(), Alignment::default());
}

#[test]
fn unknown_alignment_is_an_error() {
    assert_eq!("Top Center".parse::<Alignment>(), Err(OverlayError::Alignment("Center".into())));
}

#[test]
fn alignment_offsets() {
    let container = Size::new(120.0, 40.0);
    let glyph = Size::new(20.0, 10.0);
    let at = |s: &str| s.parse::<Alignment>().unwrap().offset(container, glyph);
    assert_eq!(at("Top Left"), Point::new(0.0, 0.0));
    assert_eq!(at("Middle Right"), Point::new(100.0, 15.0));
    assert_eq!(at("Bottom Centre"), Point::new(50.0, 30.0));
}

// =============================================================
// Positions
// =============================================================

#[test]
fn absolute_position_sums_ancestors() {
    let d = doc();
    assert_eq!(relative_position(&d, by_id(&d, "cell")), Point::new(10.0, 20.0));
    assert_eq!(absolute_position(&d, by_id(&d, "cell")), Point::new(110.0, 70.0));
}

#[test]
fn absolute_position_accepts_comma_translate() {
    let d = DocStore::parse(r#"<svg><g transform="translate(5,6)"><rect id="r" x="1px" y="2"/></g></svg>"#).unwrap();
    assert_eq!(absolute_position(&d, by_id(&d, "r")), Point::new(6.0, 8.0));
}

// =============================================================
// Application
// =============================================================

#[test]
fn highlight_skips_headers() {
    let mut d = doc();
    let report = apply(&mut d, &map(vec![FeatureEntry { highlight: Some("Yellow".into()), ..entry("F1") }])).unwrap();
    assert_eq!(report.matched, 2);
    assert_eq!(d.style(by_id(&d, "cell"), "fill").as_deref(), Some("Yellow"));
    assert_eq!(d.style(by_id(&d, "head"), "fill"), None);
}

#[test]
fn glyph_is_pending_until_loaded() {
    let mut d = doc();
    let report = apply(&mut d, &map(vec![FeatureEntry { glyph: glyph("Tick", "Middle Right"), ..entry("F1") }])).unwrap();
    assert_eq!(report.glyphs.len(), 1);
    let pending = &report.glyphs[0];
    assert_eq!(pending.href, "/media/glyphs/tick.svg");
    assert_eq!(pending.origin, Point::new(110.0, 70.0));
    assert_eq!(pending.container, Size::new(120.0, 40.0));

    let image = pending.insert(&mut d, Size::new(20.0, 10.0));
    assert_eq!(d.parent(image), Some(d.root()));
    assert_eq!(d.attr(image, "transform"), Some("translate(210.0 85.0)"));
    assert_eq!(d.attr(image, "width"), Some("20.0"));
    assert_eq!(d.attr(image, "x"), Some("0"));
    assert!(d.has_class(image, IMAGE_CLASS));
}

#[test]
fn unknown_glyph_label_is_skipped() {
    let mut d = doc();
    let report = apply(&mut d, &map(vec![FeatureEntry { glyph: glyph("Sparkle", ""), ..entry("F1") }])).unwrap();
    assert!(report.glyphs.is_empty());
}

#[test]
fn bad_alignment_leaves_document_untouched() {
    let mut d = doc();
    let before = d.to_xml(d.root());
    let result = apply(&mut d, &map(vec![
        FeatureEntry { highlight: Some("Red".into()), ..entry("F1") },
        FeatureEntry { glyph: glyph("Tick", "Upper"), ..entry("F1") },
    ]));
    assert_eq!(result, Err(OverlayError::Alignment("Upper".into())));
    assert_eq!(d.to_xml(d.root()), before);
}

#[test]
fn link_wraps_or_updates_and_skips_groups() {
    let mut d = doc();
    apply(&mut d, &map(vec![
        FeatureEntry { link: Some("https://a.example".into()), ..entry("F1") },
        FeatureEntry { link: Some("https://b.example".into()), ..entry("F2") },
        FeatureEntry { link: Some("https://c.example".into()), ..entry("F3") },
    ]))
    .unwrap();

    let cell = by_id(&d, "cell");
    let wrapper = d.parent(cell).unwrap();
    assert!(d.is_named(wrapper, "a"));
    assert_eq!(d.attr(wrapper, "href"), Some("https://a.example"));
    assert_eq!(d.attr(wrapper, "target"), Some("_blank"));

    assert!(d.is_named(d.parent(by_id(&d, "grp")).unwrap(), "svg"));
    assert_eq!(d.attr(by_id(&d, "link"), "href"), Some("https://c.example"));
}

#[test]
fn empty_link_removes_href() {
    let mut d = doc();
    let report = apply(&mut d, &map(vec![FeatureEntry { link: Some(String::new()), ..entry("F3") }])).unwrap();
    assert_eq!(report.changes, 1);
    assert_eq!(d.attr(by_id(&d, "link"), "href"), None);
}

#[test]
fn notes_create_then_update_title() {
    let mut d = doc();
    apply(&mut d, &map(vec![FeatureEntry { notes: Some("First".into()), ..entry("F3") }])).unwrap();
    apply(&mut d, &map(vec![FeatureEntry { notes: Some("Second".into()), ..entry("F3") }])).unwrap();
    let linked = by_id(&d, "linked");
    let titles: Vec<_> = d.element_children(linked).filter(|c| d.is_named(*c, "title")).collect();
    assert_eq!(titles.len(), 1);
    assert_eq!(d.text_content(titles[0]), "Second");
}

#[test]
fn notes_skip_groups() {
    let mut d = doc();
    apply(&mut d, &map(vec![FeatureEntry { notes: Some("x".into()), ..entry("F2") }])).unwrap();
    assert!(d.find_descendant(by_id(&d, "grp"), "title").is_none());
}

#[test]
fn reapplying_is_idempotent_except_for_glyphs() {
    let features = map(vec![FeatureEntry {
        highlight: Some("Yellow".into()),
        glyph: glyph("Star", "Top Left"),
        link: Some("https://a.example".into()),
        notes: Some("Hello".into()),
        ..entry("F1")
    }]);
    let mut d = doc();
    let size = Size::new(16.0, 16.0);

    for pending in apply(&mut d, &features).unwrap().glyphs {
        pending.insert(&mut d, size);
    }
    let once = d.to_xml(d.root());
    let images_once = d.elements().into_iter().filter(|n| d.has_class(*n, IMAGE_CLASS)).count();

    for pending in apply(&mut d, &features).unwrap().glyphs {
        pending.insert(&mut d, size);
    }
    let images_twice = d.elements().into_iter().filter(|n| d.has_class(*n, IMAGE_CLASS)).count();

    assert_eq!(images_once, 1);
    assert_eq!(images_twice, 2, "glyphs stack on re-application");

    let cell = by_id(&d, "cell");
    let wrapper = d.parent(cell).unwrap();
    assert!(!d.is_named(d.parent(wrapper).unwrap(), "a"), "link is not double wrapped");
    assert_eq!(d.style(cell, "fill").as_deref(), Some("Yellow"));
    assert_eq!(d.element_children(cell).filter(|c| d.is_named(*c, "title")).count(), 1);

    let last_image = d.elements().into_iter().rev().find(|n| d.has_class(*n, IMAGE_CLASS)).unwrap();
    d.remove(last_image);
    assert_eq!(d.to_xml(d.root()), once);
}
