use super::*;

#[test]
fn gallery_has_every_glyph_once() {
    assert_eq!(GLYPH_GALLERY.len(), 39);
    for (i, g) in GLYPH_GALLERY.iter().enumerate() {
        assert!(g.image.starts_with("/media/glyphs/") && g.image.ends_with(".svg"), "{}", g.image);
        assert!(GLYPH_GALLERY[i + 1..].iter().all(|o| o.label != g.label), "duplicate {}", g.label);
    }
}

#[test]
fn find_is_exact() {
    assert_eq!(find("Tick").map(|g| g.image), Some("/media/glyphs/tick.svg"));
    assert_eq!(find("Completion: 50%").map(|g| g.image), Some("/media/glyphs/percent-2.svg"));
    assert!(find("tick").is_none());
}

#[test]
fn gallery_items_carry_index_ids() {
    let items = gallery_items();
    assert_eq!(items.len(), GLYPH_GALLERY.len());
    assert_eq!(items[3].label, "Star");
    assert_eq!(items[3].id.as_deref(), Some("3"));
    assert_eq!(items[3].image.as_deref(), Some("/media/glyphs/star.svg"));
}

#[test]
fn legacy_names() {
    assert_eq!(legacy_glyph_name("https://example.org/media/sprites.svg#tick"), Some("tick"));
    assert_eq!(legacy_glyph_name("/media/sprites.svg#label-done"), Some("label-done"));
    assert_eq!(legacy_glyph_name("/media/glyphs/tick.svg"), None);
    assert_eq!(legacy_glyph_name("/media/sprites.svg#"), None);
    assert_eq!(glyph_path("tick"), "/media/glyphs/tick.svg");
}

#[test]
fn data_url_escapes_percent_first() {
    let url = svg_to_data_url("<svg fill=\"#f00\" a='50%'>\n</svg>");
    assert_eq!(url, "data:image/svg+xml;charset=utf-8,<svg fill=%22%23f00%22 a=%2750%25%27></svg>");
}
