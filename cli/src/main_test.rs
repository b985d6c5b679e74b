use super::*;

const DIAGRAM: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="200">
  <rect id="box" data-feature="F1" x="10" y="10" width="100" height="50"/>
</svg>"##;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("svgnote-cli-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn context(site: Option<&Path>) -> CliContext {
    CliContext {
        site: site.map(|p| p.display().to_string()),
        viewport: Size::new(800.0, 400.0),
        client: reqwest::Client::new(),
    }
}

fn file_source(path: &Path) -> SourceArgs {
    SourceArgs { saved: None, file: Some(path.to_path_buf()) }
}

// =============================================================================
// parse_viewport
// =============================================================================

#[test]
fn viewport_parses_width_by_height() {
    let size = parse_viewport("1280x800").unwrap();
    assert_eq!(size, Size::new(1280.0, 800.0));
    assert_eq!(parse_viewport("640X480").unwrap(), Size::new(640.0, 480.0));
}

#[test]
fn viewport_rejects_malformed_and_empty_sizes() {
    assert!(matches!(parse_viewport("1280"), Err(CliError::InvalidViewport(_))));
    assert!(matches!(parse_viewport("wide x tall"), Err(CliError::InvalidViewport(_))));
    assert!(matches!(parse_viewport("0x800"), Err(CliError::InvalidViewport(_))));
}

// =============================================================================
// JsonFileStore
// =============================================================================

#[test]
fn store_starts_empty_when_file_is_missing() {
    let dir = scratch_dir("missing");
    let store = JsonFileStore::open(dir.join("absent.json")).unwrap();
    assert!(store.keys().is_empty());
}

#[test]
fn store_persists_only_after_changes() {
    let dir = scratch_dir("persist");
    let path = dir.join("store.json");
    fs::remove_file(&path).unwrap_or_default();

    let mut store = JsonFileStore::open(path.clone()).unwrap();
    store.persist().unwrap();
    assert!(!path.exists());

    store::save_diagram(&mut store, "100", &SavedDiagram { title: "Mine".into(), svg_xml: DIAGRAM.into() }).unwrap();
    store.persist().unwrap();

    let reopened = JsonFileStore::open(path).unwrap();
    let listed = store::list_saved(&reopened);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Mine");
}

// =============================================================================
// Fetching
// =============================================================================

#[tokio::test]
async fn data_urls_decode_without_a_site() {
    let ctx = context(None);
    let body = fetch_text(&ctx, "data:image/svg+xml;charset=utf-8,%3Csvg%3E").await.unwrap();
    assert_eq!(body, "<svg>");
}

#[tokio::test]
async fn relative_urls_need_a_site() {
    let ctx = context(None);
    let err = fetch_text(&ctx, "/media/glyphs/tick.svg").await.unwrap_err();
    assert!(matches!(err, CliError::MissingSite(_)));
}

#[tokio::test]
async fn relative_urls_read_from_a_site_directory() {
    let dir = scratch_dir("site");
    fs::create_dir_all(dir.join("media/glyphs")).unwrap();
    fs::write(dir.join("media/glyphs/tick.svg"), "<svg/>").unwrap();

    let ctx = context(Some(&dir));
    assert_eq!(fetch_text(&ctx, "/media/glyphs/tick.svg").await.unwrap(), "<svg/>");
}

// =============================================================================
// Prompter
// =============================================================================

#[test]
fn log_prompter_acknowledges_messages_and_cancels_questions() {
    let mut prompter = LogPrompter;
    assert_eq!(prompter.prompt(&Prompt::message("Failed to locate saved diagram")), UserChoice::ok());
    assert_eq!(prompter.prompt(&Prompt::yes_no_cancel("Overwrite existing diagram?")), UserChoice::Cancel);
    assert_eq!(prompter.prompt(&Prompt::text("Save diagram as", "Flow")), UserChoice::Cancel);
}

// =============================================================================
// open_engine
// =============================================================================

#[tokio::test]
async fn open_engine_fits_a_file_diagram() {
    let dir = scratch_dir("fit");
    let file = dir.join("Flow.svg");
    fs::write(&file, DIAGRAM).unwrap();
    let mut store = JsonFileStore::open(dir.join("store.json")).unwrap();

    let engine = open_engine(&context(None), &mut store, &file_source(&file), None, Settings::default()).await.unwrap();
    assert_eq!(engine.title, "Flow");
    assert_eq!(engine.camera.native, Size::new(400.0, 200.0));
    assert_eq!(engine.camera.size, Size::new(800.0, 400.0));
}

#[tokio::test]
async fn open_engine_applies_a_feature_map() {
    let dir = scratch_dir("apply");
    let file = dir.join("Flow.svg");
    fs::write(&file, DIAGRAM).unwrap();
    let mut store = JsonFileStore::open(dir.join("store.json")).unwrap();
    let map: FeatureMap = serde_json::from_value(json!({
        "Title": "Status",
        "Features": [{ "Feature": "F1", "Highlight": "#00FF00" }]
    }))
    .unwrap();
    store::save_feature_map(&mut store, "status", &map).unwrap();

    let engine =
        open_engine(&context(None), &mut store, &file_source(&file), Some("status"), Settings::default()).await.unwrap();
    let markup = engine.serialize().unwrap();
    assert!(markup.contains("#00FF00"), "{markup}");
}

#[tokio::test]
async fn open_engine_fails_for_a_missing_saved_diagram() {
    let dir = scratch_dir("missing-saved");
    let mut store = JsonFileStore::open(dir.join("store.json")).unwrap();
    let source = SourceArgs { saved: Some("404".into()), file: None };

    let result = open_engine(&context(None), &mut store, &source, None, Settings::default()).await;
    assert!(matches!(result, Err(CliError::NotLoaded)));
}

#[tokio::test]
async fn unknown_zoom_mode_is_an_engine_error() {
    let dir = scratch_dir("zoom");
    let file = dir.join("Flow.svg");
    fs::write(&file, DIAGRAM).unwrap();
    let mut store = JsonFileStore::open(dir.join("store.json")).unwrap();
    let settings = Settings { zoom: "Sideways".into(), ..Settings::default() };

    let result = open_engine(&context(None), &mut store, &file_source(&file), None, settings).await;
    assert!(matches!(result, Err(CliError::Engine(_))));
}
