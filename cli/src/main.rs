use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand, ValueEnum};
use futures_util::future::join_all;
use serde_json::{Value, json};
use svgnote::camera::Size;
use svgnote::dialog::{Prompt, Prompter, UserChoice};
use svgnote::doc::{DocError, DocStore};
use svgnote::engine::{Action, EngineCore, EngineError, Host, RasterExport, Ticket};
use svgnote::render::{self, Bounds};
use svgnote::route::{self, Route, SAVED_PAGE};
use svgnote::settings::Settings;
use svgnote::store::{self, FeatureMap, KeyValueStore, MemoryStore, SavedDiagram, StoreError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid viewport `{0}`; expected WIDTHxHEIGHT")]
    InvalidViewport(String),
    #[error("no site root; pass --site or set SVGNOTE_SITE to fetch {0}")]
    MissingSite(String),
    #[error("{path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GET {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Doc(#[from] DocError),
    #[error("diagram could not be loaded")]
    NotLoaded,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("render failed: {0}")]
    Render(String),
}

impl CliError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.display().to_string(), source }
    }
}

#[derive(Parser, Debug)]
#[command(name = "svgnote", about = "Headless SVG diagram annotation host")]
struct Cli {
    /// JSON file holding the key-value store.
    #[arg(long, env = "SVGNOTE_STORE", default_value = "svgnote-store.json")]
    store: PathBuf,

    /// Site root for glyph fetches: an HTTP base URL or a directory.
    #[arg(long, env = "SVGNOTE_SITE")]
    site: Option<String>,

    #[arg(long, env = "SVGNOTE_VIEWPORT", default_value = "1280x800", value_parser = parse_viewport)]
    viewport: Size,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    site: Option<String>,
    viewport: Size,
    client: reqwest::Client,
}

#[derive(Subcommand, Debug)]
enum Command {
    Saved(SavedCommand),
    Maps(MapsCommand),
    /// Report how a diagram fits the viewport.
    Fit {
        #[command(flatten)]
        source: SourceArgs,
        /// Zoom mode overriding the stored setting.
        #[arg(long)]
        mode: Option<String>,
    },
    /// Toggle a built-in diagram's flag.
    Flag { name: String },
    Settings(SettingsCommand),
}

#[derive(Args, Debug)]
struct SavedCommand {
    #[command(subcommand)]
    command: SavedSubcommand,
}

#[derive(Subcommand, Debug)]
enum SavedSubcommand {
    List,
    Show {
        key: String,
    },
    Rename {
        key: String,
        title: String,
    },
    Delete {
        key: String,
    },
    Export {
        key: String,
        #[arg(long, value_enum, default_value = "svg")]
        format: ExportFormat,
        /// Output file; defaults to the export's own filename.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Import {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(Args, Debug)]
struct MapsCommand {
    #[command(subcommand)]
    command: MapsSubcommand,
}

#[derive(Subcommand, Debug)]
enum MapsSubcommand {
    List,
    Show {
        id: String,
    },
    Import {
        id: String,
        file: PathBuf,
    },
    /// Apply a feature map and write the annotated markup.
    Apply {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        map: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SettingsCommand {
    #[command(subcommand)]
    command: SettingsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SettingsSubcommand {
    Show,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Storage key of a saved diagram.
    #[arg(long)]
    saved: Option<String>,
    /// Built-in diagram markup on disk.
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Svg,
    Png,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext { site: cli.site, viewport: cli.viewport, client: reqwest::Client::new() };
    let mut store = JsonFileStore::open(cli.store)?;

    let result = run(&ctx, &mut store, cli.command).await;
    store.persist()?;
    result
}

// =============================================================================
// Commands
// =============================================================================

async fn run(ctx: &CliContext, store: &mut JsonFileStore, command: Command) -> Result<(), CliError> {
    match command {
        Command::Saved(saved) => run_saved(ctx, store, saved).await,
        Command::Maps(maps) => run_maps(ctx, store, maps).await,
        Command::Fit { source, mode } => run_fit(ctx, store, &source, mode).await,
        Command::Flag { name } => {
            let flagged = store::toggle_flag(store, &name)?;
            print_json(&json!({ "name": name, "flagged": flagged }))
        }
        Command::Settings(settings) => match settings.command {
            SettingsSubcommand::Show => print_json(&serde_json::to_value(store::load_settings(store))?),
        },
    }
}

async fn run_saved(ctx: &CliContext, store: &mut JsonFileStore, saved: SavedCommand) -> Result<(), CliError> {
    match saved.command {
        SavedSubcommand::List => {
            let rows: Vec<Value> = store::list_saved(store)
                .into_iter()
                .map(|entry| json!({ "key": entry.key, "title": entry.title, "url": route::saved_url(&entry.key) }))
                .collect();
            print_json(&Value::Array(rows))
        }
        SavedSubcommand::Show { key } => {
            let diagram = store::load_saved_diagram(store, &key)?;
            println!("{}", store::clean_markup(&diagram.svg_xml));
            Ok(())
        }
        SavedSubcommand::Rename { key, title } => {
            if !store::rename_saved(store, &key, &title)? {
                return Err(CliError::NotFound(key));
            }
            print_json(&json!({ "key": key, "title": title }))
        }
        SavedSubcommand::Delete { key } => {
            if !store::delete_saved(store, &key) {
                return Err(CliError::NotFound(key));
            }
            print_json(&json!({ "key": key, "deleted": true }))
        }
        SavedSubcommand::Export { key, format, out } => {
            let source = SourceArgs { saved: Some(key), file: None };
            let settings = store::load_settings(store);
            let engine = open_engine(ctx, store, &source, None, settings).await?;
            export(&engine, format, out)
        }
        SavedSubcommand::Import { file, title } => {
            let markup = fs::read_to_string(&file).map_err(|e| CliError::io(&file, e))?;
            DocStore::parse(&markup)?;
            let title = title.unwrap_or_else(|| file_stem(&file));
            let key = store::new_key(now_ms());
            store::save_diagram(store, &key, &SavedDiagram { title: title.clone(), svg_xml: markup })?;
            info!(%key, %title, "diagram imported");
            print_json(&json!({ "key": key, "title": title, "url": route::saved_url(&key) }))
        }
    }
}

async fn run_maps(ctx: &CliContext, store: &mut JsonFileStore, maps: MapsCommand) -> Result<(), CliError> {
    match maps.command {
        MapsSubcommand::List => {
            let rows: Vec<Value> =
                store::list_feature_maps(store).into_iter().map(|entry| json!({ "id": entry.key, "title": entry.title })).collect();
            print_json(&Value::Array(rows))
        }
        MapsSubcommand::Show { id } => print_json(&serde_json::to_value(store::load_feature_map(store, &id)?)?),
        MapsSubcommand::Import { id, file } => {
            let text = fs::read_to_string(&file).map_err(|e| CliError::io(&file, e))?;
            let map: FeatureMap = serde_json::from_str(&text)?;
            store::save_feature_map(store, &id, &map)?;
            print_json(&json!({ "id": id, "title": map.title, "features": map.features.len() }))
        }
        MapsSubcommand::Apply { source, map, out } => {
            let settings = store::load_settings(store);
            let engine = open_engine(ctx, store, &source, Some(&map), settings).await?;
            let markup = engine.serialize().ok_or(CliError::NotLoaded)?;
            write_output(out.as_deref(), markup.as_bytes())
        }
    }
}

async fn run_fit(ctx: &CliContext, store: &mut JsonFileStore, source: &SourceArgs, mode: Option<String>) -> Result<(), CliError> {
    let mut settings = store::load_settings(store);
    if let Some(mode) = mode {
        settings.zoom = mode;
    }
    let engine = open_engine(ctx, store, source, None, settings).await?;
    let camera = &engine.camera;
    print_json(&json!({
        "title": engine.title,
        "mode": engine.settings.zoom,
        "native": { "width": camera.native.width, "height": camera.native.height },
        "viewport": { "width": camera.viewport.width, "height": camera.viewport.height },
        "size": { "width": camera.size.width, "height": camera.size.height },
        "left": camera.left,
        "top": camera.top,
        "ratio": { "x": camera.ratio_x, "y": camera.ratio_y },
    }))
}

fn export(engine: &EngineCore, format: ExportFormat, out: Option<PathBuf>) -> Result<(), CliError> {
    match format {
        ExportFormat::Svg => {
            let export = engine.export_svg().ok_or(CliError::NotLoaded)?;
            let path = out.unwrap_or_else(|| PathBuf::from(&export.filename));
            write_output(Some(&path), export.markup.as_bytes())
        }
        ExportFormat::Png => {
            let markup = engine.serialize().ok_or(CliError::NotLoaded)?;
            let native = engine.camera.native;
            let bbox = measure_markup(&markup).unwrap_or(Bounds::new(0.0, 0.0, native.width, native.height));
            let raster = engine.export_png(bbox).ok_or(CliError::NotLoaded)?;
            let png = rasterize(&raster)?;
            let path = out.unwrap_or_else(|| PathBuf::from(&raster.filename));
            write_output(Some(&path), &png)
        }
    }
}

// =============================================================================
// Engine driving
// =============================================================================

/// Load a diagram into a fresh engine and settle every image and glyph load it asks for.
async fn open_engine(
    ctx: &CliContext,
    store: &mut JsonFileStore,
    source: &SourceArgs,
    map: Option<&str>,
    settings: Settings,
) -> Result<EngineCore, CliError> {
    let mut engine = EngineCore::with_settings(settings)?;
    engine.camera.viewport = ctx.viewport;

    let map_segment = map.map(|id| format!("${id}"));
    let (route, builtin) = match (&source.saved, &source.file) {
        (Some(key), _) => {
            let hash = match &map_segment {
                Some(segment) => format!("#*{key}/{segment}"),
                None => format!("#*{key}"),
            };
            (Route::parse(SAVED_PAGE, &hash), None)
        }
        (None, Some(path)) => {
            let markup = fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
            let page = format!("/{}.htm", file_stem(path));
            (Route::parse(&page, map_segment.as_deref().unwrap_or_default()), Some(markup))
        }
        (None, None) => return Err(CliError::NotLoaded),
    };

    let mut prompter = LogPrompter;
    let measure: &dyn Fn(&str) -> Option<Bounds> = &measure_markup;
    let actions = {
        let mut host = Host::new(store, &mut prompter).with_measure(measure);
        engine.open(route, builtin.as_deref(), &mut host)?
    };
    if engine.doc.is_none() || actions.iter().any(|a| matches!(a, Action::NavigateBack | Action::Navigate(_))) {
        return Err(CliError::NotLoaded);
    }
    settle(ctx, &mut engine, actions, &mut prompter).await?;
    Ok(engine)
}

enum Load {
    Image(Ticket, String),
    Text(Ticket, String),
}

impl Load {
    fn url(&self) -> &str {
        match self {
            Self::Image(_, url) | Self::Text(_, url) => url,
        }
    }
}

/// Answer `LoadImage`/`FetchText` requests until the engine stops asking.
async fn settle(ctx: &CliContext, engine: &mut EngineCore, mut actions: Vec<Action>, prompter: &mut dyn Prompter) -> Result<(), CliError> {
    loop {
        let loads: Vec<Load> = actions
            .drain(..)
            .filter_map(|action| match action {
                Action::LoadImage { ticket, url } => Some(Load::Image(ticket, url)),
                Action::FetchText { ticket, url } => Some(Load::Text(ticket, url)),
                _ => None,
            })
            .collect();
        if loads.is_empty() {
            return Ok(());
        }
        debug!(count = loads.len(), "settling loads");

        let bodies = join_all(loads.iter().map(|load| fetch_text(ctx, load.url()))).await;
        for (load, body) in loads.into_iter().zip(bodies) {
            match load {
                Load::Image(ticket, url) => match body.and_then(|svg| natural_size(&svg)) {
                    Ok(size) => actions.extend(engine.image_loaded(ticket, size)),
                    Err(e) => {
                        warn!(%url, error = %e, "image unavailable");
                        engine.image_failed(ticket);
                    }
                },
                Load::Text(ticket, _) => {
                    actions.extend(engine.glyph_fetched(ticket, body.map_err(|e| e.to_string()), prompter));
                }
            }
        }
    }
}

/// Body of `url`: decoded inline for `data:` URLs, else fetched from the site root.
async fn fetch_text(ctx: &CliContext, url: &str) -> Result<String, CliError> {
    if let Some(data) = url.strip_prefix("data:") {
        let payload = data.split_once(',').map_or(data, |(_, payload)| payload);
        return Ok(render::decode_component(payload));
    }
    let site = ctx.site.as_deref().ok_or_else(|| CliError::MissingSite(url.to_owned()))?;

    if site.starts_with("http://") || site.starts_with("https://") {
        let full = format!("{}/{}", site.trim_end_matches('/'), url.trim_start_matches('/'));
        let response = ctx.client.get(&full).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CliError::HttpStatus { url: full, status: status.as_u16() });
        }
        return Ok(response.text().await?);
    }

    let path = Path::new(site).join(url.trim_start_matches('/'));
    tokio::fs::read_to_string(&path).await.map_err(|e| CliError::io(&path, e))
}

/// Dialogs have no one to answer them here: messages are logged and acknowledged, questions cancelled.
struct LogPrompter;

impl Prompter for LogPrompter {
    fn prompt(&mut self, prompt: &Prompt) -> UserChoice {
        warn!(message = %prompt.message, "dialog");
        if prompt.input.is_none() && prompt.colour.is_none() && prompt.alternate.is_none() && prompt.items.is_empty() {
            UserChoice::ok()
        } else {
            UserChoice::Cancel
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn svg_options() -> usvg::Options<'static> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    options
}

fn parse_tree(markup: &str) -> Result<usvg::Tree, CliError> {
    usvg::Tree::from_str(markup, &svg_options()).map_err(|e| CliError::Render(e.to_string()))
}

fn natural_size(svg: &str) -> Result<Size, CliError> {
    let size = parse_tree(svg)?.size();
    Ok(Size::new(f64::from(size.width()), f64::from(size.height())))
}

/// Rendered bounding box of the markup, strokes included.
fn measure_markup(markup: &str) -> Option<Bounds> {
    match parse_tree(markup) {
        Ok(tree) => {
            let rect = tree.root().abs_stroke_bounding_box();
            Some(Bounds::new(f64::from(rect.x()), f64::from(rect.y()), f64::from(rect.width()), f64::from(rect.height())))
        }
        Err(e) => {
            debug!(error = %e, "markup could not be measured");
            None
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn rasterize(raster: &RasterExport) -> Result<Vec<u8>, CliError> {
    let tree = parse_tree(&raster.markup)?;
    let size = tree.size();
    let scale_x = raster.width as f32 / size.width();
    let scale_y = raster.height as f32 / size.height();

    let mut pixmap = tiny_skia::Pixmap::new(raster.width, raster.height)
        .ok_or_else(|| CliError::Render(format!("failed to allocate {}x{} surface", raster.width, raster.height)))?;
    resvg::render(&tree, tiny_skia::Transform::from_scale(scale_x, scale_y), &mut pixmap.as_mut());
    pixmap.encode_png().map_err(|e| CliError::Render(e.to_string()))
}

// =============================================================================
// Store
// =============================================================================

/// Key-value store persisted as one pretty-printed JSON object.
struct JsonFileStore {
    path: PathBuf,
    entries: MemoryStore,
    dirty: bool,
}

impl JsonFileStore {
    fn open(path: PathBuf) -> Result<Self, CliError> {
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => MemoryStore::new(),
            Err(e) => return Err(CliError::io(&path, e)),
        };
        Ok(Self { path, entries, dirty: false })
    }

    fn persist(&mut self) -> Result<(), CliError> {
        if !self.dirty {
            return Ok(());
        }
        let rendered = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, rendered).map_err(|e| CliError::io(&self.path, e))?;
        self.dirty = false;
        debug!(path = %self.path.display(), entries = self.entries.len(), "store written");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.set(key, value);
        self.dirty = true;
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.dirty = true;
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_viewport(value: &str) -> Result<Size, CliError> {
    let invalid = || CliError::InvalidViewport(value.to_owned());
    let (width, height) = value.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: f64 = width.trim().parse().map_err(|_| invalid())?;
    let height: f64 = height.trim().parse().map_err(|_| invalid())?;
    let size = Size::new(width, height);
    if size.is_usable() { Ok(size) } else { Err(invalid()) }
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), CliError> {
    match path {
        Some(path) => {
            fs::write(path, bytes).map_err(|e| CliError::io(path, e))?;
            info!(path = %path.display(), bytes = bytes.len(), "written");
            Ok(())
        }
        None => {
            let mut stdout = io::stdout().lock();
            io::Write::write_all(&mut stdout, bytes).map_err(|e| CliError::io(Path::new("<stdout>"), e))
        }
    }
}

fn now_ms() -> u128 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    duration.as_millis()
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;
