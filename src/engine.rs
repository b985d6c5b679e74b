use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::camera::{Camera, FitMode, FitModeError, Point, Size};
use crate::consts::{
    DRAW_CLASS, DRAW_PALETTE, IMAGE_CLASS, IMAGE_FIT_FRACTION, PAINT_THRESHOLD_PX, QUICK_HIGHLIGHT_CLASSES,
    ROTATE_STEP_DEG, SCALE_MAX, SCALE_MIN, SELECT_CLASS, TEXT_CLASS, ZOOM_STEP,
};
use crate::dialog::{Prompt, PromptItem, Prompter, UserChoice};
use crate::doc::{DocError, DocStore, NodeId};
use crate::glyphs::{self, GLYPH_GALLERY};
use crate::hit::{self, AnnotationKind};
use crate::input::{EditMode, Gesture, GestureNormalizer, InputEvent, Key, Modifiers, manhattan};
use crate::menu::Menu;
use crate::overlay::{self, OverlayError, PendingGlyph};
use crate::render::{self, Bounds};
use crate::route::{self, Route};
use crate::session::{BodyMarker, DragAction, EditTracker, Session};
use crate::settings::{Filters, Settings};
use crate::store::{self, KeyValueStore, SavedDiagram, StoreError};
use crate::transform::Transform;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Identifies an asynchronous load the host performs on the engine's behalf.
pub type Ticket = u64;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The document or camera changed.
    RenderNeeded,
    SetBodyMarker(BodyMarker),
    /// Remove every in-progress marker.
    ClearBodyMarkers,
    /// The unsaved-changes flag changed; `title` is the new page title.
    EditsChanged { has_edits: bool, title: String },
    /// Decode the image at `url` and report its natural size via [`EngineCore::image_loaded`].
    LoadImage { ticket: Ticket, url: String },
    /// Fetch `url` as text and report it via [`EngineCore::glyph_fetched`].
    FetchText { ticket: Ticket, url: String },
    /// Let the user pick a local image file and report it via [`EngineCore::upload_selected`].
    RequestUpload,
    Navigate(String),
    NavigateBack,
    /// Suppress the browser's default handling of the event.
    PreventDefault,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Doc(#[from] DocError),
    #[error("no markup supplied for built-in diagram")]
    MissingMarkup,
    #[error("diagram has no usable native size")]
    NativeSize,
    #[error(transparent)]
    Zoom(#[from] FitModeError),
    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

impl EngineError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Doc(_) => "E_MARKUP",
            Self::MissingMarkup => "E_MISSING_MARKUP",
            Self::NativeSize => "E_NATIVE_SIZE",
            Self::Zoom(_) => "E_ZOOM_MODE",
            Self::Overlay(_) => "E_ALIGNMENT",
        }
    }
}

/// Host services needed by loading, saving and feature map operations.
pub struct Host<'a> {
    pub store: &'a mut dyn KeyValueStore,
    pub prompter: &'a mut dyn Prompter,
    /// Rendered bounding box of some markup, used when the root carries
    /// neither `width`/`height` nor a `viewBox`.
    pub measure: &'a dyn Fn(&str) -> Option<Bounds>,
}

impl<'a> Host<'a> {
    pub fn new(store: &'a mut dyn KeyValueStore, prompter: &'a mut dyn Prompter) -> Self {
        Self { store, prompter, measure: &no_bounds }
    }

    #[must_use]
    pub fn with_measure(mut self, measure: &'a dyn Fn(&str) -> Option<Bounds>) -> Self {
        self.measure = measure;
        self
    }
}

fn no_bounds(_: &str) -> Option<Bounds> {
    None
}

/// Current colour of each colour-bearing tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolColours {
    pub highlight: String,
    pub draw: String,
    pub text: String,
}

impl ToolColours {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            highlight: settings.highlight1.clone(),
            draw: settings.highlight2.clone(),
            text: settings.highlight3.clone(),
        }
    }

    fn for_mode(&mut self, mode: EditMode) -> Option<&mut String> {
        match mode {
            EditMode::Highlight => Some(&mut self.highlight),
            EditMode::Draw => Some(&mut self.draw),
            EditMode::Text => Some(&mut self.text),
            EditMode::Off | EditMode::Image | EditMode::Link | EditMode::Notes => None,
        }
    }
}

/// A file to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub filename: String,
    pub markup: String,
}

/// Everything the host needs to rasterize a PNG export.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterExport {
    pub filename: String,
    pub markup: String,
    /// View box written into `markup`.
    pub view: Bounds,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
enum PendingLoad {
    /// An image dropped at a native point once decoded.
    Image { href: String, at: Point },
    /// A feature map glyph.
    Glyph(PendingGlyph),
    /// Gallery markup being fetched, to become an [`PendingLoad::Image`].
    Gallery { at: Point },
    /// Standalone file for a sprite-sheet reference.
    Legacy { image: NodeId, attr: &'static str },
}

#[derive(Debug, Clone, Copy, Default)]
struct Migration {
    outstanding: usize,
    migrated: usize,
    failed: usize,
}

enum SaveOutcome {
    Overwritten,
    SavedAs(String),
}

const LEGACY_WARNING: &str = "Failed to update saved diagram legacy images. Manual correction may be required.";

/// Core engine state: the loaded diagram and everything needed to edit it,
/// independent of any rendering surface.
pub struct EngineCore {
    pub doc: Option<DocStore>,
    pub camera: Camera,
    pub session: Session,
    pub menu: Menu,
    pub settings: Settings,
    pub route: Route,
    pub tools: ToolColours,
    pub filters: Filters,
    /// Page title, with a trailing `" *"` while there are unsaved edits.
    pub title: String,
    /// Title of the loaded saved diagram.
    pub saved_title: Option<String>,
    fit_mode: FitMode,
    builtin: Option<String>,
    normalizer: GestureNormalizer,
    pending: BTreeMap<Ticket, PendingLoad>,
    next_ticket: Ticket,
    upload_at: Option<Point>,
    migration: Migration,
}

impl Default for EngineCore {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            doc: None,
            camera: Camera::default(),
            session: Session::new(),
            menu: Menu::new(settings.menu_open()),
            tools: ToolColours::from_settings(&settings),
            filters: settings.filters,
            settings,
            route: Route::default(),
            title: String::new(),
            saved_title: None,
            fit_mode: FitMode::Fit,
            builtin: None,
            normalizer: GestureNormalizer::new(),
            pending: BTreeMap::new(),
            next_ticket: 1,
            upload_at: None,
            migration: Migration::default(),
        }
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine configured from stored user settings.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Zoom`] when the zoom setting is not a known mode.
    pub fn with_settings(settings: Settings) -> Result<Self, EngineError> {
        let fit_mode = settings.fit_mode()?;
        Ok(Self {
            menu: Menu::new(settings.menu_open()),
            tools: ToolColours::from_settings(&settings),
            filters: settings.filters,
            fit_mode,
            settings,
            ..Self::default()
        })
    }

    // --- Loading ---

    /// Load the diagram addressed by `route`. `builtin` is the markup of a
    /// built-in diagram page and is ignored for saved diagrams.
    ///
    /// Storage failures are reported to the user and answered with
    /// [`Action::NavigateBack`] (except when comparing); they are not errors.
    ///
    /// # Errors
    ///
    /// Fails when built-in markup is missing or malformed, when the native
    /// size cannot be resolved, or when the feature map has a bad alignment.
    pub fn open(&mut self, route: Route, builtin: Option<&str>, host: &mut Host<'_>) -> Result<Vec<Action>, EngineError> {
        let mut actions = Vec::new();
        if let Some(redirect) = route.redirect.clone() {
            info!(%redirect, "redirecting legacy address");
            actions.push(Action::Navigate(redirect));
            return Ok(actions);
        }

        self.menu.hidden = route.comparing;
        self.route = route;
        self.builtin = builtin.map(str::to_owned);

        if self.load_document(host, &mut actions)? && self.route.feature_map.is_some() {
            self.apply_map(host, &mut actions)?;
        }
        Ok(actions)
    }

    /// React to a changed hash fragment.
    ///
    /// # Errors
    ///
    /// As for [`EngineCore::open`].
    pub fn hash_changed(&mut self, route: Route, host: &mut Host<'_>) -> Result<Vec<Action>, EngineError> {
        let mut actions = Vec::new();
        if let Some(redirect) = route.redirect.clone() {
            actions.push(Action::Navigate(redirect));
            return Ok(actions);
        }

        let change = route.changes_from(&self.route);
        self.route = route;
        debug!(reload = change.reload, apply_feature_map = change.apply_feature_map, "hash changed");

        if change.reload && !self.load_document(host, &mut actions)? {
            return Ok(actions);
        }
        if change.apply_feature_map {
            self.apply_map(host, &mut actions)?;
        }
        Ok(actions)
    }

    /// Returns `false` when a storage failure stopped the load.
    fn load_document(&mut self, host: &mut Host<'_>, actions: &mut Vec<Action>) -> Result<bool, EngineError> {
        let markup = if self.route.saved {
            let loaded = match self.route.saved_key().filter(|k| !k.is_empty()) {
                Some(key) => store::load_saved_diagram(&*host.store, key),
                None => Err(StoreError::MissingDetails),
            };
            let saved = match loaded {
                Ok(saved) => saved,
                Err(e) => {
                    warn!(code = e.error_code(), error = %e, "saved diagram unavailable");
                    self.report(host.prompter, e.user_message(), actions);
                    return Ok(false);
                }
            };
            self.title = format!("Saved Diagram: {}", saved.title);
            self.saved_title = Some(saved.title);
            store::clean_markup(&saved.svg_xml)
        } else {
            let markup = self.builtin.clone().ok_or(EngineError::MissingMarkup)?;
            self.title = render::decode_component(self.route.filename.as_deref().unwrap_or_default());
            self.saved_title = None;
            markup
        };

        let doc = match DocStore::parse(&markup) {
            Ok(doc) => doc,
            Err(e) if self.route.saved => {
                warn!(error = %e, "saved diagram markup is unreadable");
                self.report(host.prompter, "Failed to process saved diagram data", actions);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let native = match render::native_size(&doc, None) {
            Some(size) => size,
            None => render::native_size(&doc, (host.measure)(&markup)).ok_or(EngineError::NativeSize)?,
        };

        self.doc = Some(doc);
        self.pending.clear();
        self.migration = Migration::default();
        self.session.reset_gesture();
        self.session.edits = EditTracker::default();
        self.camera.native = native;
        actions.extend(self.fit());

        let stored = self.doc.as_ref().and_then(render::read_filters);
        if let Some(doc) = self.doc.as_mut() {
            render::inject_styles(doc, &self.settings);
            render::set_mode_classes(doc, self.session.mode);
            match stored {
                Some(filters) => self.filters = filters,
                None => {
                    self.filters = self.settings.filters;
                    render::apply_filters(doc, &self.filters);
                }
            }
        }

        info!(title = %self.title, width = native.width, height = native.height, saved = self.route.saved, "diagram loaded");
        actions.push(Action::EditsChanged { has_edits: false, title: self.title.clone() });

        if self.route.saved {
            self.migrate_legacy_glyphs(actions);
        }
        Ok(true)
    }

    fn report(&mut self, prompter: &mut dyn Prompter, message: &str, actions: &mut Vec<Action>) {
        self.ask(prompter, &Prompt::message(message));
        if !self.route.comparing {
            actions.push(Action::NavigateBack);
        }
    }

    /// Apply the feature map named by the current route.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Overlay`] for an unknown alignment keyword.
    pub fn apply_feature_map(&mut self, host: &mut Host<'_>) -> Result<Vec<Action>, EngineError> {
        let mut actions = Vec::new();
        self.apply_map(host, &mut actions)?;
        Ok(actions)
    }

    fn apply_map(&mut self, host: &mut Host<'_>, actions: &mut Vec<Action>) -> Result<(), EngineError> {
        let Some(id) = self.route.feature_map.clone() else {
            return Ok(());
        };
        let map = match store::load_feature_map(&*host.store, &id) {
            Ok(map) => map,
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "feature map unavailable");
                self.report(host.prompter, e.user_message(), actions);
                return Ok(());
            }
        };

        let Some(doc) = self.doc.as_mut() else {
            return Ok(());
        };
        let report = overlay::apply(doc, &map)?;
        for glyph in report.glyphs {
            let url = glyph.href.clone();
            let ticket = self.enqueue(PendingLoad::Glyph(glyph));
            actions.push(Action::LoadImage { ticket, url });
        }
        actions.push(Action::RenderNeeded);
        Ok(())
    }

    fn migrate_legacy_glyphs(&mut self, actions: &mut Vec<Action>) {
        let Some(doc) = self.doc.as_ref() else {
            return;
        };
        let mut found = Vec::new();
        for node in doc.elements() {
            if !doc.is_named(node, "image") {
                continue;
            }
            for attr in ["href", "xlink:href"] {
                if let Some(name) = doc.attr(node, attr).and_then(glyphs::legacy_glyph_name) {
                    found.push((node, attr, glyphs::glyph_path(name)));
                }
            }
        }
        if found.is_empty() {
            return;
        }

        info!(count = found.len(), "migrating legacy glyphs");
        self.migration = Migration { outstanding: found.len(), ..Migration::default() };
        for (image, attr, url) in found {
            let ticket = self.enqueue(PendingLoad::Legacy { image, attr });
            actions.push(Action::FetchText { ticket, url });
        }
    }

    fn enqueue(&mut self, load: PendingLoad) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.insert(ticket, load);
        ticket
    }

    // --- Asynchronous completions ---

    /// An image requested with [`Action::LoadImage`] finished decoding.
    pub fn image_loaded(&mut self, ticket: Ticket, natural: Size) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(load) = self.pending.remove(&ticket) else {
            debug!(ticket, "image load for unknown ticket");
            return actions;
        };
        let native = self.camera.native;
        let Some(doc) = self.doc.as_mut() else {
            return actions;
        };

        match load {
            PendingLoad::Image { href, at } => {
                let mut size = natural;
                if size.width > native.width || size.height > native.height {
                    let scale = IMAGE_FIT_FRACTION * (native.width / size.width).min(native.height / size.height);
                    size = Size::new(size.width * scale, size.height * scale);
                }
                let image = doc.create_element("image");
                doc.set_attr(image, "href", href);
                doc.set_attr(image, "width", format!("{:.1}", size.width));
                doc.set_attr(image, "height", format!("{:.1}", size.height));
                doc.set_attr(image, "x", "0");
                doc.set_attr(image, "y", "0");
                doc.set_attr(image, "class", IMAGE_CLASS);
                doc.set_attr(image, "transform", format!("translate({:.1} {:.1})", at.x, at.y));
                let root = doc.root();
                doc.append_child(root, image);
                self.mark_edits(true, &mut actions);
            }
            PendingLoad::Glyph(glyph) => {
                glyph.insert(doc, natural);
            }
            PendingLoad::Gallery { .. } | PendingLoad::Legacy { .. } => {
                warn!(ticket, "ticket was not an image load");
                return actions;
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// An image requested with [`Action::LoadImage`] could not be decoded.
    pub fn image_failed(&mut self, ticket: Ticket) {
        if self.pending.remove(&ticket).is_some() {
            warn!(ticket, "image failed to load");
        }
    }

    /// Text requested with [`Action::FetchText`] arrived, or failed with a reason.
    pub fn glyph_fetched(&mut self, ticket: Ticket, result: Result<String, String>, prompter: &mut dyn Prompter) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(load) = self.pending.remove(&ticket) else {
            debug!(ticket, "fetch for unknown ticket");
            return actions;
        };

        match load {
            PendingLoad::Gallery { at } => match result {
                Ok(svg) => {
                    let url = glyphs::svg_to_data_url(&svg);
                    let ticket = self.enqueue(PendingLoad::Image { href: url.clone(), at });
                    actions.push(Action::LoadImage { ticket, url });
                }
                Err(reason) => warn!(%reason, "gallery image fetch failed"),
            },
            PendingLoad::Legacy { image, attr } => {
                match result {
                    Ok(svg) => {
                        if let Some(doc) = self.doc.as_mut() {
                            doc.set_attr(image, attr, glyphs::svg_to_data_url(&svg));
                        }
                        self.migration.migrated += 1;
                    }
                    Err(reason) => {
                        warn!(%reason, "legacy glyph fetch failed");
                        self.migration.failed += 1;
                    }
                }
                self.migration.outstanding = self.migration.outstanding.saturating_sub(1);
                if self.migration.outstanding == 0 {
                    self.finish_migration(prompter, &mut actions);
                }
            }
            PendingLoad::Image { .. } | PendingLoad::Glyph(_) => warn!(ticket, "ticket was not a fetch"),
        }
        actions
    }

    fn finish_migration(&mut self, prompter: &mut dyn Prompter, actions: &mut Vec<Action>) {
        let Migration { migrated, failed, .. } = self.migration;
        info!(migrated, failed, "legacy glyph migration finished");
        if migrated > 0 {
            self.mark_edits(true, actions);
            actions.push(Action::RenderNeeded);
        }
        if failed > 0 {
            self.ask(prompter, &Prompt::message(LEGACY_WARNING));
        }
    }

    /// The user picked a local file after [`Action::RequestUpload`]; `url` is its data URL.
    pub fn upload_selected(&mut self, url: &str) -> Vec<Action> {
        match self.upload_at.take() {
            Some(at) => {
                let ticket = self.enqueue(PendingLoad::Image { href: url.to_owned(), at });
                vec![Action::LoadImage { ticket, url: url.to_owned() }]
            }
            None => Vec::new(),
        }
    }

    // --- Viewport and zoom ---

    pub fn set_viewport(&mut self, size: Size) -> Vec<Action> {
        self.camera.viewport = size;
        self.fit()
    }

    /// Size the diagram per the zoom setting and centre it.
    pub fn fit(&mut self) -> Vec<Action> {
        let Some(doc) = self.doc.as_mut() else {
            return Vec::new();
        };
        self.camera.fit(self.fit_mode);
        render::set_display_size(doc, self.camera.size);
        vec![Action::RenderNeeded]
    }

    /// Apply any pending zoom step. The host calls this every [`crate::consts::ZOOM_TICK_MS`].
    pub fn tick(&mut self) -> Vec<Action> {
        let Some(doc) = self.doc.as_mut() else {
            return Vec::new();
        };
        if !self.camera.apply_pending_zoom(self.session.pointer) {
            return Vec::new();
        }
        render::set_display_size(doc, self.camera.size);
        vec![Action::RenderNeeded]
    }

    fn zoom_about_centre(&mut self, step: f64) {
        self.session.pointer = self.camera.viewport_center();
        self.camera.step_zoom(step);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_about_centre(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_about_centre(-ZOOM_STEP);
    }

    // --- Input ---

    /// Process one raw input event.
    pub fn handle_input(&mut self, event: &InputEvent, prompter: &mut dyn Prompter) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.doc.is_none() {
            return actions;
        }
        match event {
            InputEvent::MouseDown { .. } => self.session.ignore_click = false,
            InputEvent::Wheel { .. } | InputEvent::TouchMove { .. } => actions.push(Action::PreventDefault),
            _ => {}
        }
        for gesture in self.normalizer.handle(event) {
            self.dispatch(gesture, prompter, &mut actions);
        }
        actions
    }

    fn dispatch(&mut self, gesture: Gesture, prompter: &mut dyn Prompter, actions: &mut Vec<Action>) {
        match gesture {
            Gesture::PointerDown { target, point, modifiers } => self.pointer_down(target, point, modifiers),
            Gesture::PointerMove { point, modifiers } => self.pointer_move(point, modifiers, actions),
            Gesture::PointerUp => self.pointer_up(actions),
            Gesture::Click { modifiers, .. } => self.click(modifiers, prompter, actions),
            Gesture::SecondaryClick { target } => self.secondary_click(target, actions),
            Gesture::EraseMove { target } => self.erase_move(target, actions),
            Gesture::PinchUpdate { a, b, delta } => {
                self.session.ignore_click = true;
                self.session.pointer = Point::new(a.x + (b.x - a.x) / 2.0, a.y + (b.y - a.y) / 2.0);
                self.camera.step_zoom(delta);
            }
            Gesture::WheelZoom { direction, point } => {
                if !self.session.active {
                    self.session.pointer = point;
                    self.camera.step_zoom(direction * ZOOM_STEP);
                }
            }
        }
    }

    fn pointer_down(&mut self, target: Option<NodeId>, point: Point, modifiers: Modifiers) {
        let Some(doc) = self.doc.as_mut() else {
            return;
        };
        if target.is_some_and(|t| !doc.is_attached(t)) {
            self.session.tracking = false;
            self.session.ignore_click = true;
            self.session.target = None;
            self.session.action = None;
            return;
        }

        let session = &mut self.session;
        session.tracking = true;
        session.ignore_click = false;
        session.pointer = point;
        session.scroll_start = Point::new(self.camera.left, self.camera.top);
        session.target = None;
        session.action = None;

        let kind = match session.mode {
            EditMode::Off => return,
            EditMode::Highlight => {
                session.target = target.and_then(|t| hit::highlight_target(doc, t));
                if let Some(node) = session.target {
                    doc.add_class(node, SELECT_CLASS);
                }
                return;
            }
            EditMode::Link | EditMode::Notes => {
                session.target = target;
                if let Some(node) = target.filter(|t| hit::annotation_kind(doc, *t).is_some()) {
                    doc.add_class(node, SELECT_CLASS);
                }
                return;
            }
            EditMode::Draw => AnnotationKind::Draw,
            EditMode::Text => AnnotationKind::Text,
            EditMode::Image => AnnotationKind::Image,
        };

        let Some(node) = target.filter(|t| hit::annotation_kind(doc, *t) == Some(kind)) else {
            if kind == AnnotationKind::Draw {
                session.ignore_click = true;
                session.action = Some(DragAction::Paint);
            }
            return;
        };

        session.transform = match Transform::parse(doc.attr(node, "transform").unwrap_or_default()) {
            Ok(transform) => transform,
            Err(e) => {
                error!(error = %e, "annotation has an unsupported transform");
                session.reset_gesture();
                return;
            }
        };
        session.target = Some(node);
        doc.add_class(node, SELECT_CLASS);

        let action = match kind {
            AnnotationKind::Draw => DragAction::Move,
            _ if modifiers.ctrl => DragAction::Resize,
            _ if modifiers.shift => DragAction::Rotate,
            _ => DragAction::Move,
        };
        if action == DragAction::Move {
            session.pointer.x -= session.transform.translate.x * self.camera.ratio_x;
            session.pointer.y -= session.transform.translate.y * self.camera.ratio_y;
        }
        session.action = Some(action);
    }

    fn pointer_move(&mut self, point: Point, modifiers: Modifiers, actions: &mut Vec<Action>) {
        if !self.session.tracking {
            return;
        }
        match (self.session.mode, self.session.action) {
            (EditMode::Draw, Some(DragAction::Paint)) => self.paint(point, modifiers, actions),
            (EditMode::Draw | EditMode::Text | EditMode::Image, Some(DragAction::Move)) => self.move_node(point, actions),
            (EditMode::Text | EditMode::Image, Some(DragAction::Rotate)) => self.rotate_node(point, actions),
            (EditMode::Text | EditMode::Image, Some(DragAction::Resize)) => self.resize_node(point.y, actions),
            _ => self.scroll_move(point, actions),
        }
    }

    /// Start `action` if nothing is active yet. Returns `true` when it started.
    fn begin(&mut self, action: DragAction, actions: &mut Vec<Action>) -> bool {
        if self.session.active {
            return false;
        }
        self.session.active = true;
        self.session.action = Some(action);
        self.session.ignore_click = true;
        actions.push(Action::SetBodyMarker(action.body_marker()));
        true
    }

    fn scroll_move(&mut self, point: Point, actions: &mut Vec<Action>) {
        self.begin(DragAction::Scroll, actions);
        let start = self.session.scroll_start;
        let left = (start.x - self.session.pointer.x + point.x).round();
        let top = (start.y - self.session.pointer.y + point.y).round();
        self.camera.pan_to(left, top);
        self.deselect();
        actions.push(Action::RenderNeeded);
    }

    fn paint(&mut self, point: Point, modifiers: Modifiers, actions: &mut Vec<Action>) {
        if manhattan(point, self.session.pointer) < PAINT_THRESHOLD_PX {
            return;
        }
        let started = self.begin(DragAction::Paint, actions);
        let from = self.camera.screen_to_native(self.session.pointer);
        let to = self.camera.screen_to_native(point);
        let Some(doc) = self.doc.as_mut() else {
            return;
        };

        let path = match self.session.target {
            Some(path) => path,
            None => {
                let path = doc.create_element("path");
                doc.set_attr(path, "class", DRAW_CLASS);
                doc.set_attr(path, "d", format!("M{:.1} {:.1}", from.x, from.y));
                doc.set_style(path, "stroke", &self.tools.draw);
                let root = doc.root();
                doc.append_child(root, path);
                self.session.target = Some(path);
                path
            }
        };

        let mut data = doc.attr(path, "d").unwrap_or_default().to_owned();
        if modifiers.ctrl {
            if let Some(last) = data.rfind('L') {
                data.truncate(last);
            }
        }
        if data.ends_with('Z') {
            data.pop();
        }
        data.push_str(&format!("L{:.1} {:.1}", to.x, to.y));
        if modifiers.shift {
            data.push('Z');
        }
        doc.set_attr(path, "d", data);

        self.session.pointer = point;
        if started {
            self.mark_edits(true, actions);
        }
        actions.push(Action::RenderNeeded);
    }

    fn move_node(&mut self, point: Point, actions: &mut Vec<Action>) {
        if self.begin(DragAction::Move, actions) {
            self.mark_edits(true, actions);
        }
        self.session.transform.translate = Point::new(
            (point.x - self.session.pointer.x) / self.camera.ratio_x,
            (point.y - self.session.pointer.y) / self.camera.ratio_y,
        );
        self.write_transform();
        actions.push(Action::RenderNeeded);
    }

    fn rotate_node(&mut self, point: Point, actions: &mut Vec<Action>) {
        if self.begin(DragAction::Rotate, actions) {
            self.mark_edits(true, actions);
        }
        let native = self.camera.screen_to_native(point);
        let dx = native.x - self.session.transform.translate.x;
        let dy = native.y - self.session.transform.translate.y;
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let mut degrees = (dy / dx).atan().to_degrees();
        if dx < 0.0 {
            degrees += 180.0;
        }
        self.session.transform.rotate = degrees;
        self.write_transform();
        actions.push(Action::RenderNeeded);
    }

    /// Scale from vertical travel: dragging up to the top of the viewport
    /// reaches [`SCALE_MAX`], down to the bottom reaches [`SCALE_MIN`].
    fn resize_node(&mut self, y: f64, actions: &mut Vec<Action>) {
        if self.begin(DragAction::Resize, actions) {
            self.session.start_scale = self.session.transform.scale;
            self.mark_edits(true, actions);
        }
        let start = self.session.start_scale;
        let up_room = self.session.pointer.y;
        let down_room = self.session.pointer.y - self.camera.viewport.height;
        let delta = (self.session.pointer.y - y).max(down_room).min(up_room);

        let scale = if delta > 0.0 {
            start + delta * (SCALE_MAX - start) / up_room
        } else if delta < 0.0 {
            start + delta * (SCALE_MIN - start) / down_room
        } else {
            start
        };
        self.session.transform.scale = scale.clamp(SCALE_MIN, SCALE_MAX);
        self.write_transform();
        actions.push(Action::RenderNeeded);
    }

    fn pointer_up(&mut self, actions: &mut Vec<Action>) {
        self.session.tracking = false;
        if self.session.active {
            self.session.active = false;
            actions.push(Action::ClearBodyMarkers);
            actions.push(Action::PreventDefault);
        }
        if self.session.ignore_click && self.session.target.is_some() {
            self.deselect();
            actions.push(Action::PreventDefault);
        }
    }

    fn erase_move(&mut self, target: NodeId, actions: &mut Vec<Action>) {
        if self.session.mode == EditMode::Off {
            return;
        }
        self.begin(DragAction::Erase, actions);
        if self.erase(target) {
            self.mark_edits(true, actions);
            actions.push(Action::RenderNeeded);
        }
    }

    /// Remove what a secondary click or erase stroke over `target` removes in
    /// the current mode. Returns `true` when something changed.
    fn erase(&mut self, target: NodeId) -> bool {
        let mode = self.session.mode;
        let Some(doc) = self.doc.as_mut() else {
            return false;
        };
        let kind = match mode {
            EditMode::Highlight => return remove_highlight(doc, target),
            EditMode::Draw => AnnotationKind::Draw,
            EditMode::Text => AnnotationKind::Text,
            EditMode::Image => AnnotationKind::Image,
            EditMode::Off | EditMode::Link | EditMode::Notes => return false,
        };
        if hit::annotation_kind(doc, target) != Some(kind) {
            return false;
        }
        doc.remove(target);
        true
    }

    fn secondary_click(&mut self, target: Option<NodeId>, actions: &mut Vec<Action>) {
        if self.session.ignore_click {
            return;
        }
        self.deselect();
        match self.session.mode {
            EditMode::Off | EditMode::Link | EditMode::Notes => actions.extend(self.fit()),
            EditMode::Highlight | EditMode::Draw | EditMode::Text | EditMode::Image => {
                if target.is_some_and(|t| self.erase(t)) {
                    self.mark_edits(true, actions);
                    actions.push(Action::RenderNeeded);
                }
            }
        }
        actions.push(Action::PreventDefault);
    }

    fn click(&mut self, modifiers: Modifiers, prompter: &mut dyn Prompter, actions: &mut Vec<Action>) {
        if self.session.ignore_click {
            actions.push(Action::PreventDefault);
            return;
        }
        match self.session.mode {
            EditMode::Off => {
                self.deselect();
                return;
            }
            EditMode::Highlight => self.highlight_click(modifiers, actions),
            EditMode::Draw => self.draw_click(modifiers, actions),
            EditMode::Text => match self.session.target {
                Some(_) if modifiers.ctrl || modifiers.shift => self.step_transform(modifiers, actions),
                _ => self.text_label(prompter, actions),
            },
            EditMode::Image => match self.session.target {
                Some(_) if modifiers.ctrl || modifiers.shift => self.step_transform(modifiers, actions),
                _ => {
                    self.deselect();
                    self.image_gallery(prompter, actions);
                }
            },
            EditMode::Link => self.hyperlink(prompter, actions),
            EditMode::Notes => self.notes(prompter, actions),
        }
        actions.push(Action::PreventDefault);
    }

    fn highlight_click(&mut self, modifiers: Modifiers, actions: &mut Vec<Action>) {
        let (Some(doc), Some(node)) = (self.doc.as_mut(), self.session.target) else {
            return;
        };
        if hit::quick_highlight_class(doc, node).is_some() {
            for class in QUICK_HIGHLIGHT_CLASSES {
                doc.remove_class(node, class);
            }
        } else {
            let fill = match modifiers.highlight_slot() {
                0 => self.tools.highlight.as_str(),
                slot => self.settings.quick_highlights()[slot],
            };
            if doc.style(node, "fill").is_some_and(|current| hit::same_colour(&current, fill)) {
                doc.set_style(node, "fill", "");
            } else {
                doc.set_style(node, "fill", fill);
            }
        }
        doc.remove_class(node, SELECT_CLASS);
        self.mark_edits(true, actions);
        actions.push(Action::RenderNeeded);
    }

    fn draw_click(&mut self, modifiers: Modifiers, actions: &mut Vec<Action>) {
        let (Some(doc), Some(node)) = (self.doc.as_mut(), self.session.target) else {
            return;
        };
        let stroke = if modifiers.ctrl {
            self.tools.draw.clone()
        } else {
            next_palette_colour(doc.style(node, "stroke").as_deref().unwrap_or_default()).to_owned()
        };
        doc.set_style(node, "stroke", &stroke);
        doc.remove_class(node, SELECT_CLASS);
        self.mark_edits(true, actions);
        actions.push(Action::RenderNeeded);
    }

    /// Ctrl resets the scale, Shift steps the rotation.
    fn step_transform(&mut self, modifiers: Modifiers, actions: &mut Vec<Action>) {
        if modifiers.ctrl {
            self.session.transform.reset_scale();
        } else {
            self.session.transform.step_rotation(ROTATE_STEP_DEG);
        }
        self.write_transform();
        self.deselect();
        self.mark_edits(true, actions);
        actions.push(Action::RenderNeeded);
    }

    fn text_label(&mut self, prompter: &mut dyn Prompter, actions: &mut Vec<Action>) {
        let Some(doc) = self.doc.as_ref() else {
            return;
        };
        let existing = self.session.target;
        let prompt = match existing {
            Some(node) => {
                let fill = doc.style(node, "fill").map(|f| hit::normalize_colour(&f)).unwrap_or_default();
                Prompt::text("Update or delete text label", doc.text_content(node))
                    .with_alternate("Delete")
                    .with_colour("Select a label colour:", fill)
            }
            None => Prompt::text("Add a text label", "").with_colour("Select a label colour:", self.tools.text.as_str()),
        };
        let at = self.camera.screen_to_native(self.session.pointer);
        let choice = self.ask(prompter, &prompt);

        let Some(doc) = self.doc.as_mut() else {
            return;
        };
        let changed = match &choice {
            UserChoice::Confirm { .. } => match (choice.confirmed_text(), existing) {
                (Some(text), Some(node)) => {
                    doc.set_text_content(node, text);
                    if let Some(colour) = choice.confirmed_colour() {
                        doc.set_style(node, "fill", colour);
                    }
                    doc.remove_class(node, SELECT_CLASS);
                    true
                }
                (Some(text), None) => {
                    let label = doc.create_element("text");
                    doc.set_attr(label, "class", TEXT_CLASS);
                    doc.set_attr(label, "transform", format!("translate({:.1} {:.1})", at.x, at.y));
                    doc.set_text_content(label, text);
                    doc.set_style(label, "fill", choice.confirmed_colour().unwrap_or(DRAW_PALETTE[0]));
                    let root = doc.root();
                    doc.append_child(root, label);
                    true
                }
                (None, _) => false,
            },
            UserChoice::Alternate => existing.is_some_and(|node| {
                doc.remove(node);
                true
            }),
            UserChoice::Cancel | UserChoice::ListItem(_) => false,
        };
        self.finish_dialog(changed, actions);
    }

    fn image_gallery(&mut self, prompter: &mut dyn Prompter, actions: &mut Vec<Action>) {
        let at = self.camera.screen_to_native(self.session.pointer);
        let prompt = Prompt::message("Select or upload an image")
            .with_primary("Upload")
            .with_cancel("Cancel")
            .with_items(glyphs::gallery_items());

        match self.ask(prompter, &prompt) {
            UserChoice::Confirm { .. } => {
                self.upload_at = Some(at);
                actions.push(Action::RequestUpload);
            }
            UserChoice::ListItem(index) => match GLYPH_GALLERY.get(index) {
                Some(glyph) => {
                    debug!(label = glyph.label, "gallery glyph chosen");
                    let ticket = self.enqueue(PendingLoad::Gallery { at });
                    actions.push(Action::FetchText { ticket, url: glyph.image.to_owned() });
                }
                None => warn!(index, "gallery selection out of range"),
            },
            UserChoice::Alternate | UserChoice::Cancel => {}
        }
    }

    fn hyperlink(&mut self, prompter: &mut dyn Prompter, actions: &mut Vec<Action>) {
        let Some(node) = self.session.target else {
            return;
        };
        let eligible = self.doc.as_ref().filter(|doc| hit::is_link_eligible(doc, node));
        let Some(doc) = eligible else {
            self.deselect();
            return;
        };
        let anchor = hit::link_ancestor(doc, node);
        let existing = anchor.and_then(|a| doc.attr(a, "href")).filter(|h| !h.is_empty()).map(str::to_owned);
        let prompt = match existing {
            Some(url) => Prompt::text("Update or delete item hyperlink", url).with_alternate("Delete"),
            None => Prompt::text("Set item hyperlink", "https://"),
        };
        let choice = self.ask(prompter, &prompt);

        let Some(doc) = self.doc.as_mut() else {
            return;
        };
        let changed = match &choice {
            UserChoice::Confirm { .. } => match (choice.confirmed_text(), anchor) {
                (Some(url), Some(anchor)) => {
                    doc.set_attr(anchor, "href", url);
                    true
                }
                (Some(url), None) => {
                    let anchor = doc.create_element("a");
                    doc.set_attr(anchor, "target", "_blank");
                    doc.set_attr(anchor, "href", url);
                    doc.wrap(node, anchor);
                    true
                }
                (None, _) => false,
            },
            UserChoice::Alternate => anchor.and_then(|a| doc.remove_attr(a, "href")).is_some(),
            UserChoice::Cancel | UserChoice::ListItem(_) => false,
        };
        self.finish_dialog(changed, actions);
    }

    fn notes(&mut self, prompter: &mut dyn Prompter, actions: &mut Vec<Action>) {
        let Some(node) = self.session.target else {
            return;
        };
        let owner = self
            .doc
            .as_ref()
            .filter(|doc| hit::is_notes_eligible(doc, node))
            .and_then(|doc| Some((doc, hit::top_level_ancestor(doc, node)?)));
        let Some((doc, owner)) = owner else {
            self.deselect();
            return;
        };
        let title = doc.find_descendant(owner, "title");
        let prompt = match title {
            Some(title) => Prompt::text("Update or delete item notes", doc.text_content(title)).with_alternate("Delete"),
            None => Prompt::text("Set item notes", ""),
        };
        let choice = self.ask(prompter, &prompt);

        let Some(doc) = self.doc.as_mut() else {
            return;
        };
        let changed = match &choice {
            UserChoice::Confirm { .. } => match choice.confirmed_text() {
                Some(text) => {
                    let title = title.unwrap_or_else(|| {
                        let title = doc.create_element("title");
                        doc.append_child(owner, title);
                        title
                    });
                    doc.set_text_content(title, text);
                    true
                }
                None => false,
            },
            UserChoice::Alternate => title.is_some_and(|title| {
                doc.remove(title);
                true
            }),
            UserChoice::Cancel | UserChoice::ListItem(_) => false,
        };
        self.finish_dialog(changed, actions);
    }

    fn finish_dialog(&mut self, changed: bool, actions: &mut Vec<Action>) {
        self.deselect();
        if changed {
            self.mark_edits(true, actions);
            actions.push(Action::RenderNeeded);
        }
    }

    fn ask(&mut self, prompter: &mut dyn Prompter, prompt: &Prompt) -> UserChoice {
        self.normalizer.set_dialog_open(true);
        let choice = prompter.prompt(prompt);
        self.normalizer.set_dialog_open(false);
        choice
    }

    fn deselect(&mut self) {
        if let (Some(doc), Some(node)) = (self.doc.as_mut(), self.session.target.take()) {
            doc.remove_class(node, SELECT_CLASS);
        }
    }

    fn write_transform(&mut self) {
        let (Some(doc), Some(node)) = (self.doc.as_mut(), self.session.target) else {
            return;
        };
        let value = self.session.transform.build();
        if value.is_empty() {
            doc.remove_attr(node, "transform");
        } else {
            doc.set_attr(node, "transform", value);
        }
    }

    fn mark_edits(&mut self, state: bool, actions: &mut Vec<Action>) {
        if self.session.edits.set(state, &mut self.title) {
            actions.push(Action::EditsChanged { has_edits: state, title: self.title.clone() });
        }
    }

    // --- Keyboard ---

    /// Keyboard shortcuts, handled on key release.
    pub fn key_up(&mut self, key: &Key) -> Vec<Action> {
        if self.doc.is_none() || self.session.active || self.normalizer.dialog_open() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        match key.0.as_str() {
            "+" => {
                self.zoom_in();
                actions.push(Action::PreventDefault);
            }
            "-" => {
                self.zoom_out();
                actions.push(Action::PreventDefault);
            }
            "=" => {
                actions.extend(self.fit());
                actions.push(Action::PreventDefault);
            }
            "ArrowUp" => self.arrow(0.0, -1.0, &mut actions),
            "ArrowDown" => self.arrow(0.0, 1.0, &mut actions),
            "ArrowLeft" => self.arrow(-1.0, 0.0, &mut actions),
            "ArrowRight" => self.arrow(1.0, 0.0, &mut actions),
            "Enter" => {
                self.camera.recenter();
                actions.push(Action::RenderNeeded);
                actions.push(Action::PreventDefault);
            }
            other => {
                let mut chars = other.chars();
                if let (Some(digit), None) = (chars.next(), chars.next()) {
                    self.digit_colour(digit);
                }
            }
        }
        actions
    }

    fn arrow(&mut self, dx: f64, dy: f64, actions: &mut Vec<Action>) {
        self.camera.arrow_step(dx, dy);
        actions.push(Action::RenderNeeded);
        actions.push(Action::PreventDefault);
    }

    fn digit_colour(&mut self, digit: char) {
        let Some(colour) = self.settings.palette_for_digit(digit) else {
            return;
        };
        let mode = self.session.mode;
        if let Some(tool) = self.tools.for_mode(mode) {
            debug!(%mode, colour, "tool colour set");
            colour.clone_into(tool);
        }
    }

    // --- Menu ---

    pub fn toggle_menu(&mut self) -> Vec<Action> {
        self.deselect();
        self.menu.toggle_menu(&mut self.session);
        self.sync_mode()
    }

    pub fn toggle_edit(&mut self) -> Vec<Action> {
        self.deselect();
        self.menu.toggle_edit(&mut self.session);
        self.sync_mode()
    }

    pub fn toggle_controls(&mut self) -> Vec<Action> {
        self.deselect();
        self.menu.toggle_controls(&mut self.session);
        self.sync_mode()
    }

    pub fn select_mode(&mut self, mode: EditMode) -> Vec<Action> {
        self.deselect();
        self.menu.select_mode(&mut self.session, mode);
        self.sync_mode()
    }

    /// A tool's colour picker changed: the colour is kept and the tool selected.
    pub fn set_tool_colour(&mut self, mode: EditMode, colour: &str) -> Vec<Action> {
        match self.tools.for_mode(mode) {
            Some(tool) => colour.clone_into(tool),
            None => return Vec::new(),
        }
        self.select_mode(mode)
    }

    fn sync_mode(&mut self) -> Vec<Action> {
        if let Some(doc) = self.doc.as_mut() {
            render::set_mode_classes(doc, self.session.mode);
        }
        debug!(mode = %self.session.mode, "edit mode");
        vec![Action::RenderNeeded]
    }

    /// Whether the export menu items are offered.
    #[must_use]
    pub fn exports_visible(&self) -> bool {
        Menu::exports_visible(&self.session, self.route.saved)
    }

    /// Offer the stored feature maps; choosing one navigates to the current
    /// diagram at `path` with the map applied.
    pub fn choose_feature_map(&mut self, host: &mut Host<'_>, path: &str) -> Vec<Action> {
        let maps = store::list_feature_maps(&*host.store);
        if maps.is_empty() {
            self.ask(host.prompter, &Prompt::message("No feature maps found"));
            return Vec::new();
        }
        let items = maps.iter().map(|m| PromptItem { label: m.title.clone(), image: None, id: Some(m.key.clone()) }).collect();
        let prompt = Prompt::message("Load feature map").with_primary("").with_cancel("Cancel").with_items(items);
        match self.ask(host.prompter, &prompt) {
            UserChoice::ListItem(index) => match maps.get(index) {
                Some(map) => vec![Action::Navigate(self.route.with_feature_map(path, &map.key))],
                None => Vec::new(),
            },
            UserChoice::Confirm { .. } | UserChoice::Alternate | UserChoice::Cancel => Vec::new(),
        }
    }

    // --- Flags and filters ---

    /// Flip the flag on the current built-in diagram. Returns the new state,
    /// or `None` for saved diagrams, which cannot be flagged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if the flag list cannot be written.
    pub fn toggle_flag(&self, store: &mut dyn KeyValueStore) -> Result<Option<bool>, StoreError> {
        match self.route.filename.as_deref().filter(|_| !self.route.saved) {
            Some(name) => store::toggle_flag(store, name).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_filters(&mut self, filters: Filters) -> Vec<Action> {
        self.filters = filters;
        let Some(doc) = self.doc.as_mut() else {
            return Vec::new();
        };
        render::apply_filters(doc, &filters);
        vec![Action::RenderNeeded]
    }

    pub fn reset_filters(&mut self) -> Vec<Action> {
        self.set_filters(Filters::default())
    }

    /// Keep the current filters as the default for every diagram.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if the settings cannot be written.
    pub fn save_filters(&mut self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        self.settings.filters = self.filters;
        store::save_settings(store, &self.settings)?;
        self.menu.close_controls();
        Ok(())
    }

    // --- Save and navigation ---

    /// Save the diagram, asking where. A new copy navigates to its own page.
    pub fn request_save(&mut self, host: &mut Host<'_>, now_ms: u128) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(SaveOutcome::SavedAs(key)) = self.save_flow(host, now_ms, &mut actions) {
            actions.push(Action::Navigate(route::saved_url(&key)));
        }
        actions
    }

    /// Leave the page, offering to save unsaved edits first.
    pub fn back(&mut self, host: &mut Host<'_>, now_ms: u128) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.session.edits.has_edits() {
            actions.push(Action::NavigateBack);
            return actions;
        }
        let prompt = Prompt::yes_no_cancel("Would you like to save your changes before leaving the page?");
        match self.ask(host.prompter, &prompt) {
            UserChoice::Confirm { .. } => {
                if self.save_flow(host, now_ms, &mut actions).is_some() {
                    actions.push(Action::NavigateBack);
                }
            }
            UserChoice::Alternate => actions.push(Action::NavigateBack),
            UserChoice::Cancel | UserChoice::ListItem(_) => {}
        }
        actions
    }

    fn save_flow(&mut self, host: &mut Host<'_>, now_ms: u128, actions: &mut Vec<Action>) -> Option<SaveOutcome> {
        if self.doc.is_none() || self.route.comparing {
            return None;
        }

        let initial = match (self.route.saved_key(), self.saved_title.clone()) {
            (Some(key), Some(title)) => {
                let key = key.to_owned();
                let prompt = Prompt::yes_no_cancel(format!("Overwrite existing diagram \"{title}\"?"));
                match self.ask(host.prompter, &prompt) {
                    UserChoice::Confirm { .. } => {
                        return self.write(host.store, &key, &title, actions).then_some(SaveOutcome::Overwritten);
                    }
                    UserChoice::Alternate => title,
                    UserChoice::Cancel | UserChoice::ListItem(_) => return None,
                }
            }
            _ => render::decode_component(self.route.filename.as_deref().unwrap_or_default()),
        };

        let choice = self.ask(host.prompter, &Prompt::text("Save diagram as", initial));
        let title = choice.confirmed_text()?.to_owned();
        let key = store::new_key(now_ms);
        self.write(host.store, &key, &title, actions).then_some(SaveOutcome::SavedAs(key))
    }

    fn write(&mut self, store: &mut dyn KeyValueStore, key: &str, title: &str, actions: &mut Vec<Action>) -> bool {
        let Some(markup) = self.serialize() else {
            return false;
        };
        let diagram = SavedDiagram { title: title.to_owned(), svg_xml: markup };
        match store::save_diagram(store, key, &diagram) {
            Ok(()) => {
                self.mark_edits(false, actions);
                true
            }
            Err(e) => {
                error!(code = e.error_code(), error = %e, %key, "save failed");
                false
            }
        }
    }

    // --- Output ---

    /// The diagram as it is saved.
    #[must_use]
    pub fn serialize(&self) -> Option<String> {
        self.doc.as_ref().map(|doc| render::serialize(doc, self.camera.native))
    }

    fn export_name(&self, extension: &str) -> String {
        let saved_title = self.saved_title.as_deref().filter(|_| self.route.saved);
        render::export_filename(saved_title, self.route.filename.as_deref().unwrap_or_default(), extension)
    }

    #[must_use]
    pub fn export_svg(&self) -> Option<Export> {
        Some(Export { filename: self.export_name("svg"), markup: self.serialize()? })
    }

    /// Plan a PNG export. `bbox` is the rendered bounding box of the live diagram.
    #[must_use]
    pub fn export_png(&self, bbox: Bounds) -> Option<RasterExport> {
        let doc = self.doc.as_ref()?;
        let (markup, view) = render::raster_markup(doc, self.camera.native, bbox);
        let (width, height) = render::raster_size(view.width, view.height);
        Some(RasterExport { filename: self.export_name("png"), markup, view, width, height })
    }
}

/// Strip a quick-highlight class, else an inline fill, from the highlight
/// target of `start`.
fn remove_highlight(doc: &mut DocStore, start: NodeId) -> bool {
    let Some(node) = hit::highlight_target(doc, start) else {
        return false;
    };
    if let Some(class) = hit::quick_highlight_class(doc, node) {
        return doc.remove_class(node, class);
    }
    if doc.style(node, "fill").is_some() {
        doc.set_style(node, "fill", "");
        return true;
    }
    false
}

/// The palette colour after `current`, wrapping. Unknown colours restart the cycle.
fn next_palette_colour(current: &str) -> &'static str {
    let index = DRAW_PALETTE.iter().position(|c| c.eq_ignore_ascii_case(current)).unwrap_or(0);
    DRAW_PALETTE[(index + 1) % DRAW_PALETTE.len()]
}
