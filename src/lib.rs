//! Headless editor core for annotating SVG diagrams.
//!
//! The crate owns everything a diagram page does between receiving raw input
//! and writing to storage: parsing the diagram into an editable tree, fitting
//! and zooming it in the viewport, turning pointer, touch and keyboard input
//! into highlight, draw, text, image, link and notes edits, applying feature
//! maps, and saving annotated copies to a key-value store. The host (a browser
//! shim, or the `svgnote` CLI) feeds it events and carries out the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Edit mode state machine and [`engine::EngineCore`] |
//! | [`doc`] | Arena SVG tree, parser and serializer |
//! | [`camera`] | Fit modes, zoom and screen/native coordinates |
//! | [`input`] | Edit modes, raw input events and the gesture normalizer |
//! | [`hit`] | Target resolution and annotation classification |
//! | [`transform`] | `translate`/`rotate`/`scale` transform strings |
//! | [`session`] | Per-diagram gesture state and the unsaved-changes flag |
//! | [`menu`] | Menu and panel state |
//! | [`dialog`] | Prompt model and the [`dialog::Prompter`] seam |
//! | [`render`] | Display sizing, styles, filters and export plans |
//! | [`store`] | Key-value storage: saved diagrams, feature maps, flags, settings |
//! | [`overlay`] | Feature map application |
//! | [`glyphs`] | Glyph gallery and legacy sprite-sheet migration |
//! | [`settings`] | User settings and image filters |
//! | [`route`] | Page path and hash addressing |
//! | [`consts`] | Shared class names, zoom limits and thresholds |

pub mod camera;
pub mod consts;
pub mod dialog;
pub mod doc;
pub mod engine;
pub mod glyphs;
pub mod hit;
pub mod input;
pub mod menu;
pub mod overlay;
pub mod render;
pub mod route;
pub mod session;
pub mod settings;
pub mod store;
pub mod transform;
