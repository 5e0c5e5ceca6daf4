//! Interaction core for a visual page builder.
//!
//! Users drag palette templates or already-placed elements onto a canvas; the
//! editor resolves the innermost container under the pointer, inserts or
//! relocates the element in a document tree, and keeps the drop zone registry
//! in step with every structural change. The browser binding in `web` is
//! compiled only with the `web` feature; everything else runs headless and is
//! driven by plain pointer and key events.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`tree`] | Document tree arena, snapshots, load/serialize |
//! | [`drag`] | Drop zone registry and the drag gesture state machine |
//! | [`session`] | Editor session gluing drops, selection, and deletion together |
//! | [`kind`] | Element kinds, default properties, and property panel fields |
//! | [`input`] | Pointer ids, keys, drag sources, and gesture state |
//! | [`geom`] | Points, rectangles, and live bounds sources |
//! | [`config`] | Editor configuration from serde input or the environment |
//! | [`error`] | Shared error taxonomy |
//! | [`replay`] | Headless replay of scripted sessions |
//! | [`consts`] | Shared constants (canvas id, cursors, DOM attribute names) |
//! | `web` | DOM binding (feature `web`) |

pub mod config;
pub mod consts;
pub mod drag;
pub mod error;
pub mod geom;
pub mod input;
pub mod kind;
pub mod replay;
pub mod session;
pub mod tree;
#[cfg(feature = "web")]
pub mod web;
