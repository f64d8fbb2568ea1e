//! Stage-gated resource extraction and render surface control.
//!
//! A rewritten document goes onto a [`RenderSurface`] with every archive
//! resource still a placeholder. The [`Scheduler`] then fills the
//! placeholders in, in a fixed order:
//!
//! 1. images, eagerly and alongside everything else,
//! 2. stylesheets, cache first,
//! 3. external scripts, once every stylesheet has settled,
//! 4. the lifted inline scripts and event sheet, once every script has settled,
//! 5. event bindings.
//!
//! Each resource class counts against a [`Gate`](zimview_asyncutils::Gate).
//! A resource that cannot be resolved is logged and taken out of its gate's
//! expected count, so a broken page still renders. The surface is revealed
//! when the stylesheet gate opens.

mod controller;
pub mod error;
mod mime;
mod page;
mod reader;
mod scheduler;
mod surface;

pub use crate::controller::{Controller, RenderHandle};
pub use crate::mime::{data_uri, image_mime};
pub use crate::page::{PageState, Phase, Stage};
pub use crate::reader::Reader;
pub use crate::scheduler::Scheduler;
pub use crate::surface::{EventBinding, HeadlessSurface, LinkBinding, RenderSurface, Snapshot, SurfaceHandle};
