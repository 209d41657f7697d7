//! Controllers: the request/response face of the gallery and admin screens.
//!
//! Each controller owns its own `CatalogIndex`. Gallery sessions read a
//! snapshot and only change on refresh; the admin controller keeps its index
//! in step with the writes it performs.

pub mod admin;
pub mod gallery;
pub mod registry;

pub use admin::{AdminController, DeleteOutcome, UploadOutcome};
pub use gallery::{GallerySession, GalleryView};
pub use registry::{SessionLimits, SessionRegistry};
