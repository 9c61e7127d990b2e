//! External collaborators handlers may use.
//!
//! - [`database`]: lazily connected persistence with `connected`/`accessed` events
//! - [`template`]: rendering configured from the `template` group

pub mod database;
pub mod template;

pub use database::{Connection, Database, DatabaseError, DatabaseSettings, Driver, Row};
pub use template::{RenderError, Renderer, TemplateSettings, TextRenderer};
