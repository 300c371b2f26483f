// Library exports for coldash

pub mod chart;
pub mod derive;
pub mod error;
pub mod page;
pub mod render;
pub mod selection;
pub mod server;
pub mod table;

pub use chart::{ChartSpec, Derived};
pub use derive::derive_chart;
pub use error::{DeriveError, LoadError};
pub use selection::{ChartKind, Selection};
pub use table::Table;
