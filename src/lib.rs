#[macro_use]
extern crate tracing;

pub mod args;
mod error;
mod exporter;
pub mod logging;
pub mod server;

pub use args::Args;
pub use error::AppError;
pub use exporter::Exporter;
pub use logging::init_logging;
