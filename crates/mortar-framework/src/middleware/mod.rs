//! Stock middleware.
//!
//! Each of these is an ordinary handler. [`Application::classic`] installs
//! them in the order `logger`, `recovery`, `static_files`.
//!
//! [`Application::classic`]: crate::Application::classic

mod logger;
mod recovery;
mod static_files;

pub use logger::logger;
pub use recovery::recovery;
pub use static_files::static_files;
