pub mod alarm;
pub mod alert;
pub mod bridge;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod input;
pub mod instruments;
pub mod mode;
pub mod settings;
pub mod surface;
pub mod tick;
pub mod time_provider;
pub mod watch;

pub use error::{WatchError, WatchResult};
pub use watch::{Button, Watch};
