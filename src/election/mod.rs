// Election module - data model and lifecycle
// Election rows, proposals, the pure transition guards, and the
// periodic lifecycle monitor.

mod admin;
mod model;
mod monitor;

pub use admin::*;
pub use model::*;
pub use monitor::*;
