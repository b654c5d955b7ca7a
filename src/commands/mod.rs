mod diff;
mod locate;
mod sessions;

pub use diff::{run_diff, DiffArgs};
pub use locate::{run_locate, LocateArgs};
pub use sessions::run_sessions;
