use directories::ProjectDirs;
use lazy_static::lazy_static;

pub mod commands;
pub mod config;
pub mod delegate;
pub mod error;
pub mod event;
pub mod filesystem;
pub mod logging;
pub mod mount_point;
pub mod mount_watch;
pub mod operating_system;
pub mod output;
pub mod params;
pub mod process;
pub mod shell;
pub mod store;
pub mod supervisor;
mod utils;
pub mod validate;
pub mod watchdog;

pub use error::{Error, FailureReason, Result};
pub use filesystem::{Filesystem, Services, Snapshot, Status};

lazy_static! {
    pub static ref PROJECT_DIRS: ProjectDirs =
        ProjectDirs::from("com", "shelbyd", "mountkeeper").expect("home directory is known");
}
