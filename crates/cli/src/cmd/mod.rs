mod build;
mod info;
mod run;

pub use build::cmd_build;
pub use info::cmd_info;
pub use run::{RunOptions, cmd_run};
