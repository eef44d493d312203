//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "CTRL_SW_ROOT";

/// Get the software root directory from the `CTRL_SW_ROOT` environment
/// variable.
///
/// Parameter files live in `{root}/params` and sessions in `{root}/sessions`.
pub fn get_ctrl_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
