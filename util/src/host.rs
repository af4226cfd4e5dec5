//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Environment variable pointing at the root of the software checkout.
pub const SW_ROOT_VAR: &str = "ROBOT_SW_ROOT";

/// Get the root directory of the software, under which the `params` and
/// `sessions` directories live.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_VAR).map(PathBuf::from)
}
