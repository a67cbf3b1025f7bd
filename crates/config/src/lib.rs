//! Configuration schema and discovery for padlink.
//!
//! Config is read from `padlink.{toml,yaml,yml,json}`, project-local first,
//! then `~/.config/padlink/`. A missing file yields defaults. String values
//! may reference environment variables as `${VAR}`.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{clear_config_dir, discover_and_load, load_config, set_config_dir},
    schema::PadlinkConfig,
};
