//! CLI command implementations

pub(crate) mod common;
pub(crate) mod project;
pub(crate) mod refresh;
pub(crate) mod store;
pub(crate) mod table;
pub(crate) mod watch;
