pub(crate) mod arena;
#[allow(clippy::module_inception)]
pub(crate) mod command;
pub(crate) mod history;
pub(crate) mod macro_command;
