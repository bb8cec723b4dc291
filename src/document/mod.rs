pub(crate) mod content;
pub(crate) mod node;
pub(crate) mod renderer;
