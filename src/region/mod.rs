pub(crate) mod area;
pub(crate) mod tracker;
