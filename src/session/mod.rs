pub(crate) mod driver;
pub(crate) mod extra;
pub(crate) mod jobs;
pub(crate) mod opts;
pub(crate) mod preview;
pub(crate) mod state;
pub(crate) mod stroke_session;
