pub(crate) mod affine;
pub(crate) mod params;
pub(crate) mod routine;
