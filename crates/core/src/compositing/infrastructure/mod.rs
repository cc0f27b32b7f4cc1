pub mod blend;
pub mod face_swapper;
pub mod histogram;
pub mod morphology;
pub mod raster;
