pub mod aggregator;
pub mod aligner;
pub mod classifier;
pub mod codec;
pub mod colormap;
pub mod deviation;
pub mod differencer;
pub mod glyphs;
pub mod morphology;
pub mod pixel;
pub mod recommendations;
pub mod region;
pub mod region_extractor;
pub mod visualizer;
