pub mod artifact;
pub mod cli;
pub mod error;
pub mod geometry;
pub mod labeler;
pub mod output;
pub mod partition;
pub mod prepare;
pub mod preprocess;
pub mod progress;
pub mod resolver;
pub mod store;
pub mod tile;
pub mod tile_cache;
