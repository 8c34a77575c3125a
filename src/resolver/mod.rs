pub mod algo;
pub mod stats;
pub mod types;
pub mod warm;

pub use self::algo::*;
pub use self::stats::*;
pub use self::types::*;
pub use self::warm::*;
