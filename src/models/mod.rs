pub mod entry;
pub mod classification;
pub mod outcome;

pub use entry::*;
pub use classification::*;
pub use outcome::*;
