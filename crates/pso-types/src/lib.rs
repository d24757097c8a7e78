pub mod bounds;
pub mod errors;
pub mod report;
pub mod result;

pub use bounds::*;
pub use errors::*;
pub use report::*;
pub use result::*;
