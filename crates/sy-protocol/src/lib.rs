pub mod relay;
pub mod report;
pub mod topics;

pub use relay::*;
pub use report::*;
