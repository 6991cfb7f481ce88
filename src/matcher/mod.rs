pub mod terms;
pub mod batch;
pub mod resolve;

pub use terms::*;
pub use batch::*;
pub use resolve::*;
