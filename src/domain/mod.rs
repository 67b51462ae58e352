pub mod activity;
pub mod features;
pub mod records;

pub use activity::*;
pub use features::*;
pub use records::*;
