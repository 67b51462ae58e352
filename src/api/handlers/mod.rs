pub mod predict;
pub mod system;
pub mod user;

pub use predict::*;
pub use system::*;
pub use user::*;
