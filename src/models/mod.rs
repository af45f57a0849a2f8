pub mod enums;
pub mod memo;
pub mod profile;

pub use enums::*;
pub use memo::*;
pub use profile::*;
