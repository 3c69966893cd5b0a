mod constant;
mod provider;

pub use constant::*;
pub use provider::*;
