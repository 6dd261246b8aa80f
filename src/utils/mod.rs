pub mod compensation;
pub mod hash;
pub mod mock;
