pub mod catalogue;
pub mod generate;
pub mod validate;
