pub mod assessment;
pub mod market;
pub mod transcript;
