pub mod architecture;
pub mod config;
pub mod errors;
pub mod feed_forward;
pub mod graph;
pub mod layers;
pub mod rectifier;
pub mod tensor;
pub mod trainer;
