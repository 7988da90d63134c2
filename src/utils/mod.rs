pub mod hash;
pub mod id_generator;
pub mod time;
