pub mod ai;
pub mod data;
pub mod ensemble;
pub mod medication;
pub mod model;
pub mod pool;
pub mod rules;
