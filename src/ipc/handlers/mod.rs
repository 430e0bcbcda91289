pub mod backup;
pub mod classes;
pub mod content;
pub mod core;
pub mod plan;
