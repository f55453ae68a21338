pub mod buffer;
pub mod point;
pub mod scan;
