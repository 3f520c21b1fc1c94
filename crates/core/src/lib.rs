pub mod analysis;
pub mod annotation;
pub mod capture;
pub mod display;
pub mod pipeline;
pub mod shared;
