pub mod constants;
pub mod frame;
pub mod model_cache;
pub mod region;
