pub mod annotation_loop;
pub mod failure_guard;
pub mod pipeline_logger;
pub mod result_cache;
pub mod sampling_scheduler;
