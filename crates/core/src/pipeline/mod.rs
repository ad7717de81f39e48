pub mod capture_loop;
pub mod detection_worker;
pub mod error;
pub mod frame_job;
pub mod frame_sequencer;
pub mod infrastructure;
pub mod pipeline_executor;
pub mod pipeline_logger;
pub mod shutdown;
pub mod work_queue;
