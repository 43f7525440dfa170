pub mod id;
pub mod timer_queue;
