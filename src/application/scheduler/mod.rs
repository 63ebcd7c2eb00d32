//! Scheduler - periodic synthetic command events

pub mod service;
pub mod timing;

pub use service::{EventSink, Scheduler};
pub use timing::{describe_interval, minute_schedule, next_fire_after};
