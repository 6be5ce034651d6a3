pub mod calendar;
pub mod config;
pub mod due;
pub mod error;
pub mod model;
pub mod notify;
pub mod recurrence;
pub mod storage;
pub mod task_api;
