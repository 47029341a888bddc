//! 后台任务模块

pub mod reclaim_worker;

pub use reclaim_worker::ReclaimWorker;
