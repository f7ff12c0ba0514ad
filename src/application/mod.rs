//! 应用层：后台任务编排

pub mod sweeper;

pub use sweeper::spawn_expiry_sweeper;
