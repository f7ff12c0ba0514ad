//! 基础设施层：外部系统交互
//!
//! 提供持久化存储、HTTP 接口和日志

pub mod logger;
pub mod store;
pub mod web;
