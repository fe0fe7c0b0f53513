//! 核心模块
//! 校验、命名与数据模型，服务端与客户端共用

pub mod error;
pub mod models;
pub mod naming;
pub mod validation;

// 重导出常用类型
pub use error::RelayError;
