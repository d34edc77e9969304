// ==========================================
// 散装液体配送排产系统 - 配置层
// ==========================================
// 职责: 业务常量定义、校验与持久化
// 存储: config_kv 表 / JSON 文件
// ==========================================

pub mod config_manager;
pub mod config_reader;
pub mod error;
pub mod scheduling_config;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use config_reader::SchedulingConfigReader;
pub use error::{ConfigError, ConfigResult};
pub use scheduling_config::SchedulingConfig;
