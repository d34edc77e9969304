// ==========================================
// 散装液体配送排产系统 - 排产配置读取 Trait
// ==========================================
// 职责: 定义编排器所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::error::ConfigResult;
use crate::config::scheduling_config::SchedulingConfig;
use async_trait::async_trait;

// ==========================================
// SchedulingConfigReader Trait
// ==========================================
// 实现者:
// - SchedulingConfig（静态配置，测试/JSON 文件）
// - ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait SchedulingConfigReader: Send + Sync {
    /// 读取完整排产配置（缺省项取默认值）
    async fn get_scheduling_config(&self) -> ConfigResult<SchedulingConfig>;

    /// 配置快照（JSON），随运行结果落库
    async fn get_config_snapshot(&self) -> ConfigResult<String> {
        self.get_scheduling_config().await?.to_json()
    }
}

#[async_trait]
impl SchedulingConfigReader for SchedulingConfig {
    async fn get_scheduling_config(&self) -> ConfigResult<SchedulingConfig> {
        Ok(self.clone())
    }
}
