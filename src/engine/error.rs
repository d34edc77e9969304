// ==========================================
// 散装液体配送排产系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 传播策略:
// - 单条数据错误 (InputValidation / DeadlineInfeasible) 在本地恢复，剔除后继续
// - 配置错误 (CapacityMisconfiguration / Config) 在任何一天处理前致命
// - 求解器错误 / 状态违规属于实现缺陷，直接向上传播
// ==========================================

use crate::config::ConfigError;
use chrono::NaiveDate;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 数据错误（可恢复） =====
    #[error("输入校验失败 (订单 {order_id}, 字段 {field}): {message}")]
    InputValidation {
        order_id: String,
        field: String,
        message: String,
    },

    #[error("截止日不可行 (片段 {fragment_id}): 截止日 {deadline_date} 早于首个可排日 {first_schedulable_day}")]
    DeadlineInfeasible {
        fragment_id: String,
        first_schedulable_day: NaiveDate,
        deadline_date: NaiveDate,
    },

    // ===== 配置错误（致命） =====
    #[error("运力配置错误 (key: {key}): {message}")]
    CapacityMisconfiguration { key: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    // ===== 实现缺陷（致命） =====
    #[error("背包求解失败: {0}")]
    Solver(String),

    #[error("片段重复分配: {fragment_id} 已于 {assigned_date} 分配")]
    FragmentAlreadyAssigned {
        fragment_id: String,
        assigned_date: NaiveDate,
    },

    #[error("模拟超过天数上限 {limit_days} 天，仍有 {} 个片段未分配: {}", .pending.len(), .pending.join(", "))]
    DayLimitExceeded {
        limit_days: i64,
        pending: Vec<String>,
    },
}

impl EngineError {
    /// 是否为致命错误（需中止整次运行）
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EngineError::InputValidation { .. } | EngineError::DeadlineInfeasible { .. }
        )
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
