// ==========================================
// 散装液体配送排产系统 - 排产业务常量
// ==========================================
// 职责: 运力/罚金/等待/提前期/窗口等业务常量 + 一次性校验
// 红线: 运力常量非正 → 致命错误，必须在处理任何一天之前报告
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::types::StrategicWeights;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::knapsack::MAX_DP_WIDTH;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 自有运力: 升/天
pub const DEFAULT_OWNED_DAILY_CAPACITY: i64 = 1_920_000;
/// 单辆租赁罐车容量: 升
pub const DEFAULT_RENTED_TRUCK_CAPACITY: i64 = 64_000;
/// 租赁运力利润罚金率
pub const DEFAULT_RENT_PENALTY_RATE: f64 = 0.05;
/// 最大等待天数（超过即不参与自有运力竞争）
pub const DEFAULT_MAX_WAIT_DAYS: u32 = 2;
/// 下单到最早发运的提前期: 天
pub const DEFAULT_LEAD_TIME_DAYS: i64 = 5;
/// 日循环硬上限（防死循环）
pub const DEFAULT_MAX_SIMULATION_DAYS: i64 = 3_660;

// ==========================================
// SchedulingConfig - 排产配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default = "default_owned_daily_capacity")]
    pub owned_daily_capacity: i64,
    #[serde(default = "default_rented_truck_capacity")]
    pub rented_truck_capacity: i64,
    #[serde(default = "default_rent_penalty_rate")]
    pub rent_penalty_rate: f64,
    #[serde(default = "default_max_wait_days")]
    pub max_wait_days: u32,
    #[serde(default = "default_lead_time_days")]
    pub lead_time_days: i64,
    #[serde(default)]
    pub strategic_weights: StrategicWeights,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    #[serde(default = "default_max_simulation_days")]
    pub max_simulation_days: i64,
}

fn default_owned_daily_capacity() -> i64 {
    DEFAULT_OWNED_DAILY_CAPACITY
}

fn default_rented_truck_capacity() -> i64 {
    DEFAULT_RENTED_TRUCK_CAPACITY
}

fn default_rent_penalty_rate() -> f64 {
    DEFAULT_RENT_PENALTY_RATE
}

fn default_max_wait_days() -> u32 {
    DEFAULT_MAX_WAIT_DAYS
}

fn default_lead_time_days() -> i64 {
    DEFAULT_LEAD_TIME_DAYS
}

fn default_max_simulation_days() -> i64 {
    DEFAULT_MAX_SIMULATION_DAYS
}

impl SchedulingConfig {
    /// 使用默认业务常量创建配置
    pub fn with_window(window_start: NaiveDate, window_end: NaiveDate) -> Self {
        Self {
            owned_daily_capacity: DEFAULT_OWNED_DAILY_CAPACITY,
            rented_truck_capacity: DEFAULT_RENTED_TRUCK_CAPACITY,
            rent_penalty_rate: DEFAULT_RENT_PENALTY_RATE,
            max_wait_days: DEFAULT_MAX_WAIT_DAYS,
            lead_time_days: DEFAULT_LEAD_TIME_DAYS,
            strategic_weights: StrategicWeights::default(),
            window_start,
            window_end,
            max_simulation_days: DEFAULT_MAX_SIMULATION_DAYS,
        }
    }

    /// 从 JSON 文件加载（缺省字段取默认值，窗口日期必填）
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SchedulingConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// 序列化为 JSON 快照
    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string(self).map_err(ConfigError::from)
    }

    /// 校验配置
    ///
    /// # 返回
    /// - Ok(()): 可以开始模拟
    /// - Err(CapacityMisconfiguration): 致命配置错误
    pub fn validate(&self) -> EngineResult<()> {
        if self.owned_daily_capacity <= 0 {
            return Err(misconfigured(
                "owned_daily_capacity",
                format!("自有日运力必须大于 0，实际: {}", self.owned_daily_capacity),
            ));
        }
        if self.owned_daily_capacity as u64 >= MAX_DP_WIDTH {
            return Err(misconfigured(
                "owned_daily_capacity",
                format!(
                    "自有日运力不能超过 {} 升，实际: {}",
                    MAX_DP_WIDTH - 1,
                    self.owned_daily_capacity
                ),
            ));
        }
        if self.rented_truck_capacity <= 0 {
            return Err(misconfigured(
                "rented_truck_capacity",
                format!("租赁罐车容量必须大于 0，实际: {}", self.rented_truck_capacity),
            ));
        }
        if !self.rent_penalty_rate.is_finite() || !(0.0..=1.0).contains(&self.rent_penalty_rate) {
            return Err(misconfigured(
                "rent_penalty_rate",
                format!("罚金率必须位于 [0, 1]，实际: {}", self.rent_penalty_rate),
            ));
        }
        if self.lead_time_days < 0 {
            return Err(misconfigured(
                "lead_time_days",
                format!("提前期不能为负，实际: {}", self.lead_time_days),
            ));
        }
        if !self.strategic_weights.is_strictly_decreasing() {
            return Err(misconfigured(
                "strategic_weights",
                format!(
                    "战略权重必须为正且随等级严格递减，实际: {}/{}/{}",
                    self.strategic_weights.tier1,
                    self.strategic_weights.tier2,
                    self.strategic_weights.tier3
                ),
            ));
        }
        if self.window_start > self.window_end {
            return Err(misconfigured(
                "window",
                format!("窗口起始日 {} 晚于结束日 {}", self.window_start, self.window_end),
            ));
        }
        if self.max_simulation_days <= 0 {
            return Err(misconfigured(
                "max_simulation_days",
                format!("模拟天数上限必须大于 0，实际: {}", self.max_simulation_days),
            ));
        }
        Ok(())
    }

    /// 校验后的自有日运力（升）
    pub fn owned_capacity(&self) -> u64 {
        self.owned_daily_capacity.max(0) as u64
    }

    /// 校验后的租赁罐车容量（升）
    pub fn truck_capacity(&self) -> u64 {
        self.rented_truck_capacity.max(0) as u64
    }
}

fn misconfigured(key: &str, message: String) -> EngineError {
    EngineError::CapacityMisconfiguration {
        key: key.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_defaults_are_valid() {
        let (start, end) = window();
        let config = SchedulingConfig::with_window(start, end);
        assert!(config.validate().is_ok());
        assert_eq!(config.owned_capacity(), 1_920_000);
        assert_eq!(config.truck_capacity(), 64_000);
    }

    #[test]
    fn test_non_positive_capacity_is_fatal() {
        let (start, end) = window();
        let mut config = SchedulingConfig::with_window(start, end);
        config.owned_daily_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EngineError::CapacityMisconfiguration { ref key, .. } if key == "owned_daily_capacity"));
        assert!(err.is_fatal());

        let mut config = SchedulingConfig::with_window(start, end);
        config.owned_daily_capacity = 40_000_000;
        assert!(matches!(
            config.validate(),
            Err(EngineError::CapacityMisconfiguration { ref key, .. }) if key == "owned_daily_capacity"
        ));

        let mut config = SchedulingConfig::with_window(start, end);
        config.rented_truck_capacity = -64_000;
        assert!(matches!(
            config.validate(),
            Err(EngineError::CapacityMisconfiguration { ref key, .. }) if key == "rented_truck_capacity"
        ));
    }

    #[test]
    fn test_penalty_rate_and_window_checks() {
        let (start, end) = window();
        let mut config = SchedulingConfig::with_window(start, end);
        config.rent_penalty_rate = 1.5;
        assert!(config.validate().is_err());

        let reversed = SchedulingConfig::with_window(end, start);
        assert!(reversed.validate().is_err());
    }

    #[test]
    fn test_json_defaults_fill_missing_fields() {
        let raw = r#"{"window_start":"2024-02-01","window_end":"2024-02-29","max_wait_days":0}"#;
        let config: SchedulingConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.max_wait_days, 0);
        assert_eq!(config.owned_daily_capacity, DEFAULT_OWNED_DAILY_CAPACITY);
        assert_eq!(config.lead_time_days, 5);
        assert_eq!(config.strategic_weights, StrategicWeights::default());
    }
}
