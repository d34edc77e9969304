// ==========================================
// 散装液体配送排产系统 - 租赁罚金模型
// ==========================================
// 规则:
// - rented_volume == 0 → 利润不变
// - 否则 利润 − 租赁体积 × |单位利润| × 罚金率
// 红线: adjusted_profit ≤ profit_value
// ==========================================

use crate::config::SchedulingConfig;
use crate::domain::fragment::OrderFragment;

#[derive(Debug, Clone, Copy)]
pub struct PenaltyModel {
    rent_penalty_rate: f64,
}

impl PenaltyModel {
    pub fn new(rent_penalty_rate: f64) -> Self {
        Self { rent_penalty_rate }
    }

    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self::new(config.rent_penalty_rate)
    }

    pub fn rate(&self) -> f64 {
        self.rent_penalty_rate
    }

    /// 片段的调整后利润（读取片段当前的 rented_volume）
    pub fn adjusted_profit(&self, fragment: &OrderFragment) -> f64 {
        self.adjusted_profit_for(fragment.profit_value, fragment.volume, fragment.rented_volume)
    }

    /// 按原始数值计算调整后利润
    pub fn adjusted_profit_for(&self, profit_value: f64, volume: u64, rented_volume: u64) -> f64 {
        profit_value - self.penalty_for(profit_value, volume, rented_volume as f64)
    }

    /// 罚金金额（租赁体积可为分摊后的小数，用于基线估算）
    pub fn penalty_for(&self, profit_value: f64, volume: u64, rented_volume: f64) -> f64 {
        if rented_volume <= 0.0 {
            return 0.0;
        }
        // 体积为 0 时单位利润按 0 处理
        let per_unit_profit = if volume == 0 {
            0.0
        } else {
            profit_value / volume as f64
        };
        rented_volume * per_unit_profit.abs() * self.rent_penalty_rate
    }
}

impl Default for PenaltyModel {
    fn default() -> Self {
        Self::new(crate::config::scheduling_config::DEFAULT_RENT_PENALTY_RATE)
    }
}
