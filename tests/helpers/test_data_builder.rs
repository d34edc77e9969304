// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

#![allow(dead_code)]

use bulk_liquid_aps::config::SchedulingConfig;
use bulk_liquid_aps::domain::order::Order;
use bulk_liquid_aps::domain::types::PriorityTier;
use chrono::{Duration, NaiveDate};

// ==========================================
// Order 构建器
// ==========================================

pub struct OrderBuilder {
    order_id: String,
    client: String,
    order_date: NaiveDate,
    deadline_date: Option<NaiveDate>,
    volume: u64,
    profit: Option<f64>,
    priority_tier: PriorityTier,
}

impl OrderBuilder {
    pub fn new(order_id: &str) -> Self {
        Self {
            order_id: order_id.to_string(),
            client: format!("CLIENTE {}", order_id),
            order_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            deadline_date: None,
            volume: 1_000,
            profit: None,
            priority_tier: PriorityTier::Tier2,
        }
    }

    pub fn client(mut self, client: &str) -> Self {
        self.client = client.to_string();
        self
    }

    pub fn ordered(mut self, date: NaiveDate) -> Self {
        self.order_date = date;
        self
    }

    /// 下单日 = 窗口起始日 - 提前期 + offset（即 offset 天后可发运）
    pub fn ready_on_day(mut self, config: &SchedulingConfig, offset: i64) -> Self {
        self.order_date = config.window_start - Duration::days(config.lead_time_days) + Duration::days(offset);
        self
    }

    pub fn deadline(mut self, date: NaiveDate) -> Self {
        self.deadline_date = Some(date);
        self
    }

    pub fn volume(mut self, volume: u64) -> Self {
        self.volume = volume;
        self
    }

    /// 缺省利润 = 每升 0.5
    pub fn profit(mut self, profit: f64) -> Self {
        self.profit = Some(profit);
        self
    }

    pub fn tier(mut self, tier: PriorityTier) -> Self {
        self.priority_tier = tier;
        self
    }

    pub fn build(self) -> Order {
        let profit = self.profit.unwrap_or(self.volume as f64 * 0.5);
        let mut order = Order::new(
            self.order_id,
            self.client,
            self.order_date,
            self.volume,
            profit,
            self.priority_tier,
        );
        order.deadline_date = self.deadline_date;
        order
    }
}

// ==========================================
// SchedulingConfig 构建
// ==========================================

/// 小容量配置，便于手算
///
/// - 窗口: 2024-01-01 ~ 2024-01-31
/// - 自有日运力 100，罐车 64，罚金率 0.05，提前期 0
pub fn small_config() -> SchedulingConfig {
    let mut config = SchedulingConfig::with_window(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    );
    config.owned_daily_capacity = 100;
    config.rented_truck_capacity = 64;
    config.lead_time_days = 0;
    config
}

/// 默认业务常量配置（窗口 2024-01）
pub fn default_config() -> SchedulingConfig {
    SchedulingConfig::with_window(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
}
