// ==========================================
// 散装液体配送排产系统 - 订单拆分器
// ==========================================
// 职责: 将超过自有日运力的订单拆分为运力大小的片段
// 输入: 已校验订单列表
// 输出: OrderFragment 列表 (保持输入顺序) + 被剔除订单
// 红线: 片段体积之和 == 订单体积; 片段数 == ceil(体积 / 日运力)
// ==========================================

use crate::config::SchedulingConfig;
use crate::domain::fragment::OrderFragment;
use crate::domain::order::Order;
use crate::domain::types::StrategicWeights;
use crate::engine::error::{EngineError, EngineResult};
use chrono::Duration;
use tracing::{debug, warn};

/// 拆分结果
#[derive(Debug, Default)]
pub struct FragmentationResult {
    pub fragments: Vec<OrderFragment>,
    pub rejected: Vec<EngineError>,
}

// ==========================================
// OrderFragmenter - 订单拆分器
// ==========================================
#[derive(Debug, Clone)]
pub struct OrderFragmenter {
    owned_daily_capacity: u64,
    lead_time_days: i64,
    weights: StrategicWeights,
}

impl OrderFragmenter {
    pub fn new(owned_daily_capacity: u64, lead_time_days: i64, weights: StrategicWeights) -> Self {
        Self {
            owned_daily_capacity,
            lead_time_days,
            weights,
        }
    }

    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self::new(
            config.owned_capacity(),
            config.lead_time_days,
            config.strategic_weights,
        )
    }

    /// 片段数 = ceil(volume / owned_daily_capacity)
    pub fn fragment_count(&self, volume: u64) -> u64 {
        if self.owned_daily_capacity == 0 {
            return 0;
        }
        volume.div_ceil(self.owned_daily_capacity)
    }

    /// 拆分单个订单
    ///
    /// # 返回
    /// - Ok(Vec<OrderFragment>): 至少一个片段，id 为 `<订单号>-<序号>`
    /// - Err(InputValidation): 体积为 0 / 日期溢出
    /// - Err(CapacityMisconfiguration): 日运力为 0
    pub fn fragment_order(&self, order: &Order) -> EngineResult<Vec<OrderFragment>> {
        if self.owned_daily_capacity == 0 {
            return Err(EngineError::CapacityMisconfiguration {
                key: "owned_daily_capacity".to_string(),
                message: "自有日运力为 0，无法拆分订单".to_string(),
            });
        }
        if order.volume == 0 {
            return Err(EngineError::InputValidation {
                order_id: order.order_id.clone(),
                field: "volume".to_string(),
                message: "订单体积必须大于 0".to_string(),
            });
        }

        let earliest_ship_date = order
            .order_date
            .checked_add_signed(Duration::days(self.lead_time_days))
            .ok_or_else(|| EngineError::InputValidation {
                order_id: order.order_id.clone(),
                field: "order_date".to_string(),
                message: format!("下单日 {} 加提前期 {} 天溢出", order.order_date, self.lead_time_days),
            })?;

        let count = self.fragment_count(order.volume);
        let strategic_weight = self.weights.weight_of(order.priority_tier);
        let mut fragments = Vec::with_capacity(count as usize);
        let mut allotted_profit = 0.0;

        for index in 0..count {
            let is_last = index + 1 == count;
            let volume = if is_last {
                order.volume - self.owned_daily_capacity * (count - 1)
            } else {
                self.owned_daily_capacity
            };

            // 利润按体积分摊，末片段取余数以保证总利润守恒
            let profit_value = if is_last {
                order.profit - allotted_profit
            } else {
                order.profit * volume as f64 / order.volume as f64
            };
            allotted_profit += profit_value;

            fragments.push(OrderFragment {
                id: format!("{}-{}", order.order_id, index + 1),
                parent_order_id: order.order_id.clone(),
                sequence_no: (index + 1) as u32,
                client: order.client.clone(),
                order_date: order.order_date,
                deadline_date: order.deadline_date,
                earliest_ship_date,
                volume,
                profit_value,
                priority_tier: order.priority_tier,
                strategic_weight,
                waited_days: 0,
                assigned_date: None,
                rented_volume: 0,
                adjusted_profit: profit_value,
            });
        }

        if count > 1 {
            debug!(
                order_id = %order.order_id,
                volume = order.volume,
                fragments = count,
                "订单超过日运力，已拆分"
            );
        }

        Ok(fragments)
    }

    /// 批量拆分（保持输入顺序；单个订单失败不影响其余订单）
    pub fn fragment_all(&self, orders: &[Order]) -> FragmentationResult {
        let mut result = FragmentationResult::default();

        for order in orders {
            match self.fragment_order(order) {
                Ok(fragments) => result.fragments.extend(fragments),
                Err(e) => {
                    warn!(order_id = %order.order_id, error = %e, "订单被剔除，不参与拆分");
                    result.rejected.push(e);
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PriorityTier;
    use chrono::NaiveDate;

    fn order(id: &str, volume: u64, profit: f64) -> Order {
        Order::new(
            id,
            "TRANSPORTES DEL BAJIO",
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            volume,
            profit,
            PriorityTier::Tier1,
        )
    }

    fn fragmenter() -> OrderFragmenter {
        OrderFragmenter::new(1_920_000, 5, StrategicWeights::default())
    }

    #[test]
    fn test_large_order_is_split_into_capacity_sized_pieces() {
        let fragments = fragmenter().fragment_order(&order("P500", 5_000_000, 100_000.0)).unwrap();

        let volumes: Vec<u64> = fragments.iter().map(|f| f.volume).collect();
        assert_eq!(volumes, vec![1_920_000, 1_920_000, 160_000]);
        let ids: Vec<&str> = fragments.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["P500-1", "P500-2", "P500-3"]);
        assert!(fragments.iter().all(|f| f.strategic_weight == 3));
    }

    #[test]
    fn test_small_order_keeps_single_fragment() {
        let fragments = fragmenter().fragment_order(&order("P7", 64_000, 900.0)).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].id, "P7-1");
        assert_eq!(fragments[0].volume, 64_000);
        assert_eq!(fragments[0].earliest_ship_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(fragments[0].adjusted_profit, 900.0);
    }

    #[test]
    fn test_exact_multiple_has_no_remainder_fragment() {
        let fragments = fragmenter().fragment_order(&order("P8", 3_840_000, 10.0)).unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(fragments.iter().all(|f| f.volume == 1_920_000));
    }

    #[test]
    fn test_conservation_of_volume_and_profit() {
        let fragmenter = OrderFragmenter::new(7, 0, StrategicWeights::default());
        for volume in 1..=50u64 {
            let fragments = fragmenter.fragment_order(&order("P", volume, 123.45)).unwrap();
            assert_eq!(fragments.len() as u64, volume.div_ceil(7));
            assert_eq!(fragments.iter().map(|f| f.volume).sum::<u64>(), volume);
            let (last, head) = fragments.split_last().unwrap();
            assert!(head.iter().all(|f| f.volume == 7));
            assert!(last.volume > 0 && last.volume <= 7);
            let profit: f64 = fragments.iter().map(|f| f.profit_value).sum();
            assert!((profit - 123.45).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_volume_is_rejected_and_run_continues() {
        let orders = vec![order("P1", 0, 10.0), order("P2", 100, 10.0)];
        let result = fragmenter().fragment_all(&orders);

        assert_eq!(result.fragments.len(), 1);
        assert_eq!(result.fragments[0].parent_order_id, "P2");
        assert_eq!(result.rejected.len(), 1);
        assert!(matches!(
            result.rejected[0],
            EngineError::InputValidation { ref order_id, .. } if order_id == "P1"
        ));
    }
}
