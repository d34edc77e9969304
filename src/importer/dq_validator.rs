// ==========================================
// 散装液体配送排产系统 - 数据质量校验器实现
// ==========================================
// 规则:
// - ERROR (剔除): 订单号/客户/下单日缺失; 订单号重复(第二次出现);
//                 下单日不在导入区间内; 体积缺失、≤ 0 或超过上限; 等级不在 1..=3
// - WARNING (保留并修正): 体积含小数 → 四舍五入; 等级缺失且查找表无此客户 → 2;
//                         利润缺失 → 0
// - INFO: 等级由客户等级表或季度升级规则补全
// ==========================================

use crate::domain::order::{DqViolation, Order, RawOrderRecord};
use crate::domain::types::{DqLevel, PriorityTier};
use crate::engine::priority::TierSource;
use crate::importer::order_importer_trait::{DqContext, DqValidator};
use std::collections::HashSet;

/// 单笔订单体积上限（升）
pub const MAX_ORDER_VOLUME_LITERS: f64 = 1_000_000_000.0;

pub struct OrderDqValidator;

impl OrderDqValidator {
    /// 校验单条记录；返回 None 表示被剔除
    fn validate_record(
        &self,
        record: &RawOrderRecord,
        context: &DqContext,
        seen_ids: &mut HashSet<String>,
        violations: &mut Vec<DqViolation>,
    ) -> Option<Order> {
        let row = record.row_number;
        let id = record.order_id.clone();
        let mut rejected = false;

        let order_id = match &record.order_id {
            Some(order_id) => {
                if !seen_ids.insert(order_id.clone()) {
                    violations.push(DqViolation::error(
                        row,
                        id.clone(),
                        "order_id",
                        format!("订单号重复: {}", order_id),
                    ));
                    rejected = true;
                }
                order_id.clone()
            }
            None => {
                violations.push(DqViolation::error(row, None, "order_id", "订单号缺失".to_string()));
                return None;
            }
        };

        if record.client.is_none() {
            violations.push(DqViolation::error(row, id.clone(), "client", "客户缺失".to_string()));
            rejected = true;
        }
        match (record.order_date, context.order_window) {
            (None, _) => {
                violations.push(DqViolation::error(row, id.clone(), "order_date", "下单日缺失".to_string()));
                rejected = true;
            }
            (Some(date), Some((from, to))) if date < from || date > to => {
                violations.push(DqViolation::error(
                    row,
                    id.clone(),
                    "order_date",
                    format!("下单日 {} 不在区间 {} ~ {} 内", date, from, to),
                ));
                rejected = true;
            }
            _ => {}
        }

        let volume = match record.volume_liters {
            None => {
                violations.push(DqViolation::error(row, id.clone(), "volume", "体积缺失".to_string()));
                rejected = true;
                0
            }
            Some(liters) if !liters.is_finite() || liters.round() <= 0.0 => {
                violations.push(DqViolation::error(
                    row,
                    id.clone(),
                    "volume",
                    format!("体积必须大于 0，实际: {}", liters),
                ));
                rejected = true;
                0
            }
            Some(liters) if liters.round() > MAX_ORDER_VOLUME_LITERS => {
                violations.push(DqViolation::error(
                    row,
                    id.clone(),
                    "volume",
                    format!("体积 {} 超过上限 {}", liters, MAX_ORDER_VOLUME_LITERS),
                ));
                rejected = true;
                0
            }
            Some(liters) => {
                if liters.fract() != 0.0 {
                    violations.push(DqViolation::warning(
                        row,
                        id.clone(),
                        "volume",
                        format!("体积含小数 {}，已四舍五入", liters),
                    ));
                }
                liters.round() as u64
            }
        };

        let tier = match record.priority_tier {
            Some(number) => match PriorityTier::from_number(number) {
                Some(tier) => tier,
                None => {
                    violations.push(DqViolation::error(
                        row,
                        id.clone(),
                        "priority_tier",
                        format!("等级必须为 1/2/3，实际: {}", number),
                    ));
                    rejected = true;
                    PriorityTier::default()
                }
            },
            None => {
                let resolved = record
                    .client
                    .as_deref()
                    .and_then(|c| context.tiers.resolve(c, record.order_date));
                match resolved {
                    Some((tier, source)) => {
                        let message = match source {
                            TierSource::Historical => format!("等级取自客户等级表: {}", tier),
                            TierSource::QuarterUpgrade => format!("上一季度开票量达标，等级升为 {}", tier),
                        };
                        violations.push(DqViolation {
                            row_number: row,
                            order_id: id.clone(),
                            level: DqLevel::Info,
                            field: "priority_tier".to_string(),
                            message,
                        });
                        tier
                    }
                    None => {
                        violations.push(DqViolation::warning(
                            row,
                            id.clone(),
                            "priority_tier",
                            "等级缺失且客户不在等级表中，按 2 处理".to_string(),
                        ));
                        PriorityTier::Tier2
                    }
                }
            }
        };

        let profit = match record.profit {
            Some(profit) if profit.is_finite() => profit,
            _ => {
                violations.push(DqViolation::warning(
                    row,
                    id.clone(),
                    "profit",
                    "利润缺失，按 0 处理".to_string(),
                ));
                0.0
            }
        };

        if rejected {
            return None;
        }

        let (client, order_date) = (record.client.clone()?, record.order_date?);
        let mut order = Order::new(order_id, client, order_date, volume, profit, tier);
        order.deadline_date = record.deadline_date;
        Some(order)
    }
}

impl DqValidator for OrderDqValidator {
    fn validate(
        &self,
        records: &[RawOrderRecord],
        context: &DqContext,
    ) -> (Vec<Order>, Vec<DqViolation>) {
        let mut orders = Vec::with_capacity(records.len());
        let mut violations = Vec::new();
        let mut seen_ids = HashSet::new();

        for record in records {
            if let Some(order) = self.validate_record(record, context, &mut seen_ids, &mut violations) {
                orders.push(order);
            }
        }

        (orders, violations)
    }
}
