// ==========================================
// 散装液体配送排产系统 - 运力校验器
// ==========================================
// 职责: 对已生成排产按日复核
// - 自有运力: owned_liters ≤ owned_daily_capacity
// - 租赁覆盖: 报告车次 × 单车容量 ≥ rented_liters
// ==========================================

use crate::config::SchedulingConfig;
use crate::domain::schedule::{DailyRentalSummary, ResolvedFragmentRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// 单日复核结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCapacityCheck {
    pub date: NaiveDate,
    pub total_liters: u64,
    pub owned_liters: u64,
    pub rented_liters: u64,
    pub rented_trucks_needed: u64,
    pub rented_trucks_reported: u64,
    pub owned_within_capacity: bool,
    pub rented_covered: bool,
}

impl DailyCapacityCheck {
    pub fn is_ok(&self) -> bool {
        self.owned_within_capacity && self.rented_covered
    }
}

#[derive(Debug, Clone)]
pub struct CapacityValidator {
    owned_daily_capacity: u64,
    rented_truck_capacity: u64,
}

impl CapacityValidator {
    pub fn new(owned_daily_capacity: u64, rented_truck_capacity: u64) -> Self {
        Self {
            owned_daily_capacity,
            rented_truck_capacity,
        }
    }

    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self::new(config.owned_capacity(), config.truck_capacity())
    }

    /// 按分配日复核（升序）
    ///
    /// `daily` 提供各日报告的租赁车次；缺失的日期按 0 车次处理
    pub fn validate(
        &self,
        records: &[ResolvedFragmentRecord],
        daily: &[DailyRentalSummary],
    ) -> Vec<DailyCapacityCheck> {
        let reported: BTreeMap<NaiveDate, u64> = daily
            .iter()
            .map(|d| (d.date, d.rented_truck_count))
            .collect();

        // date → (owned, rented)
        let mut days: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
        for record in records {
            let entry = days.entry(record.assigned_date).or_default();
            entry.0 += record.volume - record.rented_volume;
            entry.1 += record.rented_volume;
        }

        days.into_iter()
            .map(|(date, (owned, rented))| {
                let rented_trucks_reported = reported.get(&date).copied().unwrap_or(0);
                let check = DailyCapacityCheck {
                    date,
                    total_liters: owned + rented,
                    owned_liters: owned,
                    rented_liters: rented,
                    rented_trucks_needed: if self.rented_truck_capacity == 0 {
                        0
                    } else {
                        rented.div_ceil(self.rented_truck_capacity)
                    },
                    rented_trucks_reported,
                    owned_within_capacity: owned <= self.owned_daily_capacity,
                    rented_covered: rented_trucks_reported.saturating_mul(self.rented_truck_capacity)
                        >= rented,
                };
                if !check.is_ok() {
                    warn!(
                        date = %date,
                        owned_liters = owned,
                        rented_liters = rented,
                        trucks_reported = rented_trucks_reported,
                        "运力复核未通过"
                    );
                }
                check
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AssignmentKind, PriorityTier};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn record(id: &str, day: u32, volume: u64, rented: bool) -> ResolvedFragmentRecord {
        ResolvedFragmentRecord {
            id: id.to_string(),
            parent_order_id: id.to_string(),
            client: "CLIENTE".to_string(),
            order_date: date(1),
            deadline_date: None,
            priority_tier: PriorityTier::Tier1,
            strategic_weight: 3,
            volume,
            profit_value: 1.0,
            assigned_date: date(day),
            assignment: if rented { AssignmentKind::Rented } else { AssignmentKind::Own },
            rented_volume: if rented { volume } else { 0 },
            adjusted_profit: 1.0,
        }
    }

    fn summary(day: u32, trucks: u64) -> DailyRentalSummary {
        DailyRentalSummary {
            date: date(day),
            owned_volume: 0,
            owned_fragments: 0,
            rented_volume: 0,
            rented_fragments: 0,
            rented_truck_count: trucks,
        }
    }

    #[test]
    fn test_consistent_schedule_passes() {
        let validator = CapacityValidator::new(100, 64);
        let records = vec![record("A", 5, 100, false), record("B", 5, 65, true)];
        let checks = validator.validate(&records, &[summary(5, 2)]);

        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].total_liters, 165);
        assert_eq!(checks[0].rented_trucks_needed, 2);
        assert!(checks[0].is_ok());
    }

    #[test]
    fn test_violations_are_flagged() {
        let validator = CapacityValidator::new(100, 64);
        let records = vec![
            record("A", 5, 80, false),
            record("B", 5, 30, false),
            record("C", 6, 70, true),
        ];
        let checks = validator.validate(&records, &[summary(6, 1)]);

        assert!(!checks[0].owned_within_capacity);
        assert!(checks[0].rented_covered);
        assert!(!checks[1].rented_covered);
        assert_eq!(checks[1].rented_trucks_needed, 2);
    }
}
