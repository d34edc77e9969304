// ==========================================
// 散装液体配送排产系统 - 罐车明细
// ==========================================
// 职责: 为每个已分配片段编排罐车编号
// 规则:
// - 每日独立编号，当日片段按 (等级, 体积, 片段ID) 升序装车
// - 自有车队 PIP01..PIPnn，每车额定 = 自有日运力 / 车队规模
// - 租赁罐车从 PIP(nn+1) 起，每车额定 = 租赁罐车容量
// 红线: 自有/租赁归属沿用排产结果，不在此重新决策
// ==========================================

use crate::config::SchedulingConfig;
use crate::domain::schedule::ResolvedFragmentRecord;
use crate::domain::types::{AssignmentKind, PriorityTier};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// 自有车队默认规模
pub const DEFAULT_OWNED_FLEET_SIZE: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruckFleet {
    owned_fleet_size: u64,
    owned_truck_capacity: u64,
    rented_truck_capacity: u64,
}

impl TruckFleet {
    pub fn new(owned_daily_capacity: u64, owned_fleet_size: u64, rented_truck_capacity: u64) -> Self {
        let owned_fleet_size = owned_fleet_size.max(1);
        Self {
            owned_fleet_size,
            owned_truck_capacity: (owned_daily_capacity / owned_fleet_size).max(1),
            rented_truck_capacity: rented_truck_capacity.max(1),
        }
    }

    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self::new(
            config.owned_capacity(),
            DEFAULT_OWNED_FLEET_SIZE,
            config.truck_capacity(),
        )
    }

    pub fn owned_truck_capacity(&self) -> u64 {
        self.owned_truck_capacity
    }

    /// 自有车号（1 起，超出车队规模时落在最后一辆）
    fn owned_truck_number(&self, loaded: u64) -> u64 {
        (loaded / self.owned_truck_capacity + 1).min(self.owned_fleet_size)
    }

    fn rented_truck_number(&self, loaded: u64) -> u64 {
        self.owned_fleet_size + 1 + loaded / self.rented_truck_capacity
    }
}

pub fn truck_id(number: u64) -> String {
    format!("PIP{:02}", number)
}

/// 单个片段的装车记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TruckAssignment {
    pub assigned_date: NaiveDate,
    pub fragment_id: String,
    pub client: String,
    pub priority_tier: PriorityTier,
    pub assignment: AssignmentKind,
    pub truck_id: String,
    pub truck_liters: u64,
    pub rented_volume: u64,
    pub adjusted_profit: f64,
}

/// 由已分配片段生成罐车明细（按日期，再按装车顺序）
pub fn build_truck_detail(records: &[ResolvedFragmentRecord], fleet: &TruckFleet) -> Vec<TruckAssignment> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&ResolvedFragmentRecord>> = BTreeMap::new();
    for record in records {
        by_day.entry(record.assigned_date).or_default().push(record);
    }

    let mut detail = Vec::with_capacity(records.len());
    for (day, mut day_records) in by_day {
        day_records.sort_by(|a, b| {
            a.priority_tier
                .as_u8()
                .cmp(&b.priority_tier.as_u8())
                .then_with(|| a.volume.cmp(&b.volume))
                .then_with(|| a.id.cmp(&b.id))
        });

        let (mut owned_loaded, mut rented_loaded) = (0u64, 0u64);
        for record in day_records {
            let number = match record.assignment {
                AssignmentKind::Own => {
                    let number = fleet.owned_truck_number(owned_loaded);
                    owned_loaded += record.volume;
                    number
                }
                AssignmentKind::Rented => {
                    let number = fleet.rented_truck_number(rented_loaded);
                    rented_loaded += record.volume;
                    number
                }
            };

            detail.push(TruckAssignment {
                assigned_date: day,
                fragment_id: record.id.clone(),
                client: record.client.clone(),
                priority_tier: record.priority_tier,
                assignment: record.assignment,
                truck_id: truck_id(number),
                truck_liters: record.volume,
                rented_volume: record.rented_volume,
                adjusted_profit: record.adjusted_profit,
            });
        }
    }

    detail
}
