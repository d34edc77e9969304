// ==========================================
// 散装液体配送排产系统 - 排产结果领域模型
// ==========================================
// 职责: 排产输出 (已分配片段表 + 日租赁汇总 + 运行汇总)
// 红线: 未解决片段单独报告，绝不混入已分配序列
// ==========================================

use crate::domain::fragment::OrderFragment;
use crate::domain::types::{AssignmentKind, PriorityTier};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ResolvedFragmentRecord - 已分配片段记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFragmentRecord {
    pub id: String,
    pub parent_order_id: String,
    pub client: String,
    pub order_date: NaiveDate,
    pub deadline_date: Option<NaiveDate>,
    pub priority_tier: PriorityTier,
    pub strategic_weight: u64,
    pub volume: u64,
    pub profit_value: f64,
    pub assigned_date: NaiveDate,
    pub assignment: AssignmentKind,
    pub rented_volume: u64,
    pub adjusted_profit: f64,
}

impl ResolvedFragmentRecord {
    /// 从已分配片段构建记录；未分配返回 None
    pub fn from_fragment(fragment: &OrderFragment) -> Option<Self> {
        let assigned_date = fragment.assigned_date?;
        let assignment = fragment.assignment_kind()?;
        Some(Self {
            id: fragment.id.clone(),
            parent_order_id: fragment.parent_order_id.clone(),
            client: fragment.client.clone(),
            order_date: fragment.order_date,
            deadline_date: fragment.deadline_date,
            priority_tier: fragment.priority_tier,
            strategic_weight: fragment.strategic_weight,
            volume: fragment.volume,
            profit_value: fragment.profit_value,
            assigned_date,
            assignment,
            rented_volume: fragment.rented_volume,
            adjusted_profit: fragment.adjusted_profit,
        })
    }
}

// ==========================================
// DailyRentalSummary - 单日运力汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRentalSummary {
    pub date: NaiveDate,
    pub owned_volume: u64,
    pub owned_fragments: usize,
    pub rented_volume: u64,
    pub rented_fragments: usize,
    pub rented_truck_count: u64,
}

// ==========================================
// UnresolvedFragment - 未解决片段
// ==========================================
// 截止日早于首个可排日的片段，永远无法进入就绪集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedFragment {
    pub id: String,
    pub parent_order_id: String,
    pub client: String,
    pub earliest_ship_date: NaiveDate,
    pub deadline_date: Option<NaiveDate>,
    pub volume: u64,
    pub reason: String,
}

// ==========================================
// RejectedOrder - 被剔除订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedOrder {
    pub order_id: String,
    pub reason: String,
}

// ==========================================
// RunSummary - 运行汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub fragment_count: usize,
    pub resolved_count: usize,
    pub unresolved_count: usize,
    pub rejected_order_count: usize,
    pub owned_volume: u64,
    pub rented_volume: u64,
    pub total_rented_trucks: u64,
    pub total_profit: f64,
    pub total_adjusted_profit: f64,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub spillover_count: usize, // 分配日晚于窗口结束日的片段数
}

// ==========================================
// ScheduleOutcome - 一次排产的完整输出
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub resolved: Vec<ResolvedFragmentRecord>,
    pub daily: Vec<DailyRentalSummary>,
    pub unresolved: Vec<UnresolvedFragment>,
    pub rejected_orders: Vec<RejectedOrder>,
    pub summary: RunSummary,
}

impl ScheduleOutcome {
    /// 指定日期的分配明细
    pub fn records_on(&self, date: NaiveDate) -> Vec<&ResolvedFragmentRecord> {
        self.resolved
            .iter()
            .filter(|record| record.assigned_date == date)
            .collect()
    }

    /// 所有有分配的日期（升序去重）
    pub fn assigned_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.resolved.iter().map(|r| r.assigned_date).collect();
        dates.sort();
        dates.dedup();
        dates
    }

    pub fn find(&self, fragment_id: &str) -> Option<&ResolvedFragmentRecord> {
        self.resolved.iter().find(|record| record.id == fragment_id)
    }
}

// ==========================================
// ScheduleRun - 已持久化的排产运行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRun {
    pub run_id: String,
    pub created_at: NaiveDateTime,
    pub summary: RunSummary,
    pub config_snapshot_json: Option<String>,
}
