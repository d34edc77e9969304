// ==========================================
// 散装液体配送排产系统 - 订单片段领域模型
// ==========================================
// 红线: assigned_date 只写一次; adjusted_profit ≤ profit_value
// 用途: 背包求解与积压模拟的最小调度单元
// ==========================================

use crate::domain::types::{AssignmentKind, FragmentState, PriorityTier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// OrderFragment - 订单片段
// ==========================================
// 不可变字段: 由 OrderFragmenter 在模拟开始时一次性生成
// 可变字段: waited_days / assigned_date / rented_volume / adjusted_profit，
//           运行期间仅由 BacklogSimulator 修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFragment {
    // ===== 标识 =====
    pub id: String,              // <订单号>-<序号>
    pub parent_order_id: String,
    pub sequence_no: u32,        // 从 1 开始

    // ===== 订单属性 =====
    pub client: String,
    pub order_date: NaiveDate,
    pub deadline_date: Option<NaiveDate>,
    pub earliest_ship_date: NaiveDate,
    pub volume: u64,             // 升
    pub profit_value: f64,       // 按体积分摊的原始利润
    pub priority_tier: PriorityTier,
    pub strategic_weight: u64,

    // ===== 模拟状态 =====
    pub waited_days: u32,
    pub assigned_date: Option<NaiveDate>,
    pub rented_volume: u64,
    pub adjusted_profit: f64,
}

impl OrderFragment {
    /// 片段当前状态（由 assigned_date / rented_volume 派生）
    pub fn state(&self) -> FragmentState {
        match (self.assigned_date, self.rented_volume) {
            (None, _) => FragmentState::Pending,
            (Some(_), 0) => FragmentState::AssignedOwn,
            (Some(_), _) => FragmentState::AssignedRented,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_date.is_some()
    }

    /// 运力类型（未分配返回 None）
    pub fn assignment_kind(&self) -> Option<AssignmentKind> {
        match self.state() {
            FragmentState::Pending => None,
            FragmentState::AssignedOwn => Some(AssignmentKind::Own),
            FragmentState::AssignedRented => Some(AssignmentKind::Rented),
        }
    }

    /// 截止日期是否晚于（或等于）最早发运日
    pub fn has_feasible_deadline(&self) -> bool {
        self.deadline_date
            .map_or(true, |deadline| deadline >= self.earliest_ship_date)
    }

    /// 首个可排日期: max(最早发运日, 窗口起始日)
    pub fn first_schedulable_day(&self, window_start: NaiveDate) -> NaiveDate {
        self.earliest_ship_date.max(window_start)
    }

    /// 当日是否处于就绪集合
    ///
    /// 条件: 未分配 && 最早发运日 ≤ day && (无截止日 || day ≤ 截止日)
    pub fn is_ready_on(&self, day: NaiveDate) -> bool {
        self.assigned_date.is_none()
            && self.earliest_ship_date <= day
            && self.deadline_date.map_or(true, |deadline| day <= deadline)
    }
}
