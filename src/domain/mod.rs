// ==========================================
// 散装液体配送排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod client;
pub mod fragment;
pub mod order;
pub mod schedule;
pub mod types;

// 重导出核心类型
pub use client::{BilledOrderRecord, CancellationRecord, ClientPriority};
pub use fragment::OrderFragment;
pub use order::{DqSummary, DqViolation, Order, OrderImportResult, RawOrderRecord};
pub use schedule::{
    DailyRentalSummary, RejectedOrder, ResolvedFragmentRecord, RunSummary, ScheduleOutcome, ScheduleRun,
    UnresolvedFragment,
};
pub use types::{AssignmentKind, DqLevel, FragmentState, PriorityTier, StrategicWeights};
