// ==========================================
// 散装液体配送排产系统 - 引擎层
// ==========================================
// 职责: 实现排产规则引擎，不拼 SQL
// 主流程: OrderFragmenter → BacklogSimulator
//         (每日调用 DailyCapacitySolver + PenaltyModel)
// 红线: 背包求解必须精确; 模拟循环必须有界
// ==========================================

pub mod backlog;
pub mod capacity_validator;
pub mod error;
pub mod fragmenter;
pub mod knapsack;
pub mod orchestrator;
pub mod penalty;
pub mod priority;
pub mod profit_summary;

// 重导出核心引擎
pub use backlog::{BacklogSimulator, SimulationParams, SimulationResult};
pub use capacity_validator::{CapacityValidator, DailyCapacityCheck};
pub use error::{EngineError, EngineResult};
pub use fragmenter::{FragmentationResult, OrderFragmenter};
pub use knapsack::{DailyCapacitySolver, KnapsackItem, KnapsackSelection};
pub use orchestrator::{execute_with_config, ScheduleOrchestrator};
pub use penalty::PenaltyModel;
pub use priority::{
    normalize_client_key, PriorityClassifier, PriorityMap, QuarterlyVolumes, TierResolver, TierSource,
};
pub use profit_summary::{MonthlyProfit, ProfitComparisonRow, ProfitSummaryEngine};
