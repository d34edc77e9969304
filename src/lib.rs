// ==========================================
// 散装液体配送排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 自有运力 / 租赁运力日分配 (0/1 背包 + 积压模拟)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 导出层 - 结果文件
pub mod exporter;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AssignmentKind, DqLevel, FragmentState, PriorityTier, StrategicWeights};

// 领域实体
pub use domain::{
    DailyRentalSummary, Order, OrderFragment, ResolvedFragmentRecord, RunSummary, ScheduleOutcome,
    UnresolvedFragment,
};

// 引擎
pub use engine::{
    BacklogSimulator, DailyCapacitySolver, EngineError, OrderFragmenter, PenaltyModel,
    PriorityClassifier, ScheduleOrchestrator,
};

// 配置
pub use config::SchedulingConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "散装液体配送排产系统";
