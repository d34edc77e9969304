// ==========================================
// 散装液体配送排产系统 - 领域类型定义
// ==========================================
// 红线: 优先级是等级制 (1/2/3)，战略权重只由等级决定
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 客户优先级 (Priority Tier)
// ==========================================
// 顺序: Tier1 最重要，数值越大越次要
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PriorityTier {
    Tier1, // 战略客户
    Tier2, // 普通客户
    Tier3, // 高取消率客户
}

impl PriorityTier {
    /// 所有等级（按重要性降序）
    pub const ALL: [PriorityTier; 3] = [PriorityTier::Tier1, PriorityTier::Tier2, PriorityTier::Tier3];

    /// 等级数值 (1/2/3)
    pub fn as_u8(self) -> u8 {
        match self {
            PriorityTier::Tier1 => 1,
            PriorityTier::Tier2 => 2,
            PriorityTier::Tier3 => 3,
        }
    }

    /// 从数值解析等级，超出 1..=3 返回 None
    pub fn from_number(value: i64) -> Option<Self> {
        match value {
            1 => Some(PriorityTier::Tier1),
            2 => Some(PriorityTier::Tier2),
            3 => Some(PriorityTier::Tier3),
            _ => None,
        }
    }
}

impl TryFrom<u8> for PriorityTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PriorityTier::from_number(i64::from(value))
            .ok_or_else(|| format!("优先级必须为 1/2/3，实际: {}", value))
    }
}

impl From<PriorityTier> for u8 {
    fn from(tier: PriorityTier) -> Self {
        tier.as_u8()
    }
}

impl Default for PriorityTier {
    fn default() -> Self {
        PriorityTier::Tier2
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

// ==========================================
// 战略权重表 (Strategic Weights)
// ==========================================
// 背包价值 = f(等级)，必须随等级数值单调递减
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicWeights {
    pub tier1: u64,
    pub tier2: u64,
    pub tier3: u64,
}

impl StrategicWeights {
    pub fn weight_of(&self, tier: PriorityTier) -> u64 {
        match tier {
            PriorityTier::Tier1 => self.tier1,
            PriorityTier::Tier2 => self.tier2,
            PriorityTier::Tier3 => self.tier3,
        }
    }

    /// 检查权重是否为正且严格递减
    pub fn is_strictly_decreasing(&self) -> bool {
        self.tier3 > 0 && self.tier2 > self.tier3 && self.tier1 > self.tier2
    }
}

impl Default for StrategicWeights {
    fn default() -> Self {
        Self {
            tier1: 3,
            tier2: 2,
            tier3: 1,
        }
    }
}

// ==========================================
// 运力类型 (Assignment Kind)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与落库/导出一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentKind {
    Own,    // 自有运力
    Rented, // 租赁运力
}

impl fmt::Display for AssignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentKind::Own => write!(f, "OWN"),
            AssignmentKind::Rented => write!(f, "RENTED"),
        }
    }
}

impl AssignmentKind {
    /// 从字符串解析（落库回读用）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OWN" => Some(AssignmentKind::Own),
            "RENTED" => Some(AssignmentKind::Rented),
            _ => None,
        }
    }
}

// ==========================================
// 片段状态 (Fragment State)
// ==========================================
// Pending → AssignedOwn / Pending → AssignedRented，两个终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FragmentState {
    Pending,
    AssignedOwn,
    AssignedRented,
}

impl FragmentState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FragmentState::Pending)
    }
}

impl fmt::Display for FragmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentState::Pending => write!(f, "PENDING"),
            FragmentState::AssignedOwn => write!(f, "ASSIGNED_OWN"),
            FragmentState::AssignedRented => write!(f, "ASSIGNED_RENTED"),
        }
    }
}

// ==========================================
// 数据质量级别 (DQ Level)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DqLevel {
    Error,   // 错误（订单被剔除）
    Warning, // 警告（订单保留，值被修正）
    Info,    // 提示（仅记录）
}

impl fmt::Display for DqLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DqLevel::Error => write!(f, "ERROR"),
            DqLevel::Warning => write!(f, "WARNING"),
            DqLevel::Info => write!(f, "INFO"),
        }
    }
}
