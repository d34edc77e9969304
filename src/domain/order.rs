// ==========================================
// 散装液体配送排产系统 - 订单领域模型
// ==========================================
// 职责: 原始订单记录 (导入中间结构) + 校验后订单 + DQ 报告
// 红线: 类型与范围只在导入边界校验一次，引擎内不再做隐式转换
// ==========================================

use crate::domain::types::{DqLevel, PriorityTier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// RawOrderRecord - 导入中间结构体
// ==========================================
// 用途: 文件解析 → 字段映射 → 此结构 → DQ 校验 → Order
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOrderRecord {
    pub order_id: Option<String>,
    pub client: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub deadline_date: Option<NaiveDate>,
    pub volume_liters: Option<f64>,
    pub profit: Option<f64>,
    pub priority_tier: Option<i64>,

    // 元信息
    pub row_number: usize,
}

// ==========================================
// Order - 已校验订单
// ==========================================
// 订单进入引擎前必须满足: id/client 非空, volume 为整数升
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub client: String,
    pub order_date: NaiveDate,
    pub deadline_date: Option<NaiveDate>,
    pub volume: u64, // 升
    pub profit: f64,
    pub priority_tier: PriorityTier,
}

impl Order {
    pub fn new(
        order_id: impl Into<String>,
        client: impl Into<String>,
        order_date: NaiveDate,
        volume: u64,
        profit: f64,
        priority_tier: PriorityTier,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            client: client.into(),
            order_date,
            deadline_date: None,
            volume,
            profit,
            priority_tier,
        }
    }

    pub fn with_deadline(mut self, deadline_date: NaiveDate) -> Self {
        self.deadline_date = Some(deadline_date);
        self
    }
}

// ==========================================
// DqViolation - 数据质量违规记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqViolation {
    pub row_number: usize,          // 原始文件行号
    pub order_id: Option<String>,   // 订单号（如果可解析）
    pub level: DqLevel,             // 违规级别
    pub field: String,              // 违规字段
    pub message: String,            // 违规描述
}

impl DqViolation {
    pub fn error(row_number: usize, order_id: Option<String>, field: &str, message: String) -> Self {
        Self {
            row_number,
            order_id,
            level: DqLevel::Error,
            field: field.to_string(),
            message,
        }
    }

    pub fn warning(row_number: usize, order_id: Option<String>, field: &str, message: String) -> Self {
        Self {
            row_number,
            order_id,
            level: DqLevel::Warning,
            field: field.to_string(),
            message,
        }
    }
}

// ==========================================
// DqSummary - 数据质量汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DqSummary {
    pub total_rows: usize, // 总行数
    pub accepted: usize,   // 进入排产
    pub rejected: usize,   // 剔除（ERROR）
    pub warning: usize,    // 带警告保留
}

// ==========================================
// OrderImportResult - 导入结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderImportResult {
    pub batch_id: String,
    pub source_file: String,
    pub orders: Vec<Order>,
    pub summary: DqSummary,
    pub violations: Vec<DqViolation>,
    pub elapsed_time: std::time::Duration,
}
