// ==========================================
// 散装液体配送排产系统 - 客户历史领域模型
// ==========================================
// 用途: 优先级分级的输入 (历史开票 + 取消记录) 与输出
// ==========================================

use crate::domain::types::PriorityTier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 历史开票记录（一行 = 一张发票）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BilledOrderRecord {
    pub client: String,
    pub invoice_date: Option<NaiveDate>,
    pub liters: f64,
}

/// 取消订单记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub client: String,
    pub cancelled_on: Option<NaiveDate>,
}

/// 客户分级结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientPriority {
    pub client_key: String,  // 归一化客户键
    pub client: String,      // 首次出现的原始名称
    pub billed_liters: f64,
    pub cancellations: u32,
    pub tier: PriorityTier,
}
