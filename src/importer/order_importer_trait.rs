// ==========================================
// 散装液体配送排产系统 - 订单导入 Trait
// ==========================================
// 职责: 定义订单导入接口（不包含实现）
// 管道: 解析 → 映射 → 清洗 → DQ 校验 → Order
// ==========================================

use crate::domain::order::{DqViolation, Order, OrderImportResult, RawOrderRecord};
use crate::importer::error::ImportResult;
use crate::engine::priority::{PriorityMap, TierResolver};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// OrderImporter Trait
// ==========================================
// 用途: 订单导入主接口
// 实现者: OrderImporterImpl
#[async_trait]
pub trait OrderImporter: Send + Sync {
    /// 从 Excel 文件导入订单
    ///
    /// # 返回
    /// - Ok(OrderImportResult): 通过校验的订单 + DQ 报告
    /// - Err: 文件级错误（不存在、格式不支持、无法解析）
    async fn import_from_excel<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> ImportResult<OrderImportResult>;

    /// 从 CSV 文件导入订单
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> ImportResult<OrderImportResult>;

    /// 批量导入多个文件（并发执行）
    ///
    /// # 说明
    /// - 每个文件的导入是独立的，某个文件失败不影响其他文件
    /// - 返回顺序与输入顺序一致
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<OrderImportResult, String>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<列名, 值>），跳过完全空白的行
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<HashMap<String, String>>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口
// 实现者: OrderFieldMapper
pub trait FieldMapper: Send + Sync {
    /// 将原始行记录映射为 RawOrderRecord
    ///
    /// # 返回
    /// - Err(TypeConversionError / DateFormatError): 该行无法解析
    fn map_to_raw_order(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<RawOrderRecord>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 数据清洗接口
// 实现者: OrderDataCleaner
pub trait DataCleaner: Send + Sync {
    /// TRIM（可选 UPPER）
    fn clean_text(&self, value: &str, uppercase: bool) -> String;

    /// 标准化 NULL 值（空字符串/空白/"NAN"/"NULL" → None）
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 数值清洗: 仅保留数字、'.' 与 '-'，空串 → None
    fn clean_number(&self, value: &str) -> Option<String>;

    /// 多格式日期解析
    fn parse_date(&self, value: &str) -> Option<NaiveDate>;
}

/// DQ 校验上下文
#[derive(Debug, Clone, Default)]
pub struct DqContext {
    /// 订单缺失等级时的解析器
    pub tiers: TierResolver,
    /// 下单日允许区间 [from, to]（含两端）；None 表示不限
    pub order_window: Option<(NaiveDate, NaiveDate)>,
}

impl DqContext {
    pub fn new(tiers: TierResolver) -> Self {
        Self {
            tiers,
            order_window: None,
        }
    }
}

impl From<PriorityMap> for DqContext {
    fn from(priorities: PriorityMap) -> Self {
        Self::new(TierResolver::from_map(priorities))
    }
}

// ==========================================
// DqValidator Trait
// ==========================================
// 用途: 数据质量校验接口
// 实现者: OrderDqValidator
pub trait DqValidator: Send + Sync {
    /// 校验记录并生成订单
    ///
    /// # 参数
    /// - records: 映射后的原始记录
    /// - context: 等级解析器 + 下单日区间
    ///
    /// # 返回
    /// (通过校验的订单, 违规列表)
    fn validate(
        &self,
        records: &[RawOrderRecord],
        context: &DqContext,
    ) -> (Vec<Order>, Vec<DqViolation>);
}
