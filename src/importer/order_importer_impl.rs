// ==========================================
// 散装液体配送排产系统 - 订单导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到已校验订单
// 流程: 解析 → 映射 → DQ 校验 → 汇总
// 红线: 行级错误只剔除该行，文件级错误才返回 Err
// ==========================================

use crate::domain::order::{DqSummary, DqViolation, OrderImportResult};
use crate::domain::types::DqLevel;
use crate::engine::priority::{PriorityMap, TierResolver};
use crate::importer::dq_validator::OrderDqValidator;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::OrderFieldMapper;
use crate::importer::file_parser::{CsvParser, ExcelParser};
use crate::importer::order_importer_trait::{
    DqContext, DqValidator, FieldMapper, FileParser, OrderImporter,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// OrderImporterImpl - 订单导入器实现
// ==========================================
pub struct OrderImporterImpl {
    csv_parser: Box<dyn FileParser>,
    excel_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    dq_validator: Box<dyn DqValidator>,
    context: DqContext,
}

impl OrderImporterImpl {
    /// 使用默认组件创建导入器
    ///
    /// # 参数
    /// - priorities: 客户等级查找表（订单缺失等级时使用）
    pub fn new(priorities: PriorityMap) -> Self {
        Self::with_components(
            Box::new(CsvParser),
            Box::new(ExcelParser),
            Box::new(OrderFieldMapper::new()),
            Box::new(OrderDqValidator),
            DqContext::from(priorities),
        )
    }

    pub fn with_components(
        csv_parser: Box<dyn FileParser>,
        excel_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
        dq_validator: Box<dyn DqValidator>,
        context: DqContext,
    ) -> Self {
        Self {
            csv_parser,
            excel_parser,
            field_mapper,
            dq_validator,
            context,
        }
    }

    /// 替换等级解析器（客户等级表 + 季度升级）
    pub fn with_tier_resolver(mut self, tiers: TierResolver) -> Self {
        self.context.tiers = tiers;
        self
    }

    /// 只接受下单日落在 [from, to] 内的订单
    pub fn with_order_window(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.context.order_window = Some((from, to));
        self
    }

    /// 导入主流程（CSV / Excel 共用）
    #[instrument(skip(self, parser, file_path), fields(batch_id = tracing::field::Empty))]
    fn run_pipeline(&self, parser: &dyn FileParser, file_path: &Path) -> ImportResult<OrderImportResult> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let source_file = file_path.display().to_string();
        info!(batch_id = %batch_id, file_path = %source_file, "开始导入订单数据");

        // === 步骤 1: 解析文件 ===
        let raw_rows = parser.parse_to_raw_records(file_path).map_err(|e| {
            error!(error = %e, "文件解析失败");
            e
        })?;
        let total_rows = raw_rows.len();
        debug!(total_rows = total_rows, "步骤 1: 文件解析完成");

        // === 步骤 2: 字段映射（行号从 2 开始，第 1 行为表头） ===
        let mut records = Vec::with_capacity(total_rows);
        let mut violations = Vec::new();
        for (idx, row) in raw_rows.iter().enumerate() {
            let row_number = idx + 2;
            match self.field_mapper.map_to_raw_order(row, row_number) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(row_number = row_number, error = %e, "字段映射失败");
                    violations.push(DqViolation::error(
                        row_number,
                        None,
                        e.field().unwrap_or("row"),
                        e.to_string(),
                    ));
                }
            }
        }

        // === 步骤 3: DQ 校验 ===
        let (orders, dq_violations) = self.dq_validator.validate(&records, &self.context);
        violations.extend(dq_violations);

        let summary = summarize(total_rows, orders.len(), &violations);
        let elapsed_time = start_time.elapsed();

        info!(
            batch_id = %batch_id,
            total_rows = summary.total_rows,
            accepted = summary.accepted,
            rejected = summary.rejected,
            warning = summary.warning,
            elapsed_ms = elapsed_time.as_millis() as u64,
            "订单导入完成"
        );

        Ok(OrderImportResult {
            batch_id,
            source_file,
            orders,
            summary,
            violations,
            elapsed_time,
        })
    }
}

/// 汇总 DQ 结果（按行去重）
fn summarize(total_rows: usize, accepted: usize, violations: &[DqViolation]) -> DqSummary {
    let rows_with = |level: DqLevel| -> HashSet<usize> {
        violations
            .iter()
            .filter(|v| v.level == level)
            .map(|v| v.row_number)
            .collect()
    };
    let error_rows: BTreeSet<usize> = rows_with(DqLevel::Error).into_iter().collect();
    let warning_rows = rows_with(DqLevel::Warning)
        .into_iter()
        .filter(|row| !error_rows.contains(row))
        .count();

    DqSummary {
        total_rows,
        accepted,
        rejected: total_rows.saturating_sub(accepted),
        warning: warning_rows,
    }
}

#[async_trait]
impl OrderImporter for OrderImporterImpl {
    async fn import_from_excel<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> ImportResult<OrderImportResult> {
        self.run_pipeline(self.excel_parser.as_ref(), file_path.as_ref())
    }

    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> ImportResult<OrderImportResult> {
        self.run_pipeline(self.csv_parser.as_ref(), file_path.as_ref())
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<OrderImportResult, String>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入文件");

        let import_tasks = file_paths.into_iter().map(|path| async move {
            let path_str = path.as_ref().display().to_string();
            let is_excel = path
                .as_ref()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xls"))
                .unwrap_or(false);

            let result = if is_excel {
                self.import_from_excel(path).await
            } else {
                self.import_from_csv(path).await
            };

            match result {
                Ok(result) => {
                    info!(file = %path_str, accepted = result.summary.accepted, "文件导入成功");
                    Ok(result)
                }
                Err(e) => {
                    error!(file = %path_str, error = %e, "文件导入失败");
                    Err(format!("文件 {} 导入失败: {}", path_str, e))
                }
            }
        });

        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PriorityTier;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[tokio::test]
    async fn test_import_csv_reports_row_level_problems() {
        let file = csv_file(
            "ID,CLIENTE,FECHA,LITROS,UTILIDAD,PRIORIDAD\n\
             P1,Gasolinera Norte,2024-01-03,64000,5000,1\n\
             P2,Fletes Sur,ayer,1000,10,2\n\
             P3,Fletes Sur,2024-01-04,0,10,2\n\
             P4,Fletes Sur,2024-01-04,500.5,,\n",
        );

        let importer = OrderImporterImpl::new(PriorityMap::new());
        let result = importer.import_from_csv(file.path()).await.unwrap();

        assert_eq!(result.summary.total_rows, 4);
        assert_eq!(result.summary.accepted, 2);
        assert_eq!(result.summary.rejected, 2);
        assert_eq!(result.summary.warning, 1);
        assert_eq!(result.orders[1].volume, 501);
        assert_eq!(result.orders[1].priority_tier, PriorityTier::Tier2);
        assert!(Uuid::parse_str(&result.batch_id).is_ok());

        // 第 3 行（P2）日期无法解析
        assert!(result
            .violations
            .iter()
            .any(|v| v.row_number == 3 && v.level == DqLevel::Error));
    }

    #[tokio::test]
    async fn test_batch_import_keeps_going_after_a_failed_file() {
        let good = csv_file("ID,CLIENTE,FECHA,LITROS\nP1,Norte,2024-01-03,10\n");
        let paths = vec![
            good.path().to_path_buf(),
            std::path::PathBuf::from("missing_orders.csv"),
        ];

        let importer = OrderImporterImpl::new(PriorityMap::new());
        let results = importer.batch_import(paths).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[tokio::test]
    async fn test_order_window_filters_backlog_before_start() {
        let file = csv_file(
            "ID,CLIENTE,FECHA,LITROS
             P1,Norte,2023-12-20,10
             P2,Norte,2024-01-03,10
",
        );

        let importer = OrderImporterImpl::new(PriorityMap::new()).with_order_window(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let result = importer.import_from_csv(file.path()).await.unwrap();

        assert_eq!(result.summary.accepted, 1);
        assert_eq!(result.summary.rejected, 1);
        assert_eq!(result.orders[0].order_id, "P2");
    }
}
