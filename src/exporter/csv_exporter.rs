// ==========================================
// 散装液体配送排产系统 - CSV 排产结果导出
// ==========================================
// 输出文件（<start>/<end> 为排产窗口，YYYY-MM-DD）:
// - schedule_<start>_to_<end>.csv       已分配片段
// - unresolved_<start>_to_<end>.csv     未解决片段
// - daily_rentals_<start>_to_<end>.csv  日租赁汇总
// - day_detail_<date>.csv               单日明细（按需）
// - truck_detail_<start>_to_<end>.csv   罐车编号明细
// - run_summary_<start>_to_<end>.json   运行汇总 + 利润对比
// ==========================================

use crate::domain::schedule::{
    DailyRentalSummary, ResolvedFragmentRecord, RunSummary, ScheduleOutcome, UnresolvedFragment,
};
use crate::engine::profit_summary::ProfitComparisonRow;
use crate::exporter::error::{ExportError, ExportResult};
use crate::exporter::truck_detail::{build_truck_detail, TruckAssignment, TruckFleet};
use chrono::NaiveDate;
use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

const SCHEDULE_HEADER: &[&str] = &[
    "id",
    "parent_order_id",
    "client",
    "order_date",
    "deadline_date",
    "priority_tier",
    "strategic_weight",
    "volume",
    "profit_value",
    "assigned_date",
    "assignment",
    "rented_volume",
    "adjusted_profit",
];

const UNRESOLVED_HEADER: &[&str] = &[
    "id",
    "parent_order_id",
    "client",
    "earliest_ship_date",
    "deadline_date",
    "volume",
    "reason",
];

const DAILY_HEADER: &[&str] = &[
    "date",
    "owned_volume",
    "owned_fragments",
    "rented_volume",
    "rented_fragments",
    "rented_truck_count",
];

const TRUCK_HEADER: &[&str] = &[
    "assigned_date",
    "fragment_id",
    "client",
    "priority_tier",
    "assignment",
    "truck_id",
    "truck_liters",
    "rented_volume",
    "adjusted_profit",
];

fn optional_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn schedule_row(record: &ResolvedFragmentRecord) -> Vec<String> {
    vec![
        record.id.clone(),
        record.parent_order_id.clone(),
        record.client.clone(),
        record.order_date.to_string(),
        optional_date(record.deadline_date),
        record.priority_tier.as_u8().to_string(),
        record.strategic_weight.to_string(),
        record.volume.to_string(),
        format!("{:.2}", record.profit_value),
        record.assigned_date.to_string(),
        record.assignment.to_string(),
        record.rented_volume.to_string(),
        format!("{:.2}", record.adjusted_profit),
    ]
}

fn unresolved_row(fragment: &UnresolvedFragment) -> Vec<String> {
    vec![
        fragment.id.clone(),
        fragment.parent_order_id.clone(),
        fragment.client.clone(),
        fragment.earliest_ship_date.to_string(),
        optional_date(fragment.deadline_date),
        fragment.volume.to_string(),
        fragment.reason.clone(),
    ]
}

fn daily_row(day: &DailyRentalSummary) -> Vec<String> {
    vec![
        day.date.to_string(),
        day.owned_volume.to_string(),
        day.owned_fragments.to_string(),
        day.rented_volume.to_string(),
        day.rented_fragments.to_string(),
        day.rented_truck_count.to_string(),
    ]
}

fn truck_row(truck: &TruckAssignment) -> Vec<String> {
    vec![
        truck.assigned_date.to_string(),
        truck.fragment_id.clone(),
        truck.client.clone(),
        truck.priority_tier.as_u8().to_string(),
        truck.assignment.to_string(),
        truck.truck_id.clone(),
        truck.truck_liters.to_string(),
        truck.rented_volume.to_string(),
        format!("{:.2}", truck.adjusted_profit),
    ]
}

#[derive(Serialize)]
struct RunSummaryDocument<'a> {
    app_version: &'a str,
    summary: &'a RunSummary,
    rejected_orders: usize,
    profit_comparison: &'a [ProfitComparisonRow],
}

// ==========================================
// CsvScheduleExporter - 排产结果文件导出
// ==========================================
pub struct CsvScheduleExporter {
    out_dir: PathBuf,
}

impl CsvScheduleExporter {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn ensure_out_dir(&self) -> ExportResult<()> {
        fs::create_dir_all(&self.out_dir)
            .map_err(|e| ExportError::OutputDirError(format!("{}: {}", self.out_dir.display(), e)))
    }

    fn window_suffix(summary: &RunSummary) -> String {
        format!("{}_to_{}", summary.window_start, summary.window_end)
    }

    fn write_csv<T>(
        &self,
        file_name: &str,
        header: &[&str],
        rows: &[T],
        to_row: impl Fn(&T) -> Vec<String>,
    ) -> ExportResult<PathBuf> {
        self.ensure_out_dir()?;
        let path = self.out_dir.join(file_name);

        let file = File::create(&path)?;
        let mut wtr = Writer::from_writer(file);
        wtr.write_record(header)?;
        for row in rows {
            wtr.write_record(&to_row(row))?;
        }
        wtr.flush()?;

        info!(path = %path.display(), rows = rows.len(), "CSV 文件已写出");
        Ok(path)
    }

    /// 已分配片段（按分配日、片段ID排序）
    pub fn export_schedule(&self, outcome: &ScheduleOutcome) -> ExportResult<PathBuf> {
        let mut records: Vec<&ResolvedFragmentRecord> = outcome.resolved.iter().collect();
        records.sort_by(|a, b| a.assigned_date.cmp(&b.assigned_date).then_with(|| a.id.cmp(&b.id)));

        self.write_csv(
            &format!("schedule_{}.csv", Self::window_suffix(&outcome.summary)),
            SCHEDULE_HEADER,
            &records,
            |record| schedule_row(record),
        )
    }

    pub fn export_unresolved(&self, outcome: &ScheduleOutcome) -> ExportResult<PathBuf> {
        self.write_csv(
            &format!("unresolved_{}.csv", Self::window_suffix(&outcome.summary)),
            UNRESOLVED_HEADER,
            &outcome.unresolved,
            unresolved_row,
        )
    }

    pub fn export_daily_rentals(&self, outcome: &ScheduleOutcome) -> ExportResult<PathBuf> {
        self.write_csv(
            &format!("daily_rentals_{}.csv", Self::window_suffix(&outcome.summary)),
            DAILY_HEADER,
            &outcome.daily,
            daily_row,
        )
    }

    /// 单日明细；该日无分配时写出仅含表头的文件
    pub fn export_day_detail(&self, outcome: &ScheduleOutcome, date: NaiveDate) -> ExportResult<PathBuf> {
        let mut records = outcome.records_on(date);
        records.sort_by(|a, b| a.id.cmp(&b.id));

        self.write_csv(
            &format!("day_detail_{}.csv", date),
            SCHEDULE_HEADER,
            &records,
            |record| schedule_row(record),
        )
    }

    /// 罐车编号明细
    pub fn export_truck_detail(&self, outcome: &ScheduleOutcome, fleet: &TruckFleet) -> ExportResult<PathBuf> {
        let detail = build_truck_detail(&outcome.resolved, fleet);
        self.write_csv(
            &format!("truck_detail_{}.csv", Self::window_suffix(&outcome.summary)),
            TRUCK_HEADER,
            &detail,
            truck_row,
        )
    }

    pub fn export_run_summary(
        &self,
        outcome: &ScheduleOutcome,
        profit_comparison: &[ProfitComparisonRow],
    ) -> ExportResult<PathBuf> {
        self.ensure_out_dir()?;
        let path = self
            .out_dir
            .join(format!("run_summary_{}.json", Self::window_suffix(&outcome.summary)));

        let document = RunSummaryDocument {
            app_version: crate::VERSION,
            summary: &outcome.summary,
            rejected_orders: outcome.rejected_orders.len(),
            profit_comparison,
        };
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, &document)?;

        info!(path = %path.display(), "运行汇总已写出");
        Ok(path)
    }

    /// 写出全部标准文件（不含单日明细）
    #[instrument(skip(self, outcome, profit_comparison), fields(out_dir = %self.out_dir.display()))]
    pub fn export_all(
        &self,
        outcome: &ScheduleOutcome,
        profit_comparison: &[ProfitComparisonRow],
    ) -> ExportResult<Vec<PathBuf>> {
        Ok(vec![
            self.export_schedule(outcome)?,
            self.export_unresolved(outcome)?,
            self.export_daily_rentals(outcome)?,
            self.export_run_summary(outcome, profit_comparison)?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AssignmentKind, PriorityTier};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: &str, assigned: NaiveDate) -> ResolvedFragmentRecord {
        ResolvedFragmentRecord {
            id: id.to_string(),
            parent_order_id: id.split('-').next().unwrap().to_string(),
            client: "Fletes Sur".to_string(),
            order_date: date(2024, 1, 1),
            deadline_date: None,
            priority_tier: PriorityTier::Tier2,
            strategic_weight: 2,
            volume: 1_000,
            profit_value: 100.0,
            assigned_date: assigned,
            assignment: AssignmentKind::Own,
            rented_volume: 0,
            adjusted_profit: 100.0,
        }
    }

    fn outcome() -> ScheduleOutcome {
        let start = date(2024, 1, 6);
        ScheduleOutcome {
            resolved: vec![record("B-1", start), record("A-1", date(2024, 1, 7)), record("A-2", start)],
            daily: vec![],
            unresolved: vec![],
            rejected_orders: vec![],
            summary: RunSummary {
                window_start: start,
                window_end: date(2024, 1, 12),
                fragment_count: 3,
                resolved_count: 3,
                unresolved_count: 0,
                rejected_order_count: 0,
                owned_volume: 3_000,
                rented_volume: 0,
                total_rented_trucks: 0,
                total_profit: 300.0,
                total_adjusted_profit: 300.0,
                first_day: Some(start),
                last_day: Some(date(2024, 1, 7)),
                spillover_count: 0,
            },
        }
    }

    #[test]
    fn test_export_all_writes_window_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvScheduleExporter::new(dir.path().join("out"));

        let paths = exporter.export_all(&outcome(), &[]).unwrap();

        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "schedule_2024-01-06_to_2024-01-12.csv",
                "unresolved_2024-01-06_to_2024-01-12.csv",
                "daily_rentals_2024-01-06_to_2024-01-12.csv",
                "run_summary_2024-01-06_to_2024-01-12.json",
            ]
        );
        assert!(paths.iter().all(|p| p.exists()));

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths[3]).unwrap()).unwrap();
        assert_eq!(summary["summary"]["fragment_count"], 3);
    }

    #[test]
    fn test_schedule_rows_sorted_by_date_then_id() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvScheduleExporter::new(dir.path());

        let path = exporter.export_schedule(&outcome()).unwrap();
        let mut reader = csv::Reader::from_path(path).unwrap();
        let ids: Vec<String> = reader
            .records()
            .map(|r| r.unwrap().get(0).unwrap().to_string())
            .collect();

        assert_eq!(ids, vec!["A-2", "B-1", "A-1"]);
    }

    #[test]
    fn test_day_detail_only_contains_that_day() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvScheduleExporter::new(dir.path());

        let path = exporter.export_day_detail(&outcome(), date(2024, 1, 7)).unwrap();
        assert!(path.ends_with("day_detail_2024-01-07.csv"));

        let mut reader = csv::Reader::from_path(path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some("A-1"));
        assert_eq!(rows[0].get(10), Some("OWN"));
    }

    #[test]
    fn test_truck_detail_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvScheduleExporter::new(dir.path());

        let path = exporter
            .export_truck_detail(&outcome(), &TruckFleet::new(30_000, 30, 64_000))
            .unwrap();
        assert!(path.ends_with("truck_detail_2024-01-06_to_2024-01-12.csv"));

        let mut reader = csv::Reader::from_path(path).unwrap();
        let rows: Vec<(String, String)> = reader
            .records()
            .map(|r| {
                let r = r.unwrap();
                (r.get(1).unwrap().to_string(), r.get(5).unwrap().to_string())
            })
            .collect();
        // 每车 1,000 升: 01-06 的 A-2、B-1 分装两车，01-07 重新编号
        assert_eq!(
            rows,
            vec![
                ("A-2".to_string(), "PIP01".to_string()),
                ("B-1".to_string(), "PIP02".to_string()),
                ("A-1".to_string(), "PIP01".to_string()),
            ]
        );
    }
}
