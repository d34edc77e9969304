// ==========================================
// 散装液体配送排产系统 - 导出层
// ==========================================
// 职责: 将排产结果写出为 CSV / JSON 文件
// ==========================================

pub mod csv_exporter;
pub mod error;
pub mod truck_detail;

pub use csv_exporter::CsvScheduleExporter;
pub use error::{ExportError, ExportResult};
pub use truck_detail::{build_truck_detail, TruckAssignment, TruckFleet};
