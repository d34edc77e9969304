// ==========================================
// 散装液体配送排产系统 - 导入层
// ==========================================
// 职责: 外部数据导入，生成已校验订单与客户历史
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod history;
pub mod order_importer_impl;
pub mod order_importer_trait;

// 重导出核心类型
pub use data_cleaner::OrderDataCleaner;
pub use dq_validator::OrderDqValidator;
pub use error::{ImportError, ImportResult};
pub use field_mapper::OrderFieldMapper;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use history::{HistoryLoader, TierSources};
pub use order_importer_impl::OrderImporterImpl;

// 重导出 Trait 接口
pub use order_importer_trait::{
    DataCleaner, DqContext, DqValidator, FieldMapper, FileParser, OrderImporter,
};
