// ==========================================
// 散装液体配送排产系统 - 客户历史数据加载
// ==========================================
// 职责: 读取历史开票表、取消订单表与客户等级表
// 支持: CSV / Excel（按扩展名选择解析器）
// 红线: 单行无法解析只跳过并告警，缺少关键列才返回 Err
// ==========================================

use crate::domain::client::{BilledOrderRecord, CancellationRecord};
use crate::domain::types::PriorityTier;
use crate::engine::priority::{PriorityClassifier, PriorityMap, QuarterlyVolumes, TierResolver};
use crate::importer::data_cleaner::OrderDataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::OrderFieldMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::order_importer_trait::{DataCleaner, FileParser};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const HISTORY_CLIENT_ALIASES: &[&str] = &["CLIENTE"];
pub const INVOICE_DATE_ALIASES: &[&str] = &["FECHA FACTURA VENTA", "FECHA DE PEDIDO"];
pub const BILLED_LITERS_ALIASES: &[&str] = &["LITROS REALES", "LITROS"];
pub const CANCELLED_ON_ALIASES: &[&str] = &["FECHA_FAC", "FECHA"];
pub const TIER_ALIASES: &[&str] = &["PRIORIDAD"];

/// 客户等级数据来源（均可缺省）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierSources {
    /// 历史开票表
    pub billed: Option<PathBuf>,
    /// 取消订单表
    pub cancellations: Option<PathBuf>,
    /// 现成的客户等级表，条目覆盖由历史推导的等级
    pub priorities: Option<PathBuf>,
}

impl TierSources {
    pub fn has_history(&self) -> bool {
        self.billed.is_some() || self.cancellations.is_some()
    }
}

pub struct HistoryLoader {
    parser: Box<dyn FileParser>,
    mapper: OrderFieldMapper,
    cleaner: OrderDataCleaner,
}

impl HistoryLoader {
    pub fn new() -> Self {
        Self {
            parser: Box::new(UniversalFileParser),
            mapper: OrderFieldMapper::new(),
            cleaner: OrderDataCleaner,
        }
    }

    /// 读取历史开票记录
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_billed<P: AsRef<Path>>(&self, path: P) -> ImportResult<Vec<BilledOrderRecord>> {
        let rows = self.parser.parse_to_raw_records(path.as_ref())?;
        require_column(&rows, HISTORY_CLIENT_ALIASES)?;
        require_column(&rows, BILLED_LITERS_ALIASES)?;

        let mut records = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            let Some(client) = self.mapper.get_string(row, HISTORY_CLIENT_ALIASES) else {
                continue;
            };
            let liters = self
                .mapper
                .get_string(row, BILLED_LITERS_ALIASES)
                .and_then(|raw| self.cleaner.clean_number(&raw))
                .and_then(|raw| raw.parse::<f64>().ok());
            let Some(liters) = liters else {
                warn!(row_number = idx + 2, client = %client, "开票升数无法解析，跳过");
                continue;
            };
            let invoice_date = self
                .mapper
                .get_string(row, INVOICE_DATE_ALIASES)
                .and_then(|raw| self.cleaner.parse_date(&raw));

            records.push(BilledOrderRecord {
                client,
                invoice_date,
                liters,
            });
        }

        info!(rows = rows.len(), loaded = records.len(), "历史开票记录加载完成");
        Ok(records)
    }

    /// 读取取消订单记录
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_cancellations<P: AsRef<Path>>(&self, path: P) -> ImportResult<Vec<CancellationRecord>> {
        let rows = self.parser.parse_to_raw_records(path.as_ref())?;
        require_column(&rows, HISTORY_CLIENT_ALIASES)?;

        let records: Vec<CancellationRecord> = rows
            .iter()
            .filter_map(|row| {
                let client = self.mapper.get_string(row, HISTORY_CLIENT_ALIASES)?;
                let cancelled_on = self
                    .mapper
                    .get_string(row, CANCELLED_ON_ALIASES)
                    .and_then(|raw| self.cleaner.parse_date(&raw));
                Some(CancellationRecord {
                    client,
                    cancelled_on,
                })
            })
            .collect();

        info!(rows = rows.len(), loaded = records.len(), "取消订单记录加载完成");
        Ok(records)
    }

    /// 读取客户等级表（CLIENTE, Prioridad）
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_priorities<P: AsRef<Path>>(&self, path: P) -> ImportResult<PriorityMap> {
        let rows = self.parser.parse_to_raw_records(path.as_ref())?;
        require_column(&rows, HISTORY_CLIENT_ALIASES)?;
        require_column(&rows, TIER_ALIASES)?;

        let mut map = PriorityMap::new();
        for (idx, row) in rows.iter().enumerate() {
            let Some(client) = self.mapper.get_string(row, HISTORY_CLIENT_ALIASES) else {
                continue;
            };
            let tier = self
                .mapper
                .get_string(row, TIER_ALIASES)
                .and_then(|raw| raw.parse::<f64>().ok())
                .filter(|n| n.fract() == 0.0)
                .and_then(|n| PriorityTier::from_number(n as i64));
            match tier {
                Some(tier) => map.insert(&client, tier),
                None => warn!(row_number = idx + 2, client = %client, "客户等级无效，跳过"),
            }
        }

        info!(clients = map.len(), "客户等级表加载完成");
        Ok(map)
    }
}

impl HistoryLoader {
    /// 组合各来源得到订单等级解析器
    ///
    /// - 有历史文件: 开票量 + 取消次数 → 历史等级，订单再按上一季度开票量升级
    /// - 有等级表: 表中条目覆盖历史等级
    /// - 都没有: 空解析器（缺失等级一律按 2）
    pub fn build_tier_resolver(&self, sources: &TierSources) -> ImportResult<TierResolver> {
        let explicit = match &sources.priorities {
            Some(path) => Some(self.load_priorities(path)?),
            None => None,
        };

        if !sources.has_history() {
            return Ok(TierResolver::from_map(explicit.unwrap_or_default()));
        }

        let billed = match &sources.billed {
            Some(path) => self.load_billed(path)?,
            None => Vec::new(),
        };
        let cancellations = match &sources.cancellations {
            Some(path) => self.load_cancellations(path)?,
            None => Vec::new(),
        };

        let classifier = PriorityClassifier::new();
        let mut historical = PriorityMap::from_priorities(&classifier.classify(&billed, &cancellations, None));
        if let Some(explicit) = explicit {
            historical.merge(explicit);
        }

        info!(
            clients = historical.len(),
            billed = billed.len(),
            cancellations = cancellations.len(),
            "客户等级解析器构建完成"
        );
        Ok(TierResolver::with_quarterly(
            historical,
            classifier,
            QuarterlyVolumes::from_records(&billed),
        ))
    }
}

impl Default for HistoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// 非空文件必须至少包含一个别名列
fn require_column(rows: &[HashMap<String, String>], aliases: &[&str]) -> ImportResult<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let present = first
        .keys()
        .any(|header| aliases.iter().any(|alias| header.trim().eq_ignore_ascii_case(alias)));
    if present {
        Ok(())
    } else {
        Err(ImportError::MissingColumn(aliases.join(" / ")))
    }
}
