// ==========================================
// 散装液体配送排产系统 - 字段映射器实现
// ==========================================
// 职责: 源列名 → 标准字段映射 + 类型转换
// 列名匹配不区分大小写，支持别名
// ==========================================

use crate::domain::order::RawOrderRecord;
use crate::importer::data_cleaner::OrderDataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::order_importer_trait::{DataCleaner, FieldMapper};
use chrono::NaiveDate;
use std::collections::HashMap;

// 标准字段 → 别名列表
pub const ORDER_ID_ALIASES: &[&str] = &["ID", "IDPEDIDO", "PEDIDO"];
pub const CLIENT_ALIASES: &[&str] = &["CLIENTE"];
pub const ORDER_DATE_ALIASES: &[&str] = &["FECHA", "FECHA DE PEDIDO"];
pub const VOLUME_ALIASES: &[&str] = &["LITROS", "LITROS REALES"];
pub const PROFIT_ALIASES: &[&str] = &["UTILIDAD", "GANANCIA"];
pub const PRIORITY_ALIASES: &[&str] = &["PRIORIDAD"];
pub const DEADLINE_ALIASES: &[&str] = &["FECHA ENTREGA", "FECHA_ENTREGA"];

pub struct OrderFieldMapper {
    cleaner: OrderDataCleaner,
}

impl OrderFieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: OrderDataCleaner,
        }
    }

    /// 按别名提取非空字符串（列名不区分大小写）
    pub fn get_string(&self, row: &HashMap<String, String>, aliases: &[&str]) -> Option<String> {
        for alias in aliases {
            let found = row
                .iter()
                .find(|(header, _)| header.trim().eq_ignore_ascii_case(alias))
                .map(|(_, value)| value.clone());
            if let Some(value) = self.cleaner.normalize_null(found) {
                return Some(value);
            }
        }
        None
    }

    fn parse_f64(
        &self,
        row: &HashMap<String, String>,
        aliases: &[&str],
        row_number: usize,
    ) -> ImportResult<Option<f64>> {
        let Some(raw) = self.get_string(row, aliases) else {
            return Ok(None);
        };
        let field = aliases[0].to_string();
        let cleaned = self
            .cleaner
            .clean_number(&raw)
            .ok_or_else(|| ImportError::TypeConversionError {
                row: row_number,
                field: field.clone(),
                message: format!("无法解析为数值: {}", raw),
            })?;
        cleaned
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ImportError::TypeConversionError {
                row: row_number,
                field,
                message: format!("无法解析为数值: {}", raw),
            })
    }

    fn parse_i64(
        &self,
        row: &HashMap<String, String>,
        aliases: &[&str],
        row_number: usize,
    ) -> ImportResult<Option<i64>> {
        match self.parse_f64(row, aliases, row_number)? {
            None => Ok(None),
            Some(value) if value.fract() == 0.0 => Ok(Some(value as i64)),
            Some(value) => Err(ImportError::TypeConversionError {
                row: row_number,
                field: aliases[0].to_string(),
                message: format!("期望整数: {}", value),
            }),
        }
    }

    fn parse_date(
        &self,
        row: &HashMap<String, String>,
        aliases: &[&str],
        row_number: usize,
    ) -> ImportResult<Option<NaiveDate>> {
        match self.get_string(row, aliases) {
            None => Ok(None),
            Some(value) => self
                .cleaner
                .parse_date(&value)
                .map(Some)
                .ok_or_else(|| ImportError::DateFormatError {
                    row: row_number,
                    field: aliases[0].to_string(),
                    value,
                }),
        }
    }
}

impl Default for OrderFieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapper for OrderFieldMapper {
    fn map_to_raw_order(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<RawOrderRecord> {
        Ok(RawOrderRecord {
            order_id: self.get_string(row, ORDER_ID_ALIASES),
            client: self
                .get_string(row, CLIENT_ALIASES)
                .map(|c| self.cleaner.clean_text(&c, false)),
            order_date: self.parse_date(row, ORDER_DATE_ALIASES, row_number)?,
            deadline_date: self.parse_date(row, DEADLINE_ALIASES, row_number)?,
            volume_liters: self.parse_f64(row, VOLUME_ALIASES, row_number)?,
            profit: self.parse_f64(row, PROFIT_ALIASES, row_number)?,
            priority_tier: self.parse_i64(row, PRIORITY_ALIASES, row_number)?,
            row_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_aliases_and_case_insensitive_headers() {
        let mapper = OrderFieldMapper::new();
        let record = mapper
            .map_to_raw_order(
                &row(&[
                    ("IdPedido", " P-001 "),
                    ("Cliente", "Gasolinera Norte"),
                    ("FECHA DE PEDIDO", "03/01/2024"),
                    ("LITROS REALES", "1,920,000"),
                    ("Ganancia", "$12,500.75"),
                    ("Prioridad", "1"),
                    ("FECHA_ENTREGA", "2024-01-20"),
                ]),
                2,
            )
            .unwrap();

        assert_eq!(record.order_id.as_deref(), Some("P-001"));
        assert_eq!(record.client.as_deref(), Some("Gasolinera Norte"));
        assert_eq!(record.order_date, NaiveDate::from_ymd_opt(2024, 1, 3));
        assert_eq!(record.deadline_date, NaiveDate::from_ymd_opt(2024, 1, 20));
        assert_eq!(record.volume_liters, Some(1_920_000.0));
        assert_eq!(record.profit, Some(12_500.75));
        assert_eq!(record.priority_tier, Some(1));
        assert_eq!(record.row_number, 2);
    }

    #[test]
    fn test_empty_cells_become_none() {
        let mapper = OrderFieldMapper::new();
        let record = mapper
            .map_to_raw_order(&row(&[("ID", "P1"), ("UTILIDAD", ""), ("PRIORIDAD", " ")]), 1)
            .unwrap();
        assert_eq!(record.profit, None);
        assert_eq!(record.priority_tier, None);
        assert_eq!(record.client, None);
    }

    #[test]
    fn test_unparseable_values_are_row_errors() {
        let mapper = OrderFieldMapper::new();
        let bad_date = mapper.map_to_raw_order(&row(&[("ID", "P1"), ("FECHA", "ayer")]), 7);
        assert!(matches!(bad_date, Err(ImportError::DateFormatError { row: 7, .. })));

        let bad_volume = mapper.map_to_raw_order(&row(&[("ID", "P1"), ("LITROS", "mucho")]), 8);
        assert!(matches!(bad_volume, Err(ImportError::TypeConversionError { row: 8, .. })));

        let fractional_tier = mapper.map_to_raw_order(&row(&[("ID", "P1"), ("PRIORIDAD", "1.5")]), 9);
        assert!(fractional_tier.is_err());
    }
}
