// ==========================================
// 散装液体配送排产系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / UPPER / NULL 标准化 / 数值清洗 / 多格式日期解析
// ==========================================

use crate::importer::order_importer_trait::DataCleaner;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// 支持的日期格式（按顺序尝试）
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"];

// Excel 日期序列号上限 (9999-12-31)
const EXCEL_SERIAL_MAX: f64 = 2_958_465.0;

pub struct OrderDataCleaner;

impl DataCleaner for OrderDataCleaner {
    fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("nan")
                || trimmed.eq_ignore_ascii_case("null")
            {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn clean_number(&self, value: &str) -> Option<String> {
        let cleaned: String = value
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    fn parse_date(&self, value: &str) -> Option<NaiveDate> {
        let value = value.trim();

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(value, format) {
                return Some(date);
            }
        }
        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Some(dt.date());
            }
        }

        // Excel 日期序列号
        let serial = value.parse::<f64>().ok()?;
        if !(1.0..=EXCEL_SERIAL_MAX).contains(&serial) {
            return None;
        }
        NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.trunc() as i64))
    }
}
