// ==========================================
// 散装液体配送排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::config_reader::SchedulingConfigReader;
use crate::config::error::{ConfigError, ConfigResult};
use crate::config::scheduling_config::SchedulingConfig;
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::types::StrategicWeights;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 与建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        debug!(key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 读取并解析配置值，缺失时返回默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => parse_value(key, &raw),
        }
    }

    /// 读取必填日期配置
    fn get_required_date(&self, key: &str) -> ConfigResult<NaiveDate> {
        let raw = self
            .get_config_value(key)?
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            message: e.to_string(),
        })
    }

    /// 从 config_kv 组装排产配置
    pub fn load_scheduling_config(&self) -> ConfigResult<SchedulingConfig> {
        let window_start = self.get_required_date(config_keys::WINDOW_START)?;
        let window_end = self.get_required_date(config_keys::WINDOW_END)?;
        let defaults = SchedulingConfig::with_window(window_start, window_end);
        let default_weights = StrategicWeights::default();

        Ok(SchedulingConfig {
            owned_daily_capacity: self
                .get_parsed_or(config_keys::OWNED_DAILY_CAPACITY, defaults.owned_daily_capacity)?,
            rented_truck_capacity: self
                .get_parsed_or(config_keys::RENTED_TRUCK_CAPACITY, defaults.rented_truck_capacity)?,
            rent_penalty_rate: self
                .get_parsed_or(config_keys::RENT_PENALTY_RATE, defaults.rent_penalty_rate)?,
            max_wait_days: self.get_parsed_or(config_keys::MAX_WAIT_DAYS, defaults.max_wait_days)?,
            lead_time_days: self.get_parsed_or(config_keys::LEAD_TIME_DAYS, defaults.lead_time_days)?,
            strategic_weights: StrategicWeights {
                tier1: self.get_parsed_or(config_keys::WEIGHT_TIER1, default_weights.tier1)?,
                tier2: self.get_parsed_or(config_keys::WEIGHT_TIER2, default_weights.tier2)?,
                tier3: self.get_parsed_or(config_keys::WEIGHT_TIER3, default_weights.tier3)?,
            },
            window_start,
            window_end,
            max_simulation_days: self
                .get_parsed_or(config_keys::MAX_SIMULATION_DAYS, defaults.max_simulation_days)?,
        })
    }

    /// 将完整排产配置写入 config_kv
    pub fn save_scheduling_config(&self, config: &SchedulingConfig) -> ConfigResult<()> {
        let entries = [
            (config_keys::OWNED_DAILY_CAPACITY, config.owned_daily_capacity.to_string()),
            (config_keys::RENTED_TRUCK_CAPACITY, config.rented_truck_capacity.to_string()),
            (config_keys::RENT_PENALTY_RATE, config.rent_penalty_rate.to_string()),
            (config_keys::MAX_WAIT_DAYS, config.max_wait_days.to_string()),
            (config_keys::LEAD_TIME_DAYS, config.lead_time_days.to_string()),
            (config_keys::WEIGHT_TIER1, config.strategic_weights.tier1.to_string()),
            (config_keys::WEIGHT_TIER2, config.strategic_weights.tier2.to_string()),
            (config_keys::WEIGHT_TIER3, config.strategic_weights.tier3.to_string()),
            (config_keys::WINDOW_START, config.window_start.format("%Y-%m-%d").to_string()),
            (config_keys::WINDOW_END, config.window_end.format("%Y-%m-%d").to_string()),
            (config_keys::MAX_SIMULATION_DAYS, config.max_simulation_days.to_string()),
        ];

        for (key, value) in entries.iter() {
            self.set_config_value(key, value)?;
        }
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON，按 key 排序）
    ///
    /// # 用途
    /// - 随排产运行落库，保证结果可复现
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl SchedulingConfigReader for ConfigManager {
    async fn get_scheduling_config(&self) -> ConfigResult<SchedulingConfig> {
        self.load_scheduling_config()
    }

    async fn get_config_snapshot(&self) -> ConfigResult<String> {
        ConfigManager::get_config_snapshot(self)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 运力
    pub const OWNED_DAILY_CAPACITY: &str = "owned_daily_capacity";
    pub const RENTED_TRUCK_CAPACITY: &str = "rented_truck_capacity";

    // 罚金
    pub const RENT_PENALTY_RATE: &str = "rent_penalty_rate";

    // 积压
    pub const MAX_WAIT_DAYS: &str = "max_wait_days";
    pub const LEAD_TIME_DAYS: &str = "lead_time_days";

    // 战略权重
    pub const WEIGHT_TIER1: &str = "strategic_weight_tier1";
    pub const WEIGHT_TIER2: &str = "strategic_weight_tier2";
    pub const WEIGHT_TIER3: &str = "strategic_weight_tier3";

    // 排产窗口
    pub const WINDOW_START: &str = "window_start";
    pub const WINDOW_END: &str = "window_end";
    pub const MAX_SIMULATION_DAYS: &str = "max_simulation_days";
}
