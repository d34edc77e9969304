// ==========================================
// 散装液体配送排产系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等 (CREATE TABLE IF NOT EXISTS)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：foreign_keys / busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS schedule_run (
            run_id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            window_start TEXT NOT NULL,
            window_end TEXT NOT NULL,
            fragment_count INTEGER NOT NULL,
            resolved_count INTEGER NOT NULL,
            unresolved_count INTEGER NOT NULL,
            rejected_order_count INTEGER NOT NULL,
            owned_volume INTEGER NOT NULL,
            rented_volume INTEGER NOT NULL,
            total_rented_trucks INTEGER NOT NULL,
            total_profit REAL NOT NULL,
            total_adjusted_profit REAL NOT NULL,
            first_day TEXT,
            last_day TEXT,
            spillover_count INTEGER NOT NULL,
            config_snapshot_json TEXT
        );

        CREATE TABLE IF NOT EXISTS schedule_fragment (
            run_id TEXT NOT NULL REFERENCES schedule_run(run_id) ON DELETE CASCADE,
            fragment_id TEXT NOT NULL,
            parent_order_id TEXT NOT NULL,
            client TEXT NOT NULL,
            order_date TEXT NOT NULL,
            deadline_date TEXT,
            priority_tier INTEGER NOT NULL,
            strategic_weight INTEGER NOT NULL,
            volume INTEGER NOT NULL,
            profit_value REAL NOT NULL,
            assigned_date TEXT NOT NULL,
            assignment TEXT NOT NULL,
            rented_volume INTEGER NOT NULL,
            adjusted_profit REAL NOT NULL,
            PRIMARY KEY (run_id, fragment_id)
        );

        CREATE INDEX IF NOT EXISTS idx_schedule_fragment_date
            ON schedule_fragment(run_id, assigned_date);

        CREATE TABLE IF NOT EXISTS schedule_daily_rental (
            run_id TEXT NOT NULL REFERENCES schedule_run(run_id) ON DELETE CASCADE,
            plan_date TEXT NOT NULL,
            owned_volume INTEGER NOT NULL,
            owned_fragments INTEGER NOT NULL,
            rented_volume INTEGER NOT NULL,
            rented_fragments INTEGER NOT NULL,
            rented_truck_count INTEGER NOT NULL,
            PRIMARY KEY (run_id, plan_date)
        );

        CREATE TABLE IF NOT EXISTS schedule_unresolved (
            run_id TEXT NOT NULL REFERENCES schedule_run(run_id) ON DELETE CASCADE,
            fragment_id TEXT NOT NULL,
            parent_order_id TEXT NOT NULL,
            client TEXT NOT NULL,
            earliest_ship_date TEXT NOT NULL,
            deadline_date TEXT,
            volume INTEGER NOT NULL,
            reason TEXT NOT NULL,
            PRIMARY KEY (run_id, fragment_id)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径
///
/// 优先级: 环境变量 BULK_LIQUID_APS_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("BULK_LIQUID_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./bulk_liquid_aps.db");

    if let Some(data_dir) = dirs::data_dir() {
        let app_dir = data_dir.join("bulk-liquid-aps");
        if std::fs::create_dir_all(&app_dir).is_ok() {
            path = app_dir.join("bulk_liquid_aps.db");
        }
    }

    path.to_string_lossy().to_string()
}
