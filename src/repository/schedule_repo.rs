// ==========================================
// 散装液体配送排产系统 - 排产结果数据仓储
// ==========================================
// 职责: 持久化一次排产运行（汇总 + 片段 + 日租赁 + 未解决）
// 红线: Repository 不含业务逻辑; 一次运行在单个事务中写入
// ==========================================

use crate::config::SchedulingConfig;
use crate::domain::schedule::{
    DailyRentalSummary, ResolvedFragmentRecord, RunSummary, ScheduleOutcome, ScheduleRun,
    UnresolvedFragment,
};
use crate::domain::types::{AssignmentKind, PriorityTier};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};
use uuid::Uuid;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// ScheduleRepository - 排产结果仓储
// ==========================================
pub struct ScheduleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleRepository {
    /// 创建新的ScheduleRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存一次排产运行
    ///
    /// # 参数
    /// - `outcome`: 排产输出
    /// - `config`: 本次使用的配置（以 JSON 快照保存）
    ///
    /// # 返回
    /// - `Ok(run_id)`: 新生成的运行 ID
    ///
    /// # 红线
    /// - 必须在事务中完成，任一表写入失败则整体回滚
    #[instrument(skip(self, outcome, config), fields(resolved = outcome.resolved.len()))]
    pub fn save_outcome(
        &self,
        outcome: &ScheduleOutcome,
        config: &SchedulingConfig,
    ) -> RepositoryResult<String> {
        let run_id = Uuid::new_v4().to_string();
        let snapshot = serde_json::to_string(config)?;
        let created_at = Utc::now().naive_utc().format(DATETIME_FORMAT).to_string();

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        Self::insert_run_tx(&tx, &run_id, &created_at, &outcome.summary, &snapshot)?;
        Self::insert_fragments_tx(&tx, &run_id, &outcome.resolved)?;
        Self::insert_daily_tx(&tx, &run_id, &outcome.daily)?;
        Self::insert_unresolved_tx(&tx, &run_id, &outcome.unresolved)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(
            run_id = %run_id,
            fragments = outcome.resolved.len(),
            days = outcome.daily.len(),
            unresolved = outcome.unresolved.len(),
            "排产运行已保存"
        );
        Ok(run_id)
    }

    fn insert_run_tx(
        tx: &Transaction,
        run_id: &str,
        created_at: &str,
        summary: &RunSummary,
        snapshot: &str,
    ) -> RepositoryResult<()> {
        tx.execute(
            r#"INSERT INTO schedule_run (
                run_id, created_at, window_start, window_end,
                fragment_count, resolved_count, unresolved_count, rejected_order_count,
                owned_volume, rented_volume, total_rented_trucks,
                total_profit, total_adjusted_profit,
                first_day, last_day, spillover_count, config_snapshot_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                run_id,
                created_at,
                summary.window_start,
                summary.window_end,
                summary.fragment_count as i64,
                summary.resolved_count as i64,
                summary.unresolved_count as i64,
                summary.rejected_order_count as i64,
                summary.owned_volume as i64,
                summary.rented_volume as i64,
                summary.total_rented_trucks as i64,
                summary.total_profit,
                summary.total_adjusted_profit,
                summary.first_day,
                summary.last_day,
                summary.spillover_count as i64,
                snapshot,
            ],
        )?;
        Ok(())
    }

    fn insert_fragments_tx(
        tx: &Transaction,
        run_id: &str,
        records: &[ResolvedFragmentRecord],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"INSERT INTO schedule_fragment (
                run_id, fragment_id, parent_order_id, client, order_date, deadline_date,
                priority_tier, strategic_weight, volume, profit_value,
                assigned_date, assignment, rented_volume, adjusted_profit
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )?;

        for record in records {
            stmt.execute(params![
                run_id,
                &record.id,
                &record.parent_order_id,
                &record.client,
                record.order_date,
                record.deadline_date,
                record.priority_tier.as_u8(),
                record.strategic_weight as i64,
                record.volume as i64,
                record.profit_value,
                record.assigned_date,
                record.assignment.to_string(),
                record.rented_volume as i64,
                record.adjusted_profit,
            ])?;
        }
        Ok(records.len())
    }

    fn insert_daily_tx(
        tx: &Transaction,
        run_id: &str,
        daily: &[DailyRentalSummary],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"INSERT INTO schedule_daily_rental (
                run_id, plan_date, owned_volume, owned_fragments,
                rented_volume, rented_fragments, rented_truck_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )?;

        for day in daily {
            stmt.execute(params![
                run_id,
                day.date,
                day.owned_volume as i64,
                day.owned_fragments as i64,
                day.rented_volume as i64,
                day.rented_fragments as i64,
                day.rented_truck_count as i64,
            ])?;
        }
        Ok(daily.len())
    }

    fn insert_unresolved_tx(
        tx: &Transaction,
        run_id: &str,
        unresolved: &[UnresolvedFragment],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"INSERT INTO schedule_unresolved (
                run_id, fragment_id, parent_order_id, client,
                earliest_ship_date, deadline_date, volume, reason
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )?;

        for fragment in unresolved {
            stmt.execute(params![
                run_id,
                &fragment.id,
                &fragment.parent_order_id,
                &fragment.client,
                fragment.earliest_ship_date,
                fragment.deadline_date,
                fragment.volume as i64,
                &fragment.reason,
            ])?;
        }
        Ok(unresolved.len())
    }

    /// 按run_id查询运行
    ///
    /// # 返回
    /// - `Ok(Some(ScheduleRun))`: 找到
    /// - `Ok(None)`: 未找到
    pub fn find_run(&self, run_id: &str) -> RepositoryResult<Option<ScheduleRun>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE run_id = ?", RUN_SELECT),
            params![run_id],
            map_run_row,
        ) {
            Ok(run) => Ok(Some(run)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有运行（按created_at降序）
    pub fn list_runs(&self) -> RepositoryResult<Vec<ScheduleRun>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!("{} ORDER BY created_at DESC, run_id", RUN_SELECT))?;
        let runs = stmt
            .query_map([], map_run_row)?
            .collect::<Result<Vec<ScheduleRun>, _>>()?;

        Ok(runs)
    }

    /// 查询运行的已分配片段（按分配日、片段ID升序）
    pub fn list_fragments(&self, run_id: &str) -> RepositoryResult<Vec<ResolvedFragmentRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT fragment_id, parent_order_id, client, order_date, deadline_date,
                      priority_tier, strategic_weight, volume, profit_value,
                      assigned_date, assignment, rented_volume, adjusted_profit
               FROM schedule_fragment
               WHERE run_id = ?
               ORDER BY assigned_date, fragment_id"#,
        )?;

        let records = stmt
            .query_map(params![run_id], |row| {
                let tier_no: i64 = row.get(5)?;
                let assignment: String = row.get(10)?;
                Ok(ResolvedFragmentRecord {
                    id: row.get(0)?,
                    parent_order_id: row.get(1)?,
                    client: row.get(2)?,
                    order_date: row.get(3)?,
                    deadline_date: row.get(4)?,
                    priority_tier: PriorityTier::from_number(tier_no)
                        .ok_or_else(|| conversion_error(5, format!("无效等级: {}", tier_no)))?,
                    strategic_weight: row.get::<_, i64>(6)? as u64,
                    volume: row.get::<_, i64>(7)? as u64,
                    profit_value: row.get(8)?,
                    assigned_date: row.get(9)?,
                    assignment: AssignmentKind::parse(&assignment)
                        .ok_or_else(|| conversion_error(10, format!("无效运力类型: {}", assignment)))?,
                    rented_volume: row.get::<_, i64>(11)? as u64,
                    adjusted_profit: row.get(12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 查询运行的日租赁汇总（按日期升序）
    pub fn list_daily_rentals(&self, run_id: &str) -> RepositoryResult<Vec<DailyRentalSummary>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT plan_date, owned_volume, owned_fragments,
                      rented_volume, rented_fragments, rented_truck_count
               FROM schedule_daily_rental
               WHERE run_id = ?
               ORDER BY plan_date"#,
        )?;

        let daily = stmt
            .query_map(params![run_id], |row| {
                Ok(DailyRentalSummary {
                    date: row.get(0)?,
                    owned_volume: row.get::<_, i64>(1)? as u64,
                    owned_fragments: row.get::<_, i64>(2)? as usize,
                    rented_volume: row.get::<_, i64>(3)? as u64,
                    rented_fragments: row.get::<_, i64>(4)? as usize,
                    rented_truck_count: row.get::<_, i64>(5)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(daily)
    }

    /// 查询运行的未解决片段（按片段ID升序）
    pub fn list_unresolved(&self, run_id: &str) -> RepositoryResult<Vec<UnresolvedFragment>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT fragment_id, parent_order_id, client,
                      earliest_ship_date, deadline_date, volume, reason
               FROM schedule_unresolved
               WHERE run_id = ?
               ORDER BY fragment_id"#,
        )?;

        let unresolved = stmt
            .query_map(params![run_id], |row| {
                Ok(UnresolvedFragment {
                    id: row.get(0)?,
                    parent_order_id: row.get(1)?,
                    client: row.get(2)?,
                    earliest_ship_date: row.get(3)?,
                    deadline_date: row.get(4)?,
                    volume: row.get::<_, i64>(5)? as u64,
                    reason: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(unresolved)
    }

    /// 删除运行（级联删除片段、日汇总与未解决记录）
    pub fn delete_run(&self, run_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute("DELETE FROM schedule_run WHERE run_id = ?", params![run_id])?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ScheduleRun".to_string(),
                id: run_id.to_string(),
            });
        }
        Ok(())
    }
}

const RUN_SELECT: &str = r#"SELECT run_id, created_at, window_start, window_end,
       fragment_count, resolved_count, unresolved_count, rejected_order_count,
       owned_volume, rented_volume, total_rented_trucks,
       total_profit, total_adjusted_profit,
       first_day, last_day, spillover_count, config_snapshot_json
FROM schedule_run"#;

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

/// 映射数据库行到ScheduleRun对象
fn map_run_row(row: &rusqlite::Row) -> rusqlite::Result<ScheduleRun> {
    let created_at: String = row.get(1)?;
    let created_at = NaiveDateTime::parse_from_str(&created_at, DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let window_start: NaiveDate = row.get(2)?;
    let window_end: NaiveDate = row.get(3)?;

    Ok(ScheduleRun {
        run_id: row.get(0)?,
        created_at,
        summary: RunSummary {
            window_start,
            window_end,
            fragment_count: row.get::<_, i64>(4)? as usize,
            resolved_count: row.get::<_, i64>(5)? as usize,
            unresolved_count: row.get::<_, i64>(6)? as usize,
            rejected_order_count: row.get::<_, i64>(7)? as usize,
            owned_volume: row.get::<_, i64>(8)? as u64,
            rented_volume: row.get::<_, i64>(9)? as u64,
            total_rented_trucks: row.get::<_, i64>(10)? as u64,
            total_profit: row.get(11)?,
            total_adjusted_profit: row.get(12)?,
            first_day: row.get(13)?,
            last_day: row.get(14)?,
            spillover_count: row.get::<_, i64>(15)? as usize,
        },
        config_snapshot_json: row.get(16)?,
    })
}
