// ==========================================
// 散装液体配送排产系统 - 命令行入口
// ==========================================
// 用法:
//   bulk-liquid-aps <orders.csv|orders.xlsx>
//       [--config cfg.json] [--db path] [--out dir]
//       [--start YYYY-MM-DD] [--end YYYY-MM-DD]
//       [--priorities file.csv] [--billed file.csv] [--cancellations file.csv]
//       [--detail YYYY-MM-DD]...
//
// 流程: 客户分级 → 导入(仅窗口内下单) → 排产 → 复核 → 落库 → 导出
// 配置优先级: --start/--end > --config 文件 > config_kv 表 > 默认常量
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use bulk_liquid_aps::config::{ConfigError, ConfigManager, SchedulingConfig};
use bulk_liquid_aps::db::{get_default_db_path, init_schema, open_sqlite_connection};
use bulk_liquid_aps::engine::{
    CapacityValidator, PriorityMap, ProfitSummaryEngine, ScheduleOrchestrator,
};
use bulk_liquid_aps::exporter::{CsvScheduleExporter, TruckFleet};
use bulk_liquid_aps::importer::{HistoryLoader, OrderImporter, OrderImporterImpl, TierSources};
use bulk_liquid_aps::domain::types::DqLevel;
use bulk_liquid_aps::repository::ScheduleRepository;
use bulk_liquid_aps::{logging, APP_NAME, VERSION};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const USAGE: &str = "用法: bulk-liquid-aps <orders.csv|orders.xlsx> [--config cfg.json] [--db path] \
[--out dir] [--start YYYY-MM-DD] [--end YYYY-MM-DD] [--priorities file.csv] [--billed file.csv] \
[--cancellations file.csv] [--detail YYYY-MM-DD]";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    orders_path: PathBuf,
    config_path: Option<PathBuf>,
    db_path: Option<String>,
    out_dir: PathBuf,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    tier_sources: TierSources,
    detail_dates: Vec<NaiveDate>,
}

fn parse_date_arg(flag: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("{} 需要 YYYY-MM-DD 格式日期，实际: {}", flag, value))
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<CliArgs> {
    let mut parsed = CliArgs {
        out_dir: PathBuf::from("."),
        ..CliArgs::default()
    };
    let mut orders_path = None;

    while let Some(arg) = args.next() {
        let mut value_for = |flag: &str| {
            args.next()
                .ok_or_else(|| anyhow!("{} 缺少参数值\n{}", flag, USAGE))
        };
        match arg.as_str() {
            "--config" => parsed.config_path = Some(PathBuf::from(value_for("--config")?)),
            "--db" => parsed.db_path = Some(value_for("--db")?),
            "--out" => parsed.out_dir = PathBuf::from(value_for("--out")?),
            "--start" => parsed.start = Some(parse_date_arg("--start", &value_for("--start")?)?),
            "--end" => parsed.end = Some(parse_date_arg("--end", &value_for("--end")?)?),
            "--priorities" => {
                parsed.tier_sources.priorities = Some(PathBuf::from(value_for("--priorities")?))
            }
            "--billed" => parsed.tier_sources.billed = Some(PathBuf::from(value_for("--billed")?)),
            "--cancellations" => {
                parsed.tier_sources.cancellations = Some(PathBuf::from(value_for("--cancellations")?))
            }
            "--detail" => parsed
                .detail_dates
                .push(parse_date_arg("--detail", &value_for("--detail")?)?),
            "-h" | "--help" => bail!("{}", USAGE),
            flag if flag.starts_with("--") => bail!("未知参数: {}\n{}", flag, USAGE),
            path => {
                if orders_path.replace(PathBuf::from(path)).is_some() {
                    bail!("只能指定一个订单文件\n{}", USAGE);
                }
            }
        }
    }

    parsed.orders_path = orders_path.ok_or_else(|| anyhow!("缺少订单文件\n{}", USAGE))?;
    Ok(parsed)
}

/// 组装排产配置
fn resolve_config(args: &CliArgs, manager: &ConfigManager) -> Result<SchedulingConfig> {
    let base = match &args.config_path {
        Some(path) => Some(
            SchedulingConfig::from_json_file(path)
                .with_context(|| format!("无法读取配置文件 {}", path.display()))?,
        ),
        None => match manager.load_scheduling_config() {
            Ok(config) => Some(config),
            Err(ConfigError::MissingKey(key)) => {
                info!(key = %key, "数据库中无完整排产窗口，使用默认常量");
                None
            }
            Err(e) => return Err(e).context("无法从数据库读取排产配置"),
        },
    };

    let mut config = match (base, args.start, args.end) {
        (Some(config), _, _) => config,
        (None, Some(start), Some(end)) => SchedulingConfig::with_window(start, end),
        (None, _, _) => bail!("未找到排产窗口，请指定 --start 与 --end 或 --config\n{}", USAGE),
    };
    if let Some(start) = args.start {
        config.window_start = start;
    }
    if let Some(end) = args.end {
        config.window_end = end;
    }
    Ok(config)
}

async fn run(args: CliArgs) -> Result<()> {
    info!("==================================================");
    info!("{} v{}", APP_NAME, VERSION);
    info!("==================================================");

    // ===== 数据库与配置 =====
    let db_path = args.db_path.clone().unwrap_or_else(get_default_db_path);
    info!(db_path = %db_path, "使用数据库");
    let conn = open_sqlite_connection(&db_path).with_context(|| format!("无法打开数据库 {}", db_path))?;
    init_schema(&conn).context("数据库建表失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let manager = ConfigManager::from_connection(conn.clone())?;
    let config = resolve_config(&args, &manager)?;
    config.validate()?;
    manager.save_scheduling_config(&config)?;

    // ===== 客户分级与导入 =====
    let tiers = HistoryLoader::new()
        .build_tier_resolver(&args.tier_sources)
        .context("无法构建客户等级")?;

    let importer = OrderImporterImpl::new(PriorityMap::new())
        .with_tier_resolver(tiers)
        .with_order_window(config.window_start, config.window_end);
    let is_excel = args
        .orders_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xls"))
        .unwrap_or(false);
    let import = if is_excel {
        importer.import_from_excel(&args.orders_path).await
    } else {
        importer.import_from_csv(&args.orders_path).await
    }
    .with_context(|| format!("订单导入失败 {}", args.orders_path.display()))?;

    for violation in import.violations.iter().filter(|v| v.level != DqLevel::Info) {
        warn!(
            row = violation.row_number,
            order_id = ?violation.order_id,
            level = %violation.level,
            field = %violation.field,
            "{}",
            violation.message
        );
    }

    // ===== 排产 =====
    let orchestrator = ScheduleOrchestrator::new(Arc::new(config.clone()));
    let outcome = orchestrator.execute(&import.orders).await?;

    // ===== 复核与利润对比 =====
    let checks = CapacityValidator::from_config(&config).validate(&outcome.resolved, &outcome.daily);
    let failed_days = checks.iter().filter(|c| !c.is_ok()).count();
    if failed_days > 0 {
        warn!(failed_days = failed_days, "运力复核未通过");
    }

    let profit = ProfitSummaryEngine::from_config(&config);
    let comparison = profit.compare(
        &profit.baseline(&import.orders),
        &profit.posterior(&outcome.resolved),
    );

    // ===== 落库与导出 =====
    let run_id = ScheduleRepository::new(conn.clone()).save_outcome(&outcome, &config)?;

    let exporter = CsvScheduleExporter::new(&args.out_dir);
    let mut written = exporter.export_all(&outcome, &comparison)?;
    written.push(exporter.export_truck_detail(&outcome, &TruckFleet::from_config(&config))?);
    for date in &args.detail_dates {
        written.push(exporter.export_day_detail(&outcome, *date)?);
    }

    info!(run_id = %run_id, files = written.len(), "排产完成");
    println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = parse_args(std::env::args().skip(1))?;
    run(args).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<CliArgs> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_full_command_line() {
        let parsed = args(&[
            "orders.xlsx",
            "--db",
            "aps.db",
            "--out",
            "out",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
            "--detail",
            "2024-01-03",
        ])
        .unwrap();

        assert_eq!(parsed.orders_path, PathBuf::from("orders.xlsx"));
        assert_eq!(parsed.db_path.as_deref(), Some("aps.db"));
        assert_eq!(parsed.out_dir, PathBuf::from("out"));
        assert_eq!(parsed.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(parsed.end, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(parsed.detail_dates.len(), 1);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(args(&[]).is_err());
        assert!(args(&["a.csv", "b.csv"]).is_err());
        assert!(args(&["a.csv", "--start", "01/02/2024"]).is_err());
        assert!(args(&["a.csv", "--verbose"]).is_err());
        assert!(args(&["a.csv", "--db"]).is_err());
    }

    #[test]
    fn test_parse_history_sources() {
        let parsed = args(&[
            "orders.csv",
            "--billed",
            "facturas.csv",
            "--cancellations",
            "cancelados.csv",
        ])
        .unwrap();

        assert_eq!(parsed.tier_sources.billed, Some(PathBuf::from("facturas.csv")));
        assert_eq!(parsed.tier_sources.cancellations, Some(PathBuf::from("cancelados.csv")));
        assert!(parsed.tier_sources.priorities.is_none());
        assert!(parsed.tier_sources.has_history());
    }
}
