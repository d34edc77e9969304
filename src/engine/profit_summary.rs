// ==========================================
// 散装液体配送排产系统 - 利润汇总引擎
// ==========================================
// 职责: 月度利润汇总
// - 排产后 (posterior): 按分配月份汇总调整后利润
// - 基线 (baseline): 不做优化，片段在首个可排日发运，超出自有运力部分按体积分摊租赁
// - 对比 (compare): 逐月 + TOTAL 行
// 红线: 只计算聚合值，不做任何格式化/渲染
// ==========================================

use crate::config::SchedulingConfig;
use crate::domain::order::Order;
use crate::domain::schedule::ResolvedFragmentRecord;
use crate::engine::fragmenter::OrderFragmenter;
use crate::engine::penalty::PenaltyModel;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TOTAL_PERIOD: &str = "TOTAL";

/// 单月利润汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProfit {
    pub month: String, // YYYY-MM
    pub total_liters: f64,
    pub rented_liters: f64,
    pub total_profit: f64,
    pub profit_per_liter: f64,
}

/// 基线与排产后对比行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitComparisonRow {
    pub period: String, // YYYY-MM 或 TOTAL
    pub liters_before: f64,
    pub liters_after: f64,
    pub profit_before: f64,
    pub profit_after: f64,
    pub profit_per_liter_before: f64,
    pub profit_per_liter_after: f64,
    pub delta_profit: f64,
    pub delta_profit_per_liter: f64,
    pub pct_delta_profit: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    liters: f64,
    rented: f64,
    profit: f64,
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

fn per_liter(profit: f64, liters: f64) -> f64 {
    if liters == 0.0 {
        0.0
    } else {
        profit / liters
    }
}

fn into_monthly(months: BTreeMap<String, Accumulator>) -> Vec<MonthlyProfit> {
    months
        .into_iter()
        .map(|(month, acc)| MonthlyProfit {
            month,
            total_liters: acc.liters,
            rented_liters: acc.rented,
            total_profit: acc.profit,
            profit_per_liter: per_liter(acc.profit, acc.liters),
        })
        .collect()
}

// ==========================================
// ProfitSummaryEngine - 利润汇总引擎
// ==========================================
#[derive(Debug, Clone)]
pub struct ProfitSummaryEngine {
    fragmenter: OrderFragmenter,
    penalty: PenaltyModel,
    owned_daily_capacity: u64,
    window_start: NaiveDate,
}

impl ProfitSummaryEngine {
    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self {
            fragmenter: OrderFragmenter::from_config(config),
            penalty: PenaltyModel::from_config(config),
            owned_daily_capacity: config.owned_capacity(),
            window_start: config.window_start,
        }
    }

    /// 排产后月度汇总（按 assigned_date 所在月份）
    pub fn posterior(&self, records: &[ResolvedFragmentRecord]) -> Vec<MonthlyProfit> {
        let mut months: BTreeMap<String, Accumulator> = BTreeMap::new();
        for record in records {
            let acc = months.entry(month_key(record.assigned_date)).or_default();
            acc.liters += record.volume as f64;
            acc.rented += record.rented_volume as f64;
            acc.profit += record.adjusted_profit;
        }
        into_monthly(months)
    }

    /// 无优化基线月度汇总
    ///
    /// 体积为 0 等无法拆分的订单不计入
    pub fn baseline(&self, orders: &[Order]) -> Vec<MonthlyProfit> {
        let fragments = self.fragmenter.fragment_all(orders).fragments;

        // 发运日 → 当日片段
        let mut days: BTreeMap<NaiveDate, Vec<(u64, f64)>> = BTreeMap::new();
        for fragment in &fragments {
            days.entry(fragment.first_schedulable_day(self.window_start))
                .or_default()
                .push((fragment.volume, fragment.profit_value));
        }

        let mut months: BTreeMap<String, Accumulator> = BTreeMap::new();
        for (day, shipped) in days {
            let day_total: u64 = shipped.iter().map(|(volume, _)| volume).sum();
            let excess = day_total.saturating_sub(self.owned_daily_capacity) as f64;
            let acc = months.entry(month_key(day)).or_default();

            for (volume, profit) in shipped {
                let rented = if day_total == 0 {
                    0.0
                } else {
                    excess * volume as f64 / day_total as f64
                };
                acc.liters += volume as f64;
                acc.rented += rented;
                acc.profit += profit - self.penalty.penalty_for(profit, volume, rented);
            }
        }
        into_monthly(months)
    }

    /// 逐月对比（外连接）+ TOTAL 行
    pub fn compare(
        &self,
        before: &[MonthlyProfit],
        after: &[MonthlyProfit],
    ) -> Vec<ProfitComparisonRow> {
        let mut periods: BTreeMap<&str, (Option<&MonthlyProfit>, Option<&MonthlyProfit>)> =
            BTreeMap::new();
        for month in before {
            periods.entry(month.month.as_str()).or_default().0 = Some(month);
        }
        for month in after {
            periods.entry(month.month.as_str()).or_default().1 = Some(month);
        }

        let mut rows: Vec<ProfitComparisonRow> = periods
            .into_iter()
            .map(|(period, (b, a))| {
                comparison_row(
                    period,
                    b.map_or(0.0, |m| m.total_liters),
                    a.map_or(0.0, |m| m.total_liters),
                    b.map_or(0.0, |m| m.total_profit),
                    a.map_or(0.0, |m| m.total_profit),
                )
            })
            .collect();

        let total = comparison_row(
            TOTAL_PERIOD,
            rows.iter().map(|r| r.liters_before).sum(),
            rows.iter().map(|r| r.liters_after).sum(),
            rows.iter().map(|r| r.profit_before).sum(),
            rows.iter().map(|r| r.profit_after).sum(),
        );
        rows.push(total);
        rows
    }
}

fn comparison_row(
    period: &str,
    liters_before: f64,
    liters_after: f64,
    profit_before: f64,
    profit_after: f64,
) -> ProfitComparisonRow {
    let profit_per_liter_before = per_liter(profit_before, liters_before);
    let profit_per_liter_after = per_liter(profit_after, liters_after);
    let delta_profit = profit_after - profit_before;
    ProfitComparisonRow {
        period: period.to_string(),
        liters_before,
        liters_after,
        profit_before,
        profit_after,
        profit_per_liter_before,
        profit_per_liter_after,
        delta_profit,
        delta_profit_per_liter: profit_per_liter_after - profit_per_liter_before,
        pct_delta_profit: if profit_before == 0.0 {
            0.0
        } else {
            delta_profit / profit_before * 100.0
        },
    }
}
