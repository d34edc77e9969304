// ==========================================
// 散装液体配送排产系统 - 引擎编排器
// ==========================================
// 用途: 协调排产主流程
// 1) 读取并校验配置（致命错误在处理任何一天前返回）
// 2) 订单拆分（单条订单错误剔除后继续）
// 3) 截止日筛查（不可行片段单独报告）
// 4) 积压模拟（同步，无挂起点）
// 5) 组装 ScheduleOutcome
// ==========================================

use crate::config::{SchedulingConfig, SchedulingConfigReader};
use crate::domain::fragment::OrderFragment;
use crate::domain::order::Order;
use crate::domain::schedule::{
    DailyRentalSummary, RejectedOrder, ResolvedFragmentRecord, RunSummary, ScheduleOutcome,
    UnresolvedFragment,
};
use crate::engine::backlog::{deadline_violation, BacklogSimulator};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fragmenter::OrderFragmenter;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ==========================================
// ScheduleOrchestrator - 引擎编排器
// ==========================================
pub struct ScheduleOrchestrator<C>
where
    C: SchedulingConfigReader,
{
    config: Arc<C>,
}

impl<C> ScheduleOrchestrator<C>
where
    C: SchedulingConfigReader,
{
    /// 创建新的编排器实例
    ///
    /// # 参数
    /// - config: 配置读取器
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// 执行完整排产流程（配置在进入同步模拟前读取）
    ///
    /// # 参数
    /// - orders: 已通过导入校验的订单
    ///
    /// # 返回
    /// - Ok(ScheduleOutcome): 已分配片段 + 逐日汇总 + 未解决片段 + 被剔除订单
    /// - Err: 配置错误 / 模拟超限 / 求解器缺陷（均为致命）
    pub async fn execute(&self, orders: &[Order]) -> EngineResult<ScheduleOutcome> {
        let config = self.config.get_scheduling_config().await?;
        execute_with_config(&config, orders)
    }
}

/// 在已加载的配置上同步执行排产
pub fn execute_with_config(
    config: &SchedulingConfig,
    orders: &[Order],
) -> EngineResult<ScheduleOutcome> {
    config.validate()?;

    info!(
        orders_count = orders.len(),
        window_start = %config.window_start,
        window_end = %config.window_end,
        owned_daily_capacity = config.owned_daily_capacity,
        "开始执行排产流程"
    );

    // ==========================================
    // 步骤1: 订单拆分
    // ==========================================
    let fragmentation = OrderFragmenter::from_config(config).fragment_all(orders);

    let mut rejected_orders = Vec::new();
    for err in fragmentation.rejected {
        let order_id = match &err {
            EngineError::InputValidation { order_id, .. } => order_id.clone(),
            _ => return Err(err),
        };
        rejected_orders.push(RejectedOrder {
            order_id,
            reason: err.to_string(),
        });
    }

    let fragment_count = fragmentation.fragments.len();
    debug!(
        fragment_count = fragment_count,
        rejected_orders = rejected_orders.len(),
        "步骤1: 订单拆分完成"
    );

    // ==========================================
    // 步骤2: 截止日筛查
    // ==========================================
    let (feasible, unresolved) = screen_deadlines(fragmentation.fragments, config);

    debug!(
        feasible = feasible.len(),
        unresolved = unresolved.len(),
        "步骤2: 截止日筛查完成"
    );

    // ==========================================
    // 步骤3: 积压模拟
    // ==========================================
    let simulation = BacklogSimulator::from_config(config).run(feasible)?;

    // ==========================================
    // 步骤4: 组装结果
    // ==========================================
    let resolved: Vec<ResolvedFragmentRecord> = simulation
        .fragments
        .iter()
        .filter_map(ResolvedFragmentRecord::from_fragment)
        .collect();

    let summary = build_run_summary(
        config,
        fragment_count,
        &resolved,
        &simulation.daily,
        unresolved.len(),
        rejected_orders.len(),
    );

    info!(
        resolved = summary.resolved_count,
        unresolved = summary.unresolved_count,
        rejected_orders = summary.rejected_order_count,
        rented_trucks = summary.total_rented_trucks,
        spillover = summary.spillover_count,
        "排产流程完成"
    );

    Ok(ScheduleOutcome {
        resolved,
        daily: simulation.daily,
        unresolved,
        rejected_orders,
        summary,
    })
}

/// 拆出截止日不可行的片段
fn screen_deadlines(
    fragments: Vec<OrderFragment>,
    config: &SchedulingConfig,
) -> (Vec<OrderFragment>, Vec<UnresolvedFragment>) {
    let mut feasible = Vec::with_capacity(fragments.len());
    let mut unresolved = Vec::new();

    for fragment in fragments {
        match deadline_violation(&fragment, config.window_start) {
            None => feasible.push(fragment),
            Some(err) => {
                warn!(fragment_id = %fragment.id, error = %err, "片段截止日不可行，排除出模拟");
                unresolved.push(UnresolvedFragment {
                    id: fragment.id.clone(),
                    parent_order_id: fragment.parent_order_id.clone(),
                    client: fragment.client.clone(),
                    earliest_ship_date: fragment.earliest_ship_date,
                    deadline_date: fragment.deadline_date,
                    volume: fragment.volume,
                    reason: err.to_string(),
                });
            }
        }
    }

    (feasible, unresolved)
}

fn build_run_summary(
    config: &SchedulingConfig,
    fragment_count: usize,
    resolved: &[ResolvedFragmentRecord],
    daily: &[DailyRentalSummary],
    unresolved_count: usize,
    rejected_order_count: usize,
) -> RunSummary {
    RunSummary {
        window_start: config.window_start,
        window_end: config.window_end,
        fragment_count,
        resolved_count: resolved.len(),
        unresolved_count,
        rejected_order_count,
        owned_volume: daily.iter().map(|d| d.owned_volume).sum(),
        rented_volume: daily.iter().map(|d| d.rented_volume).sum(),
        total_rented_trucks: daily.iter().map(|d| d.rented_truck_count).sum(),
        total_profit: resolved.iter().map(|r| r.profit_value).sum(),
        total_adjusted_profit: resolved.iter().map(|r| r.adjusted_profit).sum(),
        first_day: daily.first().map(|d| d.date),
        last_day: daily.last().map(|d| d.date),
        spillover_count: resolved
            .iter()
            .filter(|r| r.assigned_date > config.window_end)
            .count(),
    }
}
