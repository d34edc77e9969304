// ==========================================
// 散装液体配送排产系统 - 积压模拟器
// ==========================================
// 职责: 逐日推进，构建就绪集合 → 背包求解 → 剩余片段强制租赁
// 输入: 片段集合 (由 OrderFragmenter 生成)
// 输出: 全部片段的分配结果 + 逐日运力汇总
// 红线:
// - assigned_date 只写一次
// - 单日自有运力使用量 ≤ owned_daily_capacity
// - 模拟循环必须有界，超限报错而非死循环
// ==========================================
// 状态机: Pending → AssignedOwn | Pending → AssignedRented（均为终态）
// ==========================================

use crate::config::SchedulingConfig;
use crate::domain::fragment::OrderFragment;
use crate::domain::schedule::DailyRentalSummary;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::knapsack::{DailyCapacitySolver, KnapsackItem};
use crate::engine::penalty::PenaltyModel;
use chrono::{Duration, NaiveDate};
use tracing::{debug, info, instrument};

/// 模拟参数（从 SchedulingConfig 提取）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub window_start: NaiveDate,
    pub owned_daily_capacity: u64,
    pub rented_truck_capacity: u64,
    pub max_wait_days: u32,
    pub max_simulation_days: i64,
}

impl SimulationParams {
    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self {
            window_start: config.window_start,
            owned_daily_capacity: config.owned_capacity(),
            rented_truck_capacity: config.truck_capacity(),
            max_wait_days: config.max_wait_days,
            max_simulation_days: config.max_simulation_days,
        }
    }
}

/// 模拟结果
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// 全部片段（保持输入顺序，均已分配）
    pub fragments: Vec<OrderFragment>,
    /// 就绪集合非空的日期汇总（升序）
    pub daily: Vec<DailyRentalSummary>,
    /// 实际推进的天数
    pub days_simulated: i64,
}

impl SimulationResult {
    pub fn total_rented_trucks(&self) -> u64 {
        self.daily.iter().map(|d| d.rented_truck_count).sum()
    }
}

// ==========================================
// BacklogSimulator - 积压模拟器
// ==========================================
#[derive(Debug, Clone)]
pub struct BacklogSimulator {
    params: SimulationParams,
    solver: DailyCapacitySolver,
    penalty: PenaltyModel,
}

impl BacklogSimulator {
    pub fn new(params: SimulationParams, penalty: PenaltyModel) -> Self {
        Self {
            params,
            solver: DailyCapacitySolver::new(),
            penalty,
        }
    }

    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self::new(
            SimulationParams::from_config(config),
            PenaltyModel::from_config(config),
        )
    }

    pub fn with_solver(mut self, solver: DailyCapacitySolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// 校验截止日可行性
    ///
    /// 截止日早于 max(最早发运日, 窗口起始日) 的片段永远无法进入就绪集合
    pub fn check_deadlines(&self, fragments: &[OrderFragment]) -> EngineResult<()> {
        for fragment in fragments.iter().filter(|f| !f.is_assigned()) {
            if let Some(err) = deadline_violation(fragment, self.params.window_start) {
                return Err(err);
            }
        }
        Ok(())
    }

    /// 运行完整模拟
    ///
    /// # 返回
    /// - Ok(SimulationResult): 所有片段均已分配
    /// - Err(DeadlineInfeasible): 存在不可能就绪的片段（模拟前检查）
    /// - Err(DayLimitExceeded): 超过天数上限仍有未分配片段
    /// - Err(Solver / FragmentAlreadyAssigned): 实现缺陷
    pub fn run(&self, mut fragments: Vec<OrderFragment>) -> EngineResult<SimulationResult> {
        self.check_capacities()?;
        self.check_deadlines(&fragments)?;

        let start = self.params.window_start;
        let horizon = fragments
            .iter()
            .filter(|f| !f.is_assigned())
            .map(|f| f.first_schedulable_day(start))
            .max();

        // 天数上限: 窗口起始到最晚首个可排日，再受固定上限约束
        let span_days = horizon.map_or(0, |h| (h - start).num_days() + 1);
        let limit_days = span_days.min(self.params.max_simulation_days.max(0));

        info!(
            fragments = fragments.len(),
            window_start = %start,
            span_days = span_days,
            limit_days = limit_days,
            "开始积压模拟"
        );

        let mut daily = Vec::new();
        let mut days_simulated = 0i64;

        while fragments.iter().any(|f| !f.is_assigned()) {
            if days_simulated >= limit_days {
                let pending: Vec<String> = fragments
                    .iter()
                    .filter(|f| !f.is_assigned())
                    .map(|f| f.id.clone())
                    .collect();
                return Err(EngineError::DayLimitExceeded {
                    limit_days,
                    pending,
                });
            }

            let day = start + Duration::days(days_simulated);
            if let Some(summary) = self.simulate_day(day, &mut fragments)? {
                daily.push(summary);
            }
            days_simulated += 1;
        }

        info!(
            days_simulated = days_simulated,
            active_days = daily.len(),
            rented_trucks = daily.iter().map(|d| d.rented_truck_count).sum::<u64>(),
            "积压模拟完成"
        );

        Ok(SimulationResult {
            fragments,
            daily,
            days_simulated,
        })
    }

    /// 模拟单日
    ///
    /// # 返回
    /// - Some(summary): 当日就绪集合非空
    /// - None: 当日无就绪片段
    #[instrument(skip(self, fragments), fields(day = %day))]
    pub fn simulate_day(
        &self,
        day: NaiveDate,
        fragments: &mut [OrderFragment],
    ) -> EngineResult<Option<DailyRentalSummary>> {
        let ready: Vec<usize> = fragments
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_ready_on(day))
            .map(|(index, _)| index)
            .collect();

        if ready.is_empty() {
            return Ok(None);
        }

        for &index in &ready {
            fragments[index].waited_days += 1;
        }

        let candidates: Vec<KnapsackItem> = ready
            .iter()
            .map(|&index| &fragments[index])
            .filter(|f| f.waited_days <= self.params.max_wait_days)
            .map(|f| KnapsackItem::new(f.id.clone(), f.volume, f.strategic_weight))
            .collect();

        let selection = self
            .solver
            .solve(&candidates, self.params.owned_daily_capacity)?;

        let mut summary = DailyRentalSummary {
            date: day,
            owned_volume: 0,
            owned_fragments: 0,
            rented_volume: 0,
            rented_fragments: 0,
            rented_truck_count: 0,
        };

        // 按 id 匹配求解结果
        for &index in &ready {
            let fragment = &mut fragments[index];
            if selection.contains(&fragment.id) {
                assign(fragment, day, 0, &self.penalty)?;
                summary.owned_volume += fragment.volume;
                summary.owned_fragments += 1;
            }
        }

        // 就绪但未被选中 → 当日强制租赁
        for &index in &ready {
            let fragment = &mut fragments[index];
            if !fragment.is_assigned() {
                let volume = fragment.volume;
                assign(fragment, day, volume, &self.penalty)?;
                summary.rented_volume += volume;
                summary.rented_fragments += 1;
            }
        }

        summary.rented_truck_count = summary
            .rented_volume
            .div_ceil(self.params.rented_truck_capacity);

        debug!(
            ready = ready.len(),
            candidates = candidates.len(),
            owned_volume = summary.owned_volume,
            rented_volume = summary.rented_volume,
            rented_trucks = summary.rented_truck_count,
            "单日模拟完成"
        );

        Ok(Some(summary))
    }

    fn check_capacities(&self) -> EngineResult<()> {
        if self.params.rented_truck_capacity == 0 {
            return Err(EngineError::CapacityMisconfiguration {
                key: "rented_truck_capacity".to_string(),
                message: "租赁车辆容量必须大于 0".to_string(),
            });
        }
        if self.params.owned_daily_capacity == 0 {
            return Err(EngineError::CapacityMisconfiguration {
                key: "owned_daily_capacity".to_string(),
                message: "自有日运力必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

/// 截止日早于首个可排日时返回 DeadlineInfeasible
pub fn deadline_violation(fragment: &OrderFragment, window_start: NaiveDate) -> Option<EngineError> {
    let deadline_date = fragment.deadline_date?;
    let first_schedulable_day = fragment.first_schedulable_day(window_start);
    if deadline_date < first_schedulable_day {
        Some(EngineError::DeadlineInfeasible {
            fragment_id: fragment.id.clone(),
            first_schedulable_day,
            deadline_date,
        })
    } else {
        None
    }
}

/// 写入分配结果（只写一次）
fn assign(
    fragment: &mut OrderFragment,
    day: NaiveDate,
    rented_volume: u64,
    penalty: &PenaltyModel,
) -> EngineResult<()> {
    if let Some(assigned_date) = fragment.assigned_date {
        return Err(EngineError::FragmentAlreadyAssigned {
            fragment_id: fragment.id.clone(),
            assigned_date,
        });
    }
    fragment.assigned_date = Some(day);
    fragment.rented_volume = rented_volume;
    fragment.adjusted_profit = penalty.adjusted_profit(fragment);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{FragmentState, PriorityTier};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fragment(id: &str, volume: u64, weight: u64, ready: NaiveDate) -> OrderFragment {
        OrderFragment {
            id: id.to_string(),
            parent_order_id: id.to_string(),
            sequence_no: 1,
            client: format!("CLIENTE {}", id),
            order_date: ready - Duration::days(5),
            deadline_date: None,
            earliest_ship_date: ready,
            volume,
            profit_value: volume as f64 * 0.5,
            priority_tier: PriorityTier::Tier2,
            strategic_weight: weight,
            waited_days: 0,
            assigned_date: None,
            rented_volume: 0,
            adjusted_profit: volume as f64 * 0.5,
        }
    }

    fn params(capacity: u64, max_wait_days: u32) -> SimulationParams {
        SimulationParams {
            window_start: date(2024, 1, 1),
            owned_daily_capacity: capacity,
            rented_truck_capacity: 64,
            max_wait_days,
            max_simulation_days: 3_660,
        }
    }

    fn simulator(capacity: u64, max_wait_days: u32) -> BacklogSimulator {
        BacklogSimulator::new(params(capacity, max_wait_days), PenaltyModel::new(0.05))
    }

    #[test]
    fn test_higher_weight_travels_own_and_rest_is_rented() {
        let day0 = date(2024, 1, 1);
        let fragments = vec![fragment("A", 60, 3, day0), fragment("B", 60, 2, day0)];

        let result = simulator(100, 2).run(fragments).unwrap();
        let a = &result.fragments[0];
        let b = &result.fragments[1];

        assert_eq!(a.state(), FragmentState::AssignedOwn);
        assert_eq!(a.assigned_date, Some(day0));
        assert_eq!(a.adjusted_profit, a.profit_value);

        assert_eq!(b.state(), FragmentState::AssignedRented);
        assert_eq!(b.rented_volume, 60);
        assert!((b.adjusted_profit - (30.0 - 60.0 * 0.5 * 0.05)).abs() < 1e-9);

        assert_eq!(result.daily.len(), 1);
        assert_eq!(result.daily[0].rented_truck_count, 1);
        assert_eq!(result.daily[0].owned_volume, 60);
    }

    #[test]
    fn test_zero_max_wait_sends_everything_to_rented() {
        let day0 = date(2024, 1, 1);
        let fragments = vec![fragment("A", 10, 3, day0), fragment("B", 10, 1, day0)];

        let result = simulator(100, 0).run(fragments).unwrap();
        assert!(result
            .fragments
            .iter()
            .all(|f| f.state() == FragmentState::AssignedRented));
        assert_eq!(result.daily[0].owned_volume, 0);
        assert_eq!(result.daily[0].rented_volume, 20);
    }

    #[test]
    fn test_every_ready_fragment_resolves_on_its_first_ready_day() {
        let fragments = vec![
            fragment("A", 80, 1, date(2024, 1, 1)),
            fragment("B", 50, 3, date(2024, 1, 3)),
            fragment("C", 50, 2, date(2024, 1, 3)),
            fragment("D", 30, 2, date(2024, 1, 3)),
        ];

        let result = simulator(100, 2).run(fragments).unwrap();
        assert!(result.fragments.iter().all(|f| f.waited_days == 1));
        assert_eq!(result.fragments[0].assigned_date, Some(date(2024, 1, 1)));
        assert!(result.fragments[1..]
            .iter()
            .all(|f| f.assigned_date == Some(date(2024, 1, 3))));

        // 1月2日无就绪片段，不产生汇总
        let days: Vec<NaiveDate> = result.daily.iter().map(|d| d.date).collect();
        assert_eq!(days, vec![date(2024, 1, 1), date(2024, 1, 3)]);
        assert_eq!(result.days_simulated, 3);

        // B+C 与 B+D 价值同为 5，B+C 剩余运力更少
        assert_eq!(result.daily[1].owned_volume, 100);
        assert_eq!(result.fragments[3].state(), FragmentState::AssignedRented);
    }

    #[test]
    fn test_capacity_bound_completeness_and_determinism() {
        let mut fragments = Vec::new();
        for i in 0..40u64 {
            let ready = date(2024, 1, 1) + Duration::days((i % 5) as i64);
            fragments.push(fragment(&format!("F{:03}", i), 7 + (i * 13) % 41, 1 + i % 3, ready));
        }

        let sim = simulator(100, 2);
        let first = sim.run(fragments.clone()).unwrap();
        let second = sim.run(fragments).unwrap();

        assert_eq!(first.fragments, second.fragments);
        assert_eq!(first.daily, second.daily);
        assert!(first.fragments.iter().all(|f| f.is_assigned()));
        assert!(first.daily.iter().all(|d| d.owned_volume <= 100));
        assert!(first
            .fragments
            .iter()
            .all(|f| f.adjusted_profit <= f.profit_value));
        for day in &first.daily {
            assert_eq!(day.rented_truck_count, day.rented_volume.div_ceil(64));
        }
    }

    #[test]
    fn test_infeasible_deadline_is_reported_before_simulation() {
        let mut late = fragment("LATE", 10, 2, date(2024, 1, 6));
        late.deadline_date = Some(date(2024, 1, 5));

        let err = simulator(100, 2).run(vec![late]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DeadlineInfeasible { ref fragment_id, .. } if fragment_id == "LATE"
        ));
    }

    #[test]
    fn test_deadline_before_window_start_is_infeasible() {
        let mut stale = fragment("OLD", 10, 2, date(2023, 12, 20));
        stale.deadline_date = Some(date(2023, 12, 28));
        assert!(deadline_violation(&stale, date(2024, 1, 1)).is_some());
        assert!(deadline_violation(&stale, date(2023, 12, 1)).is_none());
    }

    #[test]
    fn test_day_limit_lists_pending_fragments() {
        let mut p = params(100, 2);
        p.max_simulation_days = 3;
        let sim = BacklogSimulator::new(p, PenaltyModel::default());

        let fragments = vec![
            fragment("EARLY", 10, 2, date(2024, 1, 1)),
            fragment("FAR", 10, 2, date(2024, 1, 20)),
        ];
        let err = sim.run(fragments).unwrap_err();
        match err {
            EngineError::DayLimitExceeded { limit_days, pending } => {
                assert_eq!(limit_days, 3);
                assert_eq!(pending, vec!["FAR".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_assignment_is_write_once() {
        let mut f = fragment("A", 10, 2, date(2024, 1, 1));
        let penalty = PenaltyModel::default();
        assign(&mut f, date(2024, 1, 1), 0, &penalty).unwrap();

        let err = assign(&mut f, date(2024, 1, 2), 10, &penalty).unwrap_err();
        assert!(matches!(err, EngineError::FragmentAlreadyAssigned { .. }));
        assert_eq!(f.assigned_date, Some(date(2024, 1, 1)));
        assert_eq!(f.rented_volume, 0);
    }

    #[test]
    fn test_fragments_from_before_window_start_become_ready_on_start() {
        let fragments = vec![fragment("BACKLOG", 10, 2, date(2023, 12, 15))];
        let result = simulator(100, 2).run(fragments).unwrap();
        assert_eq!(result.fragments[0].assigned_date, Some(date(2024, 1, 1)));
        assert_eq!(result.days_simulated, 1);
    }

    #[test]
    fn test_empty_input_simulates_nothing() {
        let result = simulator(100, 2).run(Vec::new()).unwrap();
        assert!(result.daily.is_empty());
        assert_eq!(result.days_simulated, 0);
    }
}
