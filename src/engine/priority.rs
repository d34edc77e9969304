// ==========================================
// 散装液体配送排产系统 - 客户优先级分级引擎
// ==========================================
// 职责: 由历史开票量与取消次数推导客户等级 1/2/3
// 规则:
// 1) 历史等级: 开票 ≥ 5,000,000 升 → 1；否则取消 > 5 次 → 3；其余 → 2
// 2) 最终等级: 历史等级为 1 或上一季度开票 > 2,500,000 升 → 1
//              历史等级为 3 → 3；其余 → 2
// 红线: 不校验等级的业务合理性，只执行规则
// ==========================================

use crate::domain::client::{BilledOrderRecord, CancellationRecord, ClientPriority};
use crate::domain::types::PriorityTier;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use tracing::info;
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_TIER1_BILLED_LITERS: f64 = 5_000_000.0;
pub const DEFAULT_TIER3_CANCELLATIONS: u32 = 5;
pub const DEFAULT_QUARTER_TIER1_LITERS: f64 = 2_500_000.0;

/// 客户键: NFKD 分解 → 丢弃非 ASCII → 大写 → 仅保留 [A-Z0-9]
pub fn normalize_client_key(name: &str) -> String {
    name.nfkd()
        .filter(char::is_ascii)
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// 自然季度（年 + 1..=4）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u32,
}

impl Quarter {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    pub fn previous(self) -> Self {
        if self.quarter == 1 {
            Self {
                year: self.year - 1,
                quarter: 4,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter - 1,
            }
        }
    }
}

/// 客户 × 季度 开票量
#[derive(Debug, Clone, Default)]
pub struct QuarterlyVolumes {
    liters: HashMap<(String, Quarter), f64>,
}

impl QuarterlyVolumes {
    pub fn from_records(records: &[BilledOrderRecord]) -> Self {
        let mut liters = HashMap::new();
        for record in records {
            if let Some(date) = record.invoice_date {
                *liters
                    .entry((normalize_client_key(&record.client), Quarter::of(date)))
                    .or_insert(0.0) += record.liters;
            }
        }
        Self { liters }
    }

    pub fn liters(&self, client: &str, quarter: Quarter) -> f64 {
        self.liters
            .get(&(normalize_client_key(client), quarter))
            .copied()
            .unwrap_or(0.0)
    }

    /// 指定日期所在季度的上一季度开票量
    pub fn previous_quarter_liters(&self, client: &str, on: NaiveDate) -> f64 {
        self.liters(client, Quarter::of(on).previous())
    }
}

// ==========================================
// PriorityClassifier - 客户优先级分级引擎
// ==========================================
#[derive(Debug, Clone)]
pub struct PriorityClassifier {
    tier1_billed_liters: f64,
    tier3_cancellations: u32,
    quarter_tier1_liters: f64,
}

impl PriorityClassifier {
    pub fn new() -> Self {
        Self {
            tier1_billed_liters: DEFAULT_TIER1_BILLED_LITERS,
            tier3_cancellations: DEFAULT_TIER3_CANCELLATIONS,
            quarter_tier1_liters: DEFAULT_QUARTER_TIER1_LITERS,
        }
    }

    pub fn with_thresholds(
        tier1_billed_liters: f64,
        tier3_cancellations: u32,
        quarter_tier1_liters: f64,
    ) -> Self {
        Self {
            tier1_billed_liters,
            tier3_cancellations,
            quarter_tier1_liters,
        }
    }

    /// 历史等级
    pub fn historical_tier(&self, billed_liters: f64, cancellations: u32) -> PriorityTier {
        if billed_liters >= self.tier1_billed_liters {
            PriorityTier::Tier1
        } else if cancellations > self.tier3_cancellations {
            PriorityTier::Tier3
        } else {
            PriorityTier::Tier2
        }
    }

    /// 最终等级（历史等级缺失按 2 处理）
    pub fn final_tier(
        &self,
        historical: Option<PriorityTier>,
        previous_quarter_liters: f64,
    ) -> PriorityTier {
        let historical = historical.unwrap_or(PriorityTier::Tier2);
        if historical == PriorityTier::Tier1 || previous_quarter_liters > self.quarter_tier1_liters {
            PriorityTier::Tier1
        } else if historical == PriorityTier::Tier3 {
            PriorityTier::Tier3
        } else {
            PriorityTier::Tier2
        }
    }

    /// 按客户汇总历史并分级
    ///
    /// # 参数
    /// - `range`: 可选日期区间 [from, to]（含两端）；无日期的记录在限定区间时被排除
    ///
    /// # 返回
    /// 按客户键升序的分级结果
    pub fn classify(
        &self,
        billed: &[BilledOrderRecord],
        cancellations: &[CancellationRecord],
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Vec<ClientPriority> {
        let in_range = |date: Option<NaiveDate>| match (range, date) {
            (None, _) => true,
            (Some((from, to)), Some(d)) => from <= d && d <= to,
            (Some(_), None) => false,
        };

        // key → (原始名称, 开票升数, 取消次数)
        let mut clients: BTreeMap<String, (Option<String>, f64, u32)> = BTreeMap::new();

        for record in billed.iter().filter(|r| in_range(r.invoice_date)) {
            let entry = clients
                .entry(normalize_client_key(&record.client))
                .or_insert((None, 0.0, 0));
            entry.0.get_or_insert_with(|| record.client.trim().to_string());
            entry.1 += record.liters;
        }
        for record in cancellations.iter().filter(|r| in_range(r.cancelled_on)) {
            clients
                .entry(normalize_client_key(&record.client))
                .or_insert((None, 0.0, 0))
                .2 += 1;
        }

        let result: Vec<ClientPriority> = clients
            .into_iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, (name, liters, cancelled))| ClientPriority {
                client: name.unwrap_or_else(|| key.clone()),
                tier: self.historical_tier(liters, cancelled),
                client_key: key,
                billed_liters: liters,
                cancellations: cancelled,
            })
            .collect();

        info!(
            clients = result.len(),
            tier1 = result.iter().filter(|c| c.tier == PriorityTier::Tier1).count(),
            tier3 = result.iter().filter(|c| c.tier == PriorityTier::Tier3).count(),
            "客户分级完成"
        );
        result
    }

    /// 订单最终等级: 历史等级 + 订单日期所在季度的上一季度开票量
    pub fn tier_for_order(
        &self,
        client: &str,
        order_date: NaiveDate,
        historical: &PriorityMap,
        quarterly: &QuarterlyVolumes,
    ) -> PriorityTier {
        self.final_tier(
            historical.get(client),
            quarterly.previous_quarter_liters(client, order_date),
        )
    }
}

impl Default for PriorityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// 客户等级查找表（按归一化客户键）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityMap {
    tiers: HashMap<String, PriorityTier>,
}

impl PriorityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_priorities(priorities: &[ClientPriority]) -> Self {
        let mut map = Self::new();
        for priority in priorities {
            map.insert(&priority.client_key, priority.tier);
        }
        map
    }

    pub fn insert(&mut self, client: &str, tier: PriorityTier) {
        let key = normalize_client_key(client);
        if !key.is_empty() {
            self.tiers.insert(key, tier);
        }
    }

    pub fn get(&self, client: &str) -> Option<PriorityTier> {
        self.tiers.get(&normalize_client_key(client)).copied()
    }

    /// 合并另一张表，同一客户以 `other` 为准
    pub fn merge(&mut self, other: PriorityMap) {
        self.tiers.extend(other.tiers);
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// 等级来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierSource {
    /// 客户等级表
    Historical,
    /// 上一季度开票量升级
    QuarterUpgrade,
}

/// 订单缺失等级时的解析器: 客户等级表 + 可选的季度升级规则
#[derive(Debug, Clone, Default)]
pub struct TierResolver {
    historical: PriorityMap,
    quarterly: Option<(PriorityClassifier, QuarterlyVolumes)>,
}

impl TierResolver {
    /// 仅按客户等级表查找
    pub fn from_map(historical: PriorityMap) -> Self {
        Self {
            historical,
            quarterly: None,
        }
    }

    /// 客户等级表 + 上一季度开票量升级
    pub fn with_quarterly(
        historical: PriorityMap,
        classifier: PriorityClassifier,
        quarterly: QuarterlyVolumes,
    ) -> Self {
        Self {
            historical,
            quarterly: Some((classifier, quarterly)),
        }
    }

    pub fn historical(&self) -> &PriorityMap {
        &self.historical
    }

    /// 解析订单等级；客户既不在等级表中也未触发季度升级时返回 None
    pub fn resolve(&self, client: &str, order_date: Option<NaiveDate>) -> Option<(PriorityTier, TierSource)> {
        let historical = self.historical.get(client);

        if let (Some((classifier, quarterly)), Some(date)) = (&self.quarterly, order_date) {
            let previous = quarterly.previous_quarter_liters(client, date);
            let tier = classifier.final_tier(historical, previous);
            return match historical {
                Some(found) if found == tier => Some((tier, TierSource::Historical)),
                _ if tier == PriorityTier::Tier1 => Some((tier, TierSource::QuarterUpgrade)),
                Some(_) => Some((tier, TierSource::Historical)),
                None => None,
            };
        }

        historical.map(|tier| (tier, TierSource::Historical))
    }
}

impl From<PriorityMap> for TierResolver {
    fn from(historical: PriorityMap) -> Self {
        Self::from_map(historical)
    }
}
