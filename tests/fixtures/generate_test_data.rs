// ==========================================
// 测试数据生成器
// ==========================================
// 用途: 生成可复现的订单 CSV（固定种子）
// 输出: tests/fixtures/datasets/orders_<count>.csv
//
// 用法:
//   cargo run --bin generate_test_data -- [count] [seed] [start YYYY-MM-DD]
// ==========================================

use chrono::{Duration, NaiveDate};
use csv::Writer;
use std::error::Error;
use std::fs::{self, File};

// CSV 表头（与导入器列别名一致）
const CSV_HEADER: &[&str] = &[
    "ID",
    "CLIENTE",
    "FECHA",
    "LITROS",
    "UTILIDAD",
    "PRIORIDAD",
    "FECHA ENTREGA",
];

const CLIENTS: &[&str] = &[
    "Gasolinera Norte",
    "Gasolinería del Valle",
    "Fletes Sur",
    "Transportes Este",
    "Combustibles Oriente",
    "Estación Río Bravo",
    "Agroquímicos Bajío",
    "Minera Sierra Alta",
];

const DEFAULT_COUNT: usize = 500;
const DEFAULT_SEED: u64 = 20240101;
const DATE_SPREAD_DAYS: u64 = 28;

/// 线性同余生成器
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

// 订单记录结构
struct OrderRecord {
    id: String,
    client: String,
    order_date: NaiveDate,
    liters: u64,
    profit: f64,
    tier: Option<u8>,
    deadline: Option<NaiveDate>,
}

impl OrderRecord {
    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.client.clone(),
            self.order_date.format("%Y-%m-%d").to_string(),
            self.liters.to_string(),
            format!("{:.2}", self.profit),
            self.tier.map(|t| t.to_string()).unwrap_or_default(),
            self.deadline
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ]
    }
}

fn generate(count: usize, seed: u64, start: NaiveDate) -> Vec<OrderRecord> {
    let mut rng = Lcg(seed);

    (0..count)
        .map(|i| {
            let order_date = start + Duration::days(rng.below(DATE_SPREAD_DAYS) as i64);

            // 体积分布: 多数为单车量级，少量超过日运力
            let liters = match rng.below(20) {
                0 => 2_000_000 + rng.below(4_000_000),
                1..=4 => 200_000 + rng.below(800_000),
                _ => 8_000 + rng.below(120_000),
            };
            let margin = 0.05 + rng.below(20) as f64 / 100.0;

            // 约 20% 缺失等级，交由客户等级表补全
            let tier = match rng.below(10) {
                0 | 1 => None,
                2 => Some(1),
                3 => Some(3),
                _ => Some(2),
            };
            let deadline = if rng.below(5) == 0 {
                Some(order_date + Duration::days(3 + rng.below(10) as i64))
            } else {
                None
            };

            OrderRecord {
                id: format!("PED-{:05}", i + 1),
                client: CLIENTS[rng.below(CLIENTS.len() as u64) as usize].to_string(),
                order_date,
                liters,
                profit: liters as f64 * margin,
                tier,
                deadline,
            }
        })
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let count = args
        .next()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_COUNT);
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SEED);
    let start = args
        .next()
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::from_ymd_opt(2024, 1, 1))
        .ok_or("无效起始日期")?;

    let dir = "tests/fixtures/datasets";
    fs::create_dir_all(dir)?;
    let path = format!("{}/orders_{}.csv", dir, count);

    let file = File::create(&path)?;
    let mut wtr = Writer::from_writer(file);
    wtr.write_record(CSV_HEADER)?;
    let records = generate(count, seed, start);
    for record in &records {
        wtr.write_record(&record.to_row())?;
    }
    wtr.flush()?;

    println!("已生成 {} 条订单: {}", records.len(), path);
    Ok(())
}
