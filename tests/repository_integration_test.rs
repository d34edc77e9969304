// ==========================================
// 排产结果仓储集成测试
// ==========================================
// 测试目标: 文件数据库上的运行持久化与回读
// ==========================================

mod helpers;

use bulk_liquid_aps::engine::execute_with_config;
use bulk_liquid_aps::repository::ScheduleRepository;
use helpers::test_data_builder::{small_config, OrderBuilder};
use test_helpers::{create_test_db, date, open_shared};

#[test]
fn test_saved_run_survives_reopening_the_database() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = small_config();
    let orders = vec![
        OrderBuilder::new("A").volume(80).build(),
        OrderBuilder::new("B").volume(80).build(),
        OrderBuilder::new("C").ordered(date(2024, 1, 3)).volume(250).build(),
        OrderBuilder::new("D")
            .ordered(date(2024, 1, 3))
            .deadline(date(2024, 1, 2))
            .volume(5)
            .build(),
    ];
    let outcome = execute_with_config(&config, &orders).unwrap();

    let run_id = {
        let repo = ScheduleRepository::new(open_shared(&db_path).unwrap());
        repo.save_outcome(&outcome, &config).unwrap()
    };

    let repo = ScheduleRepository::new(open_shared(&db_path).unwrap());
    let run = repo.find_run(&run_id).unwrap().expect("run should exist");
    assert_eq!(run.summary, outcome.summary);
    assert_eq!(run.summary.fragment_count, 6);

    let mut expected = outcome.resolved.clone();
    expected.sort_by(|a, b| a.assigned_date.cmp(&b.assigned_date).then_with(|| a.id.cmp(&b.id)));
    assert_eq!(repo.list_fragments(&run_id).unwrap(), expected);
    assert_eq!(repo.list_daily_rentals(&run_id).unwrap(), outcome.daily);

    let unresolved = repo.list_unresolved(&run_id).unwrap();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].id, "D-1");
}

#[test]
fn test_each_save_creates_a_new_run() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = ScheduleRepository::new(open_shared(&db_path).unwrap());
    let config = small_config();
    let outcome = execute_with_config(&config, &[OrderBuilder::new("A").volume(10).build()]).unwrap();

    let first = repo.save_outcome(&outcome, &config).unwrap();
    let second = repo.save_outcome(&outcome, &config).unwrap();

    assert_ne!(first, second);
    let runs = repo.list_runs().unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().any(|r| r.run_id == first));
    assert!(runs.iter().any(|r| r.run_id == second));
}
