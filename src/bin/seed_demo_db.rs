// ==========================================
// 培训中心排课系统 - 演示库初始化工具
// ==========================================
// 用法: seed_demo_db [db_path] [start_date]
// 1) 备份并删除已有库文件
// 2) 建表并写入一个站点的班组/学员/机台/模块
// 3) 执行一次高级排课并打印结果
// ==========================================

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{Datelike, Days, Local, NaiveDate};

use training_scheduler::api::{FormFields, ScheduleApi};
use training_scheduler::config::app_config::default_db_path;
use training_scheduler::config::{config_keys, ConfigManager, ConfigScope};
use training_scheduler::db::{init_schema, open_sqlite_connection};
use training_scheduler::repository::{DirectoryRepository, ScheduleEntryRepository};

const GROUPS: [(&str, &[&str]); 3] = [
    ("Welding A", &["Amy Chen", "Ben Ortiz", "Chloe Park", "Daniel Reyes"]),
    ("Machining B", &["Ella Novak", "Farid Haddad", "Grace Liu"]),
    ("Electrical C", &["Hugo Silva", "Iris Tan", "Jonas Berg", "Kara Singh"]),
];

const MACHINES: [(&str, &str); 4] = [
    ("Lathe 1", "basic"),
    ("Lathe 2", "basic"),
    ("Mill 1", "advanced"),
    ("Welding Bay", "basic"),
];

const MODULES: [(&str, &str); 2] = [("Safety Induction", "SAF-01"), ("CNC Basics", "CNC-01")];

fn main() -> Result<()> {
    training_scheduler::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(default_db_path);
    let start_date = match std::env::args().nth(2) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").with_context(|| format!("无效的开始日期: {}", raw))?,
        None => next_monday(Local::now().date_naive()),
    };

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("建表失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let directory = Arc::new(DirectoryRepository::from_connection(conn.clone()));
    let store = Arc::new(ScheduleEntryRepository::from_connection(conn.clone()));
    let config_manager = Arc::new(ConfigManager::from_connection(conn));

    let site = seed_directory(&directory)?;
    config_manager.set_value(&ConfigScope::Site { site_id: site }, config_keys::LUNCH_START, "12:30")?;

    let api = ScheduleApi::new(store, directory, config_manager);
    let end_date = start_date
        .checked_add_days(Days::new(4))
        .context("结束日期超出范围")?;
    let start = start_date.format("%Y-%m-%d").to_string();
    let end = end_date.format("%Y-%m-%d").to_string();

    let fields: FormFields = vec![
        ("start_date", start.as_str()),
        ("end_date", end.as_str()),
        ("start_time", "08:00"),
        ("end_time", "16:00"),
        ("slot_duration", "90"),
        ("priority_rule", "GROUP"),
        ("generation_scope", "all"),
        ("clear_existing", "on"),
        ("allowance_time", "10"),
        ("notes", "demo run"),
    ]
    .into_iter()
    .collect();

    let outcome = api.generate_schedule_advanced(site, &fields)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    println!("entries in {}: {}", db_path, api.list_schedule(site)?.len());
    Ok(())
}

fn seed_directory(directory: &DirectoryRepository) -> Result<i64> {
    let site = directory.insert_site("Demo Training Center")?;

    let mut student_ids = Vec::new();
    let mut number = 101;
    for (group_name, students) in GROUPS {
        let group = directory.insert_group(site, group_name)?;
        for name in students {
            let student_number = format!("AGP24{}", number);
            number += 1;
            student_ids.push(directory.insert_student(site, Some(student_number.as_str()), name, Some(group))?);
        }
    }

    for (machine_name, level) in MACHINES {
        directory.insert_machine(site, machine_name, level)?;
    }

    for (index, &(name, code)) in MODULES.iter().enumerate() {
        let module = directory.insert_module(site, name, Some(code))?;
        for student in student_ids.iter().skip(index).step_by(2) {
            directory.enroll_student(*student, module)?;
        }
    }

    eprintln!(
        "Seeded site {} with {} students and {} machines",
        site,
        student_ids.len(),
        MACHINES.len()
    );
    Ok(site)
}

fn backup_and_reset_db(db_path: &str) -> Result<()> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn next_monday(today: NaiveDate) -> NaiveDate {
    let offset = (7 - today.weekday().num_days_from_monday()) % 7;
    today.checked_add_days(Days::new(u64::from(offset))).unwrap_or(today)
}
