//! # Seed Data Generator
//!
//! Populates a database with a small venue floor plan and a few
//! promotions for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./kassa_dev.db
//! cargo run -p kassa-db --bin seed
//!
//! # Specify database path
//! cargo run -p kassa-db --bin seed -- --db ./data/kassa.db
//! ```
//!
//! ## Generated Data
//! - Departments: Hall, Terrace, Bar, Billiards
//! - Tables per department, one of them reserved
//! - Promotions: 10% off bar drinks, 100 UAH off checks over 1000 UAH,
//!   and an inactive "3 hours of billiards" deal
//!
//! Seeding is an upsert, so running it twice leaves the same rows.

use anyhow::Context;
use kassa_core::{
    ConditionKind, ConditionOperator, ConditionUnit, DiscountKind, Money, Promotion, PromotionCondition,
    PromotionResult,
};
use kassa_db::{Database, DbConfig};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// (id, name, table prefix, table count)
const DEPARTMENTS: &[(&str, &str, &str, usize)] = &[
    ("hall", "Hall", "Table", 8),
    ("terrace", "Terrace", "Terrace", 4),
    ("bar", "Bar", "Stool", 6),
    ("billiards", "Billiards", "Pool table", 3),
];

/// Table index marked as reserved in every department.
const RESERVED_INDEX: usize = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("KASSA_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./kassa_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kassa Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./kassa_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    info!(path = %db_path, "Connected, migrations applied");

    let floor = db.floor();
    let mut tables = 0;
    for (sort, (id, name, prefix, count)) in DEPARTMENTS.iter().enumerate() {
        floor.upsert_department(id, name, sort as i64).await?;

        for n in 0..*count {
            let table_id = format!("{id}-{}", n + 1);
            let table_name = format!("{prefix} {}", n + 1);
            floor
                .upsert_table(&table_id, id, &table_name, n == RESERVED_INDEX, n as i64)
                .await?;
            tables += 1;
        }
    }
    info!(departments = DEPARTMENTS.len(), tables, "Floor plan seeded");

    let promotions = sample_promotions();
    for promotion in &promotions {
        db.promotions().upsert(promotion).await?;
    }
    info!(count = promotions.len(), "Promotions seeded");

    db.close().await;
    Ok(())
}

fn sample_promotions() -> Vec<Promotion> {
    vec![
        Promotion {
            id: "promo-bar-10".into(),
            name: "Bar -10%".into(),
            is_active: true,
            conditions: vec![PromotionCondition {
                kind: ConditionKind::Category,
                operator: ConditionOperator::Gte,
                unit: ConditionUnit::Qty,
                value: 1,
                target_ids: vec!["bar".into()],
                target_names: vec!["bar".into()],
            }],
            result: PromotionResult {
                kind: DiscountKind::PercentDiscount,
                value: 10,
            },
        },
        Promotion {
            id: "promo-big-check".into(),
            name: "Minus 100 over 1000".into(),
            is_active: true,
            conditions: vec![PromotionCondition {
                kind: ConditionKind::TotalAmount,
                operator: ConditionOperator::Gte,
                unit: ConditionUnit::Uah,
                value: Money::from_major(1000).minor_units(),
                target_ids: vec![],
                target_names: vec![],
            }],
            result: PromotionResult {
                kind: DiscountKind::FixedDiscount,
                value: Money::from_major(100).minor_units(),
            },
        },
        Promotion {
            id: "promo-billiards-3h".into(),
            name: "Billiards 3h".into(),
            is_active: false,
            conditions: vec![PromotionCondition {
                kind: ConditionKind::Product,
                operator: ConditionOperator::Gte,
                unit: ConditionUnit::Qty,
                value: 3,
                target_ids: vec!["billiards-hour".into()],
                target_names: vec![],
            }],
            result: PromotionResult {
                kind: DiscountKind::PercentDiscount,
                value: 15,
            },
        },
    ]
}
