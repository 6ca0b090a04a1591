//! # Seed Data Generator
//!
//! Populates the database with a demo venue for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p cantina-db --bin seed
//!
//! # Specify database path and store id
//! cargo run -p cantina-db --bin seed -- --db ./data/cantina.db --store demo-store
//! ```
//!
//! ## Generated Data
//! - Three storage locations (Warehouse default, Main Bar, Kitchen)
//! - A catalog of bar/kitchen inventory items
//! - Opening purchases landing everything in the warehouse, with
//!   movement log and audit trail entries
//! - A menu setup: fallback "All Day", a weekend menu and a late-night
//!   happy hour with a midnight-wrapping time rule

use chrono::Utc;
use std::env;

use cantina_core::ledger::{deposit, LocationStock};
use cantina_core::{
    AuditAction, AuditEntry, InventoryItem, LocationType, Menu, MenuProduct, MenuRule, Movement,
    MovementType, RuleConfig, RuleType, SessionType, UnitType,
};
use cantina_db::repository::new_id;
use cantina_db::{Database, DbConfig};

/// (sku, name, unit, package size, cost ¢/unit, sale ¢/unit, packages bought)
const CATALOG: &[(&str, &str, UnitType, f64, i64, Option<i64>, i64)] = &[
    ("GIN-750", "London Dry Gin 750ml", UnitType::Milliliter, 750.0, 3, Some(12), 6),
    ("RUM-700", "Dark Rum 700ml", UnitType::Milliliter, 700.0, 3, Some(11), 4),
    ("TONIC-200", "Tonic Water 200ml", UnitType::Count, 24.0, 90, Some(350), 3),
    ("COFFEE-1K", "Espresso Beans 1kg", UnitType::Gram, 1000.0, 2, None, 8),
    ("MILK-1L", "Whole Milk 1L", UnitType::Milliliter, 1000.0, 1, None, 12),
    ("SYRUP-VAN", "Vanilla Syrup 750ml", UnitType::Milliliter, 750.0, 2, None, 2),
    ("WINE-MAL", "Malbec 750ml", UnitType::Milliliter, 750.0, 4, Some(15), 12),
    ("CROISSANT", "Butter Croissant", UnitType::Count, 6.0, 120, Some(380), 4),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./cantina_dev.db");
    let mut store_id = String::from("demo-store");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--store" | "-s" => {
                if i + 1 < args.len() {
                    store_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cantina Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: ./cantina_dev.db)");
                println!("  -s, --store <ID>    Store id to seed (default: demo-store)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Cantina Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Store:    {}", store_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.items().count(&store_id).await?;
    if existing > 0 {
        println!("⚠ Store already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Locations: the first created becomes the default
    let warehouse = db
        .locations()
        .create(&store_id, "Warehouse", LocationType::Warehouse)
        .await?;
    let bar = db
        .locations()
        .create(&store_id, "Main Bar", LocationType::PointOfSale)
        .await?;
    let kitchen = db
        .locations()
        .create(&store_id, "Kitchen", LocationType::Kitchen)
        .await?;
    println!(
        "✓ Locations: {} (default), {}, {}",
        warehouse.name, bar.name, kitchen.name
    );

    // Catalog + opening purchases into the warehouse
    let supplier_id = new_id();
    let mut seeded = 0;

    for (sku, name, unit_type, package_size, cost, sale, packages) in CATALOG {
        let now = Utc::now();
        let quantity = *packages as f64 * package_size;

        let item = InventoryItem {
            id: new_id(),
            store_id: store_id.clone(),
            sku: sku.to_string(),
            name: name.to_string(),
            unit_type: *unit_type,
            package_size: *package_size,
            cost_cents: *cost,
            sale_price_cents: *sale,
            current_stock: quantity,
            min_stock: package_size * 2.0,
            supplier_id: Some(supplier_id.clone()),
            last_purchase_price_cents: Some(*cost),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.items().insert(&item).await?;

        // Ledger row, movement and audit entry for the opening purchase
        let stocked = deposit(&LocationStock::empty(), *package_size, quantity, None);
        let mut tx = db.pool().begin().await?;
        db.stock()
            .put_tx(&mut tx, &store_id, &item.id, &warehouse.id, &stocked.after, now)
            .await?;
        db.movements()
            .append_tx(
                &mut tx,
                &Movement {
                    id: new_id(),
                    store_id: store_id.clone(),
                    item_id: item.id.clone(),
                    from_location_id: None,
                    to_location_id: Some(warehouse.id.clone()),
                    quantity,
                    movement_type: MovementType::Purchase,
                    reason: "Opening stock".to_string(),
                    notes: None,
                    user_id: "seed".to_string(),
                    supplier_id: Some(supplier_id.clone()),
                    unit_cost_cents: Some(*cost),
                    invoice_ref: Some("SEED-0001".to_string()),
                    order_id: None,
                    idempotency_key: None,
                    created_at: now,
                },
            )
            .await?;
        tx.commit().await?;

        db.audit()
            .append(&AuditEntry {
                id: new_id(),
                store_id: store_id.clone(),
                item_id: item.id.clone(),
                action_type: AuditAction::Purchase,
                quantity_delta: quantity,
                reason: "Opening stock".to_string(),
                location_from: None,
                location_to: Some(warehouse.id.clone()),
                supplier_id: Some(supplier_id.clone()),
                invoice_ref: Some("SEED-0001".to_string()),
                unit_cost_cents: Some(*cost),
                user_id: "seed".to_string(),
                order_id: None,
                created_at: now,
            })
            .await?;

        seeded += 1;
        println!("  {} × {} packages → Warehouse", sku, packages);
    }

    println!("✓ Seeded {} items", seeded);

    // Menus: fallback + weekend + late-night happy hour
    let all_day = Menu {
        id: new_id(),
        store_id: store_id.clone(),
        name: "All Day".to_string(),
        description: Some("Default catalog".to_string()),
        priority: 100,
        is_active: true,
        is_fallback: true,
        created_at: Utc::now(),
        rules: vec![],
    };
    db.menus().insert_menu(&all_day).await?;

    let weekend = Menu {
        id: new_id(),
        store_id: store_id.clone(),
        name: "Weekend".to_string(),
        description: None,
        priority: 20,
        is_active: true,
        is_fallback: false,
        created_at: Utc::now(),
        rules: vec![],
    };
    db.menus().insert_menu(&weekend).await?;
    db.menus()
        .insert_rule(&MenuRule {
            id: new_id(),
            menu_id: weekend.id.clone(),
            rule_type: RuleType::Weekdays,
            config: RuleConfig::Weekdays { days: vec![5, 6] },
            is_active: true,
        })
        .await?;

    let happy_hour = Menu {
        id: new_id(),
        store_id: store_id.clone(),
        name: "Late Happy Hour".to_string(),
        description: None,
        priority: 10,
        is_active: true,
        is_fallback: false,
        created_at: Utc::now(),
        rules: vec![],
    };
    db.menus().insert_menu(&happy_hour).await?;
    db.menus()
        .insert_rule(&MenuRule {
            id: new_id(),
            menu_id: happy_hour.id.clone(),
            rule_type: RuleType::TimeRange,
            config: RuleConfig::TimeRange {
                from: "22:00".to_string(),
                to: "02:00".to_string(),
            },
            is_active: true,
        })
        .await?;
    db.menus()
        .insert_rule(&MenuRule {
            id: new_id(),
            menu_id: happy_hour.id.clone(),
            rule_type: RuleType::SessionType,
            config: RuleConfig::SessionType {
                values: vec![SessionType::Bar, SessionType::Table],
            },
        is_active: true,
        })
        .await?;

    // Sellables onto the menus
    let mut sort = 0;
    for (sku, ..) in CATALOG {
        let Some(item) = db.items().get_by_sku(&store_id, sku).await? else {
            continue;
        };
        if item.sale_price_cents.is_none() {
            continue;
        }

        db.menus()
            .insert_menu_product(&MenuProduct {
                id: new_id(),
                menu_id: all_day.id.clone(),
                product_id: item.id.clone(),
                price_override_cents: None,
                sort_order: sort,
                is_visible: true,
            })
            .await?;
        // Happy hour: 20% off
        db.menus()
            .insert_menu_product(&MenuProduct {
                id: new_id(),
                menu_id: happy_hour.id.clone(),
                product_id: item.id.clone(),
                price_override_cents: item.sale_price_cents.map(|p| p * 80 / 100),
                sort_order: sort,
                is_visible: true,
            })
            .await?;
        sort += 1;
    }

    println!("✓ Menus: All Day (fallback), Weekend, Late Happy Hour");
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
