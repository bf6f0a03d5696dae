//! # Seed Data Generator
//!
//! Populates the database with a small store for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p caja-db --bin seed
//!
//! # Specify database path
//! cargo run -p caja-db --bin seed -- --db ./data/caja.db
//! ```
//!
//! ## Generated Data
//! - Categories: Bebidas, Snacks, Lácteos, Abarrotes
//! - Products per category, code `{PREFIX}-{NNN}`, opening stock recorded as
//!   an `INITIAL` IN movement
//! - Two promotions: 10% on Bebidas and a fixed $200 off two snacks

use std::collections::HashSet;
use std::env;

use chrono::Utc;
use caja_core::{MovementType, Product, Promotion, PromotionKind, REASON_INITIAL};
use caja_db::{Database, DbConfig, InventoryRepository, ProductRepository, PromotionRepository};
use uuid::Uuid;

/// (category name, code prefix, [(product name, price in pesos)])
const CATALOG: &[(&str, &str, &[(&str, i64)])] = &[
    (
        "Bebidas",
        "BEB",
        &[
            ("Coca-Cola 1.5L", 1990),
            ("Sprite 1.5L", 1790),
            ("Agua Mineral 600ml", 790),
            ("Jugo Naranja 1L", 1490),
            ("Cerveza Lager 355ml", 990),
        ],
    ),
    (
        "Snacks",
        "SNK",
        &[
            ("Papas Fritas 150g", 1590),
            ("Galletas Chocolate", 890),
            ("Maní Salado 200g", 1290),
            ("Barra de Cereal", 450),
        ],
    ),
    (
        "Lácteos",
        "LAC",
        &[
            ("Leche Entera 1L", 1090),
            ("Yogurt Frutilla", 390),
            ("Queso Gauda 250g", 3290),
            ("Mantequilla 250g", 2490),
        ],
    ),
    (
        "Abarrotes",
        "ABA",
        &[
            ("Arroz Grado 1 1kg", 1390),
            ("Fideos Spaghetti 400g", 890),
            ("Azúcar 1kg", 1190),
            ("Aceite Maravilla 1L", 2690),
            ("Sal de Mesa 1kg", 490),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./caja_dev.db");

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
                println!("Caja POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./caja_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Caja POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let mut generated = 0;
    let mut drinks_category = None;
    let mut snack_ids = Vec::new();

    for (category_name, prefix, products) in CATALOG {
        let category = db.categories().create(category_name).await?;

        for (index, (name, price)) in products.iter().enumerate() {
            let seed = generated + index;
            let product = generate_product(prefix, index, name, *price, &category.id, seed);
            let opening_stock = 5 + ((seed * 13) % 60) as i64;

            let mut tx = db.begin().await?;
            if let Err(e) = ProductRepository::insert(&mut tx, &product).await {
                eprintln!("Failed to insert {}: {}", product.code, e);
                continue;
            }
            InventoryRepository::register_movement(
                &mut tx,
                &product.id,
                MovementType::In,
                opening_stock,
                REASON_INITIAL,
            )
            .await?;
            tx.commit().await?;

            if *prefix == "SNK" && snack_ids.len() < 2 {
                snack_ids.push(product.id.clone());
            }
        }

        generated += products.len();
        println!("  {:<10} {} products", category_name, products.len());

        if *prefix == "BEB" {
            drinks_category = Some(category.id);
        }
    }

    println!();
    println!("Generating promotions...");

    let mut tx = db.begin().await?;
    let drinks = promotion("Bebidas 10%", PromotionKind::Percent, 1_000, drinks_category);
    PromotionRepository::insert(&mut tx, &drinks, &HashSet::new()).await?;

    let snacks = promotion("Snacks $200", PromotionKind::Fixed, 20_000, None);
    let members: HashSet<String> = snack_ids.into_iter().collect();
    PromotionRepository::insert(&mut tx, &snacks, &members).await?;
    tx.commit().await?;

    println!("  {}", drinks.name);
    println!("  {}", snacks.name);

    println!();
    println!("✓ Seed complete! {} products", db.products().count().await?);

    Ok(())
}

/// Builds one product with thresholds derived from its position.
fn generate_product(
    prefix: &str,
    index: usize,
    name: &str,
    price: i64,
    category_id: &str,
    seed: usize,
) -> Product {
    let now = Utc::now();
    let min_stock = 5 + (seed % 6) as i64;

    Product {
        id: Uuid::new_v4().to_string(),
        code: format!("{}-{:03}", prefix, index + 1),
        name: name.to_string(),
        category_id: Some(category_id.to_string()),
        price_cents: price * 100,
        stock: 0,
        min_stock,
        critical_stock: min_stock / 2,
        active: true,
        top_seller: seed % 4 == 0,
        created_at: now,
        updated_at: now,
    }
}

fn promotion(name: &str, kind: PromotionKind, value: i64, category_id: Option<String>) -> Promotion {
    Promotion {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        kind,
        value,
        active: true,
        category_id,
        created_at: Utc::now(),
    }
}
