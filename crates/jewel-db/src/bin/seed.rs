//! # Seed Data Generator
//!
//! Populates the database with a demo jewelry catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 120 products (default)
//! cargo run -p jewel-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p jewel-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p jewel-db --bin seed -- --db ./data/storefront.db
//! ```
//!
//! ## Generated Products
//! Every category gets a handful of designs, each in several metal
//! finishes. Each product has:
//! - Name: `{design} ({finish})`
//! - INR price derived from weight and finish, BHD price at a fixed rate
//! - Gross weight, and net weight a little below it
//! - Stock: 0 - 12

use chrono::Utc;
use jewel_core::{Category, Product};
use jewel_db::{Database, DbConfig};
use std::env;
use uuid::Uuid;

/// Designs per category.
const DESIGNS: &[(Category, &[&str])] = &[
    (
        Category::Rings,
        &["Solitaire Ring", "Floral Cocktail Ring", "Classic Band", "Navratna Ring"],
    ),
    (
        Category::NecklacesChains,
        &["Temple Necklace", "Rope Chain", "Choker", "Kasu Mala"],
    ),
    (
        Category::Earrings,
        &["Jhumka", "Chandbali", "Diamond Studs", "Hoop Earrings"],
    ),
    (
        Category::BraceletsBangles,
        &["Kada Bangle", "Tennis Bracelet", "Filigree Bangle Pair"],
    ),
    (
        Category::PendantsLockets,
        &["Om Pendant", "Heart Locket", "Peacock Pendant"],
    ),
    (Category::Mangalsutra, &["Classic Mangalsutra", "Diamond Mangalsutra"]),
    (Category::NoseJewellery, &["Nose Pin", "Nath", "Septum Ring"]),
    (Category::AnkletsToeRings, &["Ghungroo Anklet", "Toe Ring Pair"]),
    (Category::BroochesPins, &["Saree Pin", "Peacock Brooch"]),
    (Category::KidsJewellery, &["Baby Bangles", "Nazariya Bracelet"]),
    (
        Category::BridalCollections,
        &["Bridal Haram Set", "Polki Bridal Set", "Maang Tikka"],
    ),
    (
        Category::MaterialGemstone,
        &["Ruby Cabochon", "Emerald Loose Stone", "Gold Coin"],
    ),
];

/// Finishes with their price per gram in paise.
const FINISHES: &[(&str, i64)] = &[
    ("22K Gold", 680_000),
    ("18K Gold", 560_000),
    ("Rose Gold", 565_000),
    ("Sterling Silver", 9_500),
];

/// Paise per fils at the demo exchange rate.
const INR_PER_BHD_FILS: i64 = 22;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 120;
    let mut db_path = String::from("./data/storefront.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(120);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Jewel Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 120)");
                println!("  -d, --db <PATH>    Database file path (default: ./data/storefront.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("💍 Jewel Storefront Seed Data Generator");
    println!("=======================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    // Connect to database
    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let mut seed = 0;
    let start = std::time::Instant::now();

    'outer: loop {
        for (category, designs) in DESIGNS {
            for design in designs.iter() {
                for (finish, paise_per_gram) in FINISHES {
                    if generated >= count {
                        break 'outer;
                    }

                    let product = generate_product(*category, design, finish, *paise_per_gram, seed);
                    seed += 1;

                    if let Err(e) = db.products().insert(&product).await {
                        eprintln!("Failed to insert {}: {}", product.name, e);
                        continue;
                    }

                    generated += 1;

                    if generated % 50 == 0 {
                        println!("  Generated {} products...", generated);
                    }
                }
            }
        }

        // Larger counts cycle through the catalog again
        if seed == 0 {
            break;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    println!();
    println!("Products per category:");
    for (category, _) in DESIGNS {
        let listed = db.products().list_active(Some(*category)).await?;
        println!("  {:<20} {}", category.as_str(), listed.len());
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Generates a single product with plausible data.
fn generate_product(
    category: Category,
    design: &str,
    finish: &str,
    paise_per_gram: i64,
    seed: usize,
) -> Product {
    let now = Utc::now();

    // 2.000 g - 41.999 g
    let gross_weight_mg = 2_000 + ((seed * 7_919) % 40_000) as i64;
    // Stones and solder: net is 92-99% of gross
    let net_weight_mg = gross_weight_mg * (92 + (seed % 8) as i64) / 100;

    let price_inr_minor = net_weight_mg * paise_per_gram / 1_000;
    let price_bhd_minor = price_inr_minor / INR_PER_BHD_FILS;

    let name = if seed < DESIGNS.iter().map(|(_, d)| d.len()).sum::<usize>() * FINISHES.len() {
        format!("{} ({})", design, finish)
    } else {
        format!("{} ({}) #{}", design, finish, seed)
    };

    Product {
        id: Uuid::new_v4().to_string(),
        name,
        description: format!(
            "{} in {}, {} category. Hallmarked and certified.",
            design,
            finish,
            category.as_str().replace('_', " ").to_lowercase()
        ),
        category,
        price_inr_minor,
        price_bhd_minor,
        gross_weight_mg: Some(gross_weight_mg),
        net_weight_mg: Some(net_weight_mg),
        stock: (seed % 13) as i64,
        images: Vec::new(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
