//! Basic usage example of the geographic data cache.

use geodata_cache::schema::{CITIES, STATES};
use geodata_cache::store::{InMemoryConnector, InMemoryStore};
use geodata_cache::{
    error::Result, CacheStrategy, ConnectionConfig, DataService, Document, Error, Filter,
};
use serde_json::json;

fn doc(value: serde_json::Value) -> Document {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Geodata Cache - Basic Example ===\n");

    // 1. Seed an in-memory store standing in for the database
    println!("1. Seeding the document store...");
    let store = InMemoryStore::new();
    store.seed(
        CITIES,
        vec![
            doc(json!({"name": "Apex", "population": 60000, "state_code": "NC"})),
            doc(json!({"name": "Austin", "population": 960000, "state_code": "TX"})),
        ],
    );
    store.seed(
        STATES,
        vec![doc(json!({"state_code": "NC", "name": "North Carolina", "population": 10700000}))],
    );
    println!("   ✓ Store ready\n");

    // 2. Start the service (connects eagerly)
    println!("2. Starting the data service...");
    let service = DataService::start(
        ConnectionConfig::from_env()?,
        InMemoryConnector::new(store.clone()),
    )
    .await?;
    let repo = service.repository();
    println!("   ✓ Connected: {}\n", service.connections().is_connected());

    // 3. First listing - snapshot miss, full fetch from the store
    println!("3. First listing of cities:");
    let cities = repo.fetch_all(CITIES, None).await?;
    println!("   ✓ {} cities (store fetches: {})\n", cities.len(), store.calls().find_all);

    // 4. Filtered listing - served from the snapshot
    println!("4. Cities in NC (from snapshot):");
    let nc = Filter::new().equals("state_code", "NC");
    for city in repo.fetch_all(CITIES, Some(&nc)).await? {
        println!("   - {} ({})", city["name"], city["population"]);
    }
    println!("   ✓ Store fetches still: {}\n", store.calls().find_all);

    // 5. Create - validated, written, snapshot invalidated
    println!("5. Creating Cary:");
    repo.create(
        CITIES,
        doc(json!({"name": "Cary", "population": 180000, "state_code": "NC"})),
    )
    .await?;
    println!(
        "   ✓ Created; cached collections now: {:?}\n",
        service.cache().cached_collections()
    );

    // 6. Duplicate create - rejected before any write
    println!("6. Creating Apex again:");
    match repo
        .create(CITIES, doc(json!({"name": "Apex", "population": 1})))
        .await
    {
        Err(e @ Error::DuplicateKey { .. }) => {
            println!("   ✓ Rejected ({}): {}\n", e.signal().status_code(), e)
        }
        other => println!("   ✗ Unexpected: {:?}\n", other),
    }

    // 7. Update - merged and re-read fresh
    println!("7. Updating Apex population:");
    let apex = repo
        .update(CITIES, "Apex", doc(json!({"population": 65000})))
        .await?;
    println!("   ✓ Apex now has {} residents\n", apex["population"]);

    // 8. Bypass strategy - read the store directly
    println!("8. Bypass strategy (skip cache):");
    let direct = repo
        .fetch_all_with(STATES, None, CacheStrategy::Bypass)
        .await?;
    println!(
        "   ✓ {} states, cached: {}\n",
        direct.len(),
        service.cache().peek(STATES).is_some()
    );

    // 9. Disconnect - every operation fails fast
    println!("9. After disconnect:");
    service.connections().disconnect();
    match repo.count(CITIES).await {
        Err(e) => println!("   ✓ {} (signal: {})\n", e, e.signal()),
        Ok(n) => println!("   ✗ Unexpected count {}\n", n),
    }

    let stats = service.cache().stats();
    println!(
        "=== Stats: {} hits, {} misses, {} invalidations ===\n",
        stats.hits, stats.misses, stats.invalidations
    );

    service.shutdown();
    Ok(())
}
