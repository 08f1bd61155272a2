//! Walk one listing through its whole life: list, browse, like, settle,
//! ship, complete, then print both eco ledgers.
//!
//! Run with `cargo run --example marketplace`. Set RUST_LOG=debug to watch
//! the service layer narrate each step.

use eco_market::product::{Category, Condition, ProductDraft, SearchFilter};
use eco_market::service::MarketService;
use eco_market::transaction::{DeliveryMethod, TransactionStatus};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // start from a clean slate on every run
    let _ = std::fs::remove_dir_all("eco-market-demo");
    let db = Arc::new(sled::open("eco-market-demo")?);
    let service = MarketService::new(db)?;

    let maya = service.register_user("Maya", "maya@example.com")?;
    let tom = service.register_user("Tom", "tom@example.com")?;

    let draft = ProductDraft::new()
        .set_title("Trek mountain bike")
        .set_description("Barely used, full suspension, serviced last month")
        .set_price(4_000)
        .set_original_price(11_000)
        .set_category(Category::Sports)
        .set_condition(Condition::Good)
        .set_location("Brighton");
    let bike = service.create_listing(&maya.id, draft)?;
    println!(
        "listed {:?} saving an estimated {}kg of CO2 and {}l of water",
        bike.title, bike.eco_impact.co2_saved, bike.eco_impact.water_saved
    );

    // Tom browses, looks twice and likes what he sees
    service.view_product(&bike.id)?;
    service.view_product(&bike.id)?;
    service.toggle_like(&bike.id, &tom.id)?;

    let filter = SearchFilter::new()
        .set_category(Category::Sports)
        .set_text("bike");
    for hit in service.search(&filter)? {
        println!("found {:?} in {} for {}", hit.title, hit.location, hit.price);
    }

    let order = service.settle(
        &bike.id,
        &tom.id,
        DeliveryMethod::Delivery {
            address: "12 North Road, Brighton".to_string(),
        },
    )?;
    println!("settled {} at {}", order.id, order.price);

    service.update_transaction_status(&order.id, &maya.id, TransactionStatus::Shipped)?;
    service.update_transaction_status(&order.id, &tom.id, TransactionStatus::Delivered)?;
    service.update_transaction_status(&order.id, &tom.id, TransactionStatus::Completed)?;

    println!("seller ledger: {:#?}", service.eco_stats(&maya.id)?);
    println!("buyer ledger: {:#?}", service.eco_stats(&tom.id)?);

    for purchase in service.purchases(&tom.id)? {
        println!("Tom bought {} for {}", purchase.product, purchase.price);
    }

    Ok(())
}
