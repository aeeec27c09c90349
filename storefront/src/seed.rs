// storefront/src/seed.rs

//! Demo catalogue for `SEED_DB=true`.

use crate::errors::Result;
use crate::models::Product;
use crate::store::Store;
use chrono::Utc;
use uuid::Uuid;

const CATALOGUE: &[(&str, &str, i64, i32)] = &[
  ("Yamaha F310 Acoustic Guitar", "guitars", 1_850_000, 12),
  ("Fender Player Stratocaster", "guitars", 11_500_000, 4),
  ("Casio CT-S300 Keyboard", "keyboards", 2_200_000, 9),
  ("Pearl Roadshow Drum Kit", "drums", 7_800_000, 3),
  ("Shure SM58 Microphone", "audio", 1_500_000, 20),
  ("Ernie Ball Regular Slinky Strings", "accessories", 4_500, 150),
];

pub async fn seed_catalogue(store: &dyn Store) -> Result<usize> {
  let now = Utc::now();
  for (name, category, price_cents, stock) in CATALOGUE {
    let product = Product {
      id: Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()),
      name: name.to_string(),
      description: None,
      category: Some(category.to_string()),
      price_cents: *price_cents,
      stock: *stock,
      image_url: None,
      created_at: now,
      updated_at: now,
    };
    store.insert_product(&product).await?;
  }
  tracing::info!("Seeded {} catalogue products.", CATALOGUE.len());
  Ok(CATALOGUE.len())
}
