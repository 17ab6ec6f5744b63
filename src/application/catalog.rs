use super::id_generator::IdGenerator;
use super::retry::{RetryConfig, retry_on_conflict};
use super::unit_of_work::UnitOfWork;
use crate::domain::catalog::{Product, ProductVariant, Rarity};
use crate::domain::money::Price;
use crate::domain::ports::{StoreHandle, Table};
use crate::error::{Result, StoreError};
use tracing::{info, instrument};

/// Products, rarities and the variants that combine them.
#[derive(Clone)]
pub struct CatalogService {
    store: StoreHandle,
    ids: IdGenerator,
    retry: RetryConfig,
}

impl CatalogService {
    pub fn new(store: StoreHandle, ids: IdGenerator, retry: RetryConfig) -> Self {
        Self { store, ids, retry }
    }

    #[instrument(skip(self))]
    pub async fn create_product(&self, name: &str, image_url: Option<&str>) -> Result<Product> {
        require_name("Product", name)?;
        let product = Product {
            product_id: self.ids.generate_id("PROD").await?,
            name: name.trim().to_string(),
            image_url: image_url.map(str::to_string),
        };

        let mut uow = UnitOfWork::begin(self.store.clone());
        uow.put(Table::Products, product.product_id.as_str(), &product)?;
        uow.commit().await?;
        info!(product_id = %product.product_id, "Created product");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn create_rarity(&self, name: &str) -> Result<Rarity> {
        require_name("Rarity", name)?;
        let rarity = Rarity {
            rarity_id: self.ids.generate_id("RAR").await?,
            name: name.trim().to_string(),
        };

        let mut uow = UnitOfWork::begin(self.store.clone());
        uow.put(Table::Rarities, rarity.rarity_id.as_str(), &rarity)?;
        uow.commit().await?;
        info!(rarity_id = %rarity.rarity_id, "Created rarity");
        Ok(rarity)
    }

    /// Adds a variant for an existing product and rarity. Each
    /// `(product, rarity)` pair can have only one variant.
    #[instrument(skip(self))]
    pub async fn create_variant(
        &self,
        product_id: &str,
        rarity_id: &str,
        price: Price,
        stock_quantity: u32,
    ) -> Result<ProductVariant> {
        retry_on_conflict(&self.retry, || async {
            let mut uow = UnitOfWork::begin(self.store.clone());
            uow.require::<Product>(Table::Products, product_id, "product")
                .await?;
            uow.require::<Rarity>(Table::Rarities, rarity_id, "rarity")
                .await?;

            let existing: Vec<ProductVariant> = uow.scan(Table::Variants, "").await?;
            if let Some(v) = existing
                .iter()
                .find(|v| v.product_id == product_id && v.rarity_id == rarity_id)
            {
                return Err(StoreError::ValidationError(format!(
                    "Variant {} already exists for {product_id}/{rarity_id}",
                    v.variant_id
                )));
            }

            let variant = ProductVariant {
                variant_id: self.ids.generate_id("VAR").await?,
                product_id: product_id.to_string(),
                rarity_id: rarity_id.to_string(),
                price,
                stock_quantity,
            };
            uow.put(Table::Variants, variant.variant_id.as_str(), &variant)?;
            uow.commit().await?;
            info!(variant_id = %variant.variant_id, "Created variant");
            Ok(variant)
        })
        .await
    }

    pub async fn get_variant(&self, variant_id: &str) -> Result<ProductVariant> {
        let mut uow = UnitOfWork::begin(self.store.clone());
        uow.require(Table::Variants, variant_id, "variant").await
    }

    /// All variants in ID order.
    pub async fn list_variants(&self) -> Result<Vec<ProductVariant>> {
        let mut uow = UnitOfWork::begin(self.store.clone());
        let mut variants: Vec<ProductVariant> = uow.scan(Table::Variants, "").await?;
        variants.sort_by(|a, b| {
            (a.variant_id.len(), &a.variant_id).cmp(&(b.variant_id.len(), &b.variant_id))
        });
        Ok(variants)
    }

    /// Changes the live price. Orders already placed keep their snapshot.
    #[instrument(skip(self))]
    pub async fn update_price(&self, variant_id: &str, price: Price) -> Result<ProductVariant> {
        retry_on_conflict(&self.retry, || async {
            let mut uow = UnitOfWork::begin(self.store.clone());
            let mut variant: ProductVariant =
                uow.require(Table::Variants, variant_id, "variant").await?;
            variant.price = price;
            uow.put(Table::Variants, variant_id, &variant)?;
            uow.commit().await?;
            Ok(variant)
        })
        .await
    }
}

fn require_name(entity: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::ValidationError(format!(
            "{entity} name is required"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn catalog() -> CatalogService {
        let store: StoreHandle = Arc::new(InMemoryStore::new());
        let ids = IdGenerator::new(store.clone(), RetryConfig::default());
        CatalogService::new(store, ids, RetryConfig::default())
    }

    #[tokio::test]
    async fn test_create_variant_for_existing_product_and_rarity() {
        let catalog = catalog();
        let product = catalog
            .create_product("Charizard", Some("https://img.example/charizard.png"))
            .await
            .unwrap();
        let rarity = catalog.create_rarity("Holo Rare").await.unwrap();
        assert_eq!(product.product_id, "PROD001");
        assert_eq!(rarity.rarity_id, "RAR001");

        let variant = catalog
            .create_variant(
                &product.product_id,
                &rarity.rarity_id,
                Price::new(dec!(12.50)).unwrap(),
                4,
            )
            .await
            .unwrap();
        assert_eq!(variant.variant_id, "VAR001");
        assert_eq!(catalog.get_variant("VAR001").await.unwrap(), variant);
    }

    #[tokio::test]
    async fn test_variant_requires_catalog_rows() {
        let catalog = catalog();
        let price = Price::new(dec!(1)).unwrap();
        assert!(matches!(
            catalog.create_variant("PROD001", "RAR001", price, 1).await,
            Err(StoreError::NotFound { entity: "product", .. })
        ));

        let product = catalog.create_product("Pikachu", None).await.unwrap();
        assert!(matches!(
            catalog
                .create_variant(&product.product_id, "RAR009", price, 1)
                .await,
            Err(StoreError::NotFound { entity: "rarity", .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_variant_rejected() {
        let catalog = catalog();
        let product = catalog.create_product("Mew", None).await.unwrap();
        let rarity = catalog.create_rarity("Common").await.unwrap();
        let price = Price::new(dec!(2)).unwrap();

        catalog
            .create_variant(&product.product_id, &rarity.rarity_id, price, 1)
            .await
            .unwrap();
        let second = catalog
            .create_variant(&product.product_id, &rarity.rarity_id, price, 1)
            .await;
        assert!(matches!(second, Err(StoreError::ValidationError(_))));
        assert_eq!(catalog.list_variants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_price() {
        let catalog = catalog();
        let product = catalog.create_product("Eevee", None).await.unwrap();
        let rarity = catalog.create_rarity("Rare").await.unwrap();
        let variant = catalog
            .create_variant(
                &product.product_id,
                &rarity.rarity_id,
                Price::new(dec!(5)).unwrap(),
                1,
            )
            .await
            .unwrap();

        let updated = catalog
            .update_price(&variant.variant_id, Price::new(dec!(7.25)).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.price.value(), dec!(7.25));
        assert_eq!(updated.stock_quantity, 1);
    }

    #[tokio::test]
    async fn test_blank_names_rejected() {
        let catalog = catalog();
        assert!(matches!(
            catalog.create_product("  ", None).await,
            Err(StoreError::ValidationError(_))
        ));
        assert!(matches!(
            catalog.create_rarity("").await,
            Err(StoreError::ValidationError(_))
        ));
    }
}
