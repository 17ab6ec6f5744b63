use super::cart::CartService;
use super::catalog::CatalogService;
use super::id_generator::IdGenerator;
use super::orders::OrderCoordinator;
use crate::config::StoreConfig;
use crate::domain::ports::StoreHandle;

/// Every service of the store wired over one storage handle.
#[derive(Clone)]
pub struct Storefront {
    pub ids: IdGenerator,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub orders: OrderCoordinator,
}

impl Storefront {
    pub fn new(store: StoreHandle, config: &StoreConfig) -> Self {
        let ids = IdGenerator::new(store.clone(), config.id_retry.clone());
        Self {
            catalog: CatalogService::new(store.clone(), ids.clone(), config.cart_retry.clone()),
            carts: CartService::new(store.clone(), ids.clone(), config.cart_retry.clone()),
            orders: OrderCoordinator::new(
                store,
                ids.clone(),
                config.order_retry.clone(),
                config.order_timeout,
            ),
            ids,
        }
    }
}
