//! A tiny order service whose public methods go through the interceptor.

use std::collections::HashMap;
use std::time::Duration;

use spanwrap::{
    call_site, CallSite, Interceptor, MethodSignature, Parameter, SourceLocation, TraceSink,
};
use thiserror::Error;

pub static PLACE_ORDER: MethodSignature =
    MethodSignature::new("ru::shop", Some("OrderService"), "place_order")
        .with_params(&[Parameter::new("sku", "&str"), Parameter::new("qty", "u32")])
        .returning("u64");

pub static CANCEL_ORDER: MethodSignature =
    MethodSignature::new("ru::shop", Some("OrderService"), "cancel_order")
        .with_params(&[Parameter::new("order_id", "u64")]);

pub static SHIP: MethodSignature = MethodSignature::new("ru::shop", Some("OrderService"), "ship")
    .with_params(&[Parameter::new("order_id", "u64")]);

pub static GET_TOTAL_STOCK: MethodSignature =
    MethodSignature::new("ru::shop", Some("OrderService"), "get_total_stock").returning("u32");

/// Emitted by generated glue code; carries no real source line.
pub static AUDIT: MethodSignature =
    MethodSignature::new("ru::shop", Some("OrderServiceProxy"), "audit");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShopError {
    #[error("unknown sku: {0}")]
    UnknownSku(String),

    #[error("insufficient stock for {sku}: wanted {wanted}, have {available}")]
    InsufficientStock {
        sku: String,
        wanted: u32,
        available: u32,
    },

    #[error("unknown order: {0}")]
    UnknownOrder(u64),
}

#[derive(Debug, Default)]
struct Inventory {
    stock: HashMap<String, u32>,
    orders: HashMap<u64, (String, u32)>,
    next_id: u64,
}

impl Inventory {
    fn reserve(&mut self, sku: &str, qty: u32) -> Result<u64, ShopError> {
        let available = self
            .stock
            .get_mut(sku)
            .ok_or_else(|| ShopError::UnknownSku(sku.to_string()))?;
        if *available < qty {
            return Err(ShopError::InsufficientStock {
                sku: sku.to_string(),
                wanted: qty,
                available: *available,
            });
        }
        *available -= qty;
        self.next_id += 1;
        self.orders.insert(self.next_id, (sku.to_string(), qty));
        Ok(self.next_id)
    }

    fn release(&mut self, order_id: u64) -> Result<(), ShopError> {
        let (sku, qty) = self
            .orders
            .remove(&order_id)
            .ok_or(ShopError::UnknownOrder(order_id))?;
        *self.stock.entry(sku).or_default() += qty;
        Ok(())
    }

    fn total(&self) -> u32 {
        self.stock.values().sum()
    }
}

/// Order service with every public method routed through an [`Interceptor`].
pub struct OrderService<S> {
    interceptor: Interceptor<S>,
    inventory: Inventory,
}

impl<S: TraceSink> OrderService<S> {
    pub fn new<'a>(interceptor: Interceptor<S>, stock: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        let inventory = Inventory {
            stock: stock
                .into_iter()
                .map(|(sku, qty)| (sku.to_string(), qty))
                .collect(),
            ..Inventory::default()
        };
        Self {
            interceptor,
            inventory,
        }
    }

    pub fn place_order(&mut self, sku: &str, qty: u32) -> Result<u64, ShopError> {
        let Self {
            interceptor,
            inventory,
        } = self;
        interceptor.intercept(&call_site!(PLACE_ORDER, sku, qty), || inventory.reserve(sku, qty))
    }

    pub fn cancel_order(&mut self, order_id: u64) -> Result<(), ShopError> {
        let Self {
            interceptor,
            inventory,
        } = self;
        interceptor.intercept(&call_site!(CANCEL_ORDER, order_id), || inventory.release(order_id))
    }

    /// Accessor: never traced.
    pub fn get_total_stock(&self) -> u32 {
        self.interceptor
            .intercept_infallible(&call_site!(GET_TOTAL_STOCK), || self.inventory.total())
    }

    /// Stand-in for generated glue code: a line-0 call-site, never traced.
    pub fn audit(&self) -> usize {
        let site = CallSite::new(&AUDIT, SourceLocation::synthetic());
        self.interceptor
            .intercept_infallible(&site, || self.inventory.orders.len())
    }

    pub async fn ship(&self, order_id: u64) -> Result<(), ShopError> {
        let known = self.inventory.orders.contains_key(&order_id);
        self.interceptor
            .intercept_async(call_site!(SHIP, order_id), async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if known {
                    Ok(())
                } else {
                    Err(ShopError::UnknownOrder(order_id))
                }
            })
            .await
    }
}
