use crate::domain::catalog::ProductVariant;
use crate::domain::order::Order;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct OrderRow<'a> {
    order: &'a str,
    user: &'a str,
    total: String,
    status: &'static str,
    payment: &'a str,
    items: usize,
}

#[derive(Serialize)]
struct StockRow<'a> {
    variant: &'a str,
    price: String,
    stock: u32,
}

/// Writes placed orders and variant stock levels as CSV.
pub struct OrderWriter<W: Write> {
    writer: W,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Header `order,user,total,status,payment,items`, one row per order.
    pub fn write_orders<'a>(&mut self, orders: impl IntoIterator<Item = &'a Order>) -> Result<()> {
        let mut csv = csv::Writer::from_writer(&mut self.writer);
        let mut wrote = false;
        for order in orders {
            csv.serialize(OrderRow {
                order: &order.order_id,
                user: &order.user_id,
                total: order.total_amount.to_string(),
                status: order.status.as_str(),
                payment: order.payment_method.as_str(),
                items: order.items.len(),
            })?;
            wrote = true;
        }
        if !wrote {
            csv.write_record(["order", "user", "total", "status", "payment", "items"])?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Header `variant,price,stock`, one row per variant.
    pub fn write_stock<'a>(
        &mut self,
        variants: impl IntoIterator<Item = &'a ProductVariant>,
    ) -> Result<()> {
        let mut csv = csv::Writer::from_writer(&mut self.writer);
        let mut wrote = false;
        for variant in variants {
            csv.serialize(StockRow {
                variant: &variant.variant_id,
                price: variant.price.value().to_string(),
                stock: variant.stock_quantity,
            })?;
            wrote = true;
        }
        if !wrote {
            csv.write_record(["variant", "price", "stock"])?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
