use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub cart_id: u64,
    pub owner: Customer,
    pub lines: Vec<CartLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,
    #[deprecated]
    pub legacy_total: f64,
}

#[derive(Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    #[validate(range(min = 1, max = 99))]
    pub quantity: u32,
}

#[derive(Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub status: ProductStatus,
    pub prices: HashMap<Currency, f64>,
    pub attributes: HashMap<String, String>,
    pub related: Vec<Product>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductStatus {
    InStock,
    BackOrdered,
    Discontinued,
}

#[derive(Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Currency {
    Eur,
    Usd,
}

pub mod customers {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    pub struct Customer {
        pub id: CustomerId,
        pub referrer: Option<Box<Customer>>,
    }

    #[derive(Serialize, Deserialize)]
    pub struct CustomerId(pub u64);
}

#[derive(Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}
