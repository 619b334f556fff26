//! Business logic over the pool: transactions, totals, dynamic list
//! queries. Handlers stay thin and call in here.

pub mod addresses;
pub mod customers;
pub mod orders;
pub mod products;

pub use addresses::AddressService;
pub use customers::CustomerService;
pub use orders::OrderService;
pub use products::ProductService;
