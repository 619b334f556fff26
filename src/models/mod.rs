//! Table-mapped row types and API projections.

pub mod address;
pub mod admin;
pub mod category;
pub mod customer;
pub mod order;
pub mod product;
pub mod user;

pub use address::Address;
pub use admin::{Admin, AdminProfile};
pub use category::Category;
pub use customer::{Customer, CustomerWithOrders, OrderSummary};
pub use order::{
    Order, OrderDetail, OrderItem, OrderItemDetail, OrderStatus, OrderStatusHistoryEntry,
    UserSummary,
};
pub use product::{Product, ProductSummary, ProductVariant};
pub use user::{User, UserProfile};
