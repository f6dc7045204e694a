//! Warehouse order domain module.
//!
//! Cart-based transfer requests from a division to the main warehouse:
//! request, approval, delivery and receipt. Pure state transitions only; the
//! stock movements that accompany delivery and receipt are posted by the
//! caller's unit of work.

pub mod number;
pub mod order;
pub mod policy;
pub mod reject;

pub use number::{format_order_number, sequence_key};
pub use order::{
    CartLine, OrderAction, OrderRequest, WarehouseOrder, WarehouseOrderStatus, validate_carts,
};
pub use reject::WarehouseOrderReject;
