use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Name of a capability the stock services check, such as `item.issue` or
/// `stock_opname.finalize`.
///
/// Names are `<resource>.<action>`; the constants below are the full set the
/// services ask for. `"*"` stands in for all of them in a grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stands in for every capability; meant for warehouse super-admins.
pub const WILDCARD: Permission = Permission::from_static("*");

pub const ITEM_ISSUE: Permission = Permission::from_static("item.issue");
pub const ITEM_ADJUST: Permission = Permission::from_static("item.adjust");
pub const ITEM_CONVERT: Permission = Permission::from_static("item.convert");

pub const WAREHOUSE_ORDER_VIEW: Permission = Permission::from_static("warehouse_order.view");
/// Global-view override: see and receive orders of every division.
pub const WAREHOUSE_ORDER_VIEW_ALL: Permission = Permission::from_static("warehouse_order.view_all");
pub const WAREHOUSE_ORDER_CREATE: Permission = Permission::from_static("warehouse_order.create");
pub const WAREHOUSE_ORDER_UPDATE: Permission = Permission::from_static("warehouse_order.update");
pub const WAREHOUSE_ORDER_DELETE: Permission = Permission::from_static("warehouse_order.delete");
pub const WAREHOUSE_ORDER_CONFIRM: Permission = Permission::from_static("warehouse_order.confirm");
pub const WAREHOUSE_ORDER_REJECT: Permission = Permission::from_static("warehouse_order.reject");
pub const WAREHOUSE_ORDER_REVISION: Permission = Permission::from_static("warehouse_order.revision");
pub const WAREHOUSE_ORDER_DELIVER: Permission = Permission::from_static("warehouse_order.deliver");
pub const WAREHOUSE_ORDER_RECEIVE: Permission = Permission::from_static("warehouse_order.receive");

pub const STOCK_OPNAME_VIEW: Permission = Permission::from_static("stock_opname.view");
/// Global override: act on opname sessions of every scope.
pub const STOCK_OPNAME_VIEW_ALL: Permission = Permission::from_static("stock_opname.view_all");
pub const STOCK_OPNAME_MANAGE: Permission = Permission::from_static("stock_opname.manage");
pub const STOCK_OPNAME_PROCESS: Permission = Permission::from_static("stock_opname.process");
pub const STOCK_OPNAME_FINALIZE: Permission = Permission::from_static("stock_opname.finalize");
