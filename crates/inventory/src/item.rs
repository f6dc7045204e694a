use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateRoot, DivisionId, DomainError, DomainResult, ItemId};

use crate::conversion::Conversion;

/// Where a balance is held: the central warehouse or a division sub-warehouse.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    MainWarehouse,
    Division(DivisionId),
}

impl Location {
    pub fn division_id(self) -> Option<DivisionId> {
        match self {
            Location::MainWarehouse => None,
            Location::Division(id) => Some(id),
        }
    }
}

impl From<Option<DivisionId>> for Location {
    fn from(value: Option<DivisionId>) -> Self {
        value.map_or(Location::MainWarehouse, Location::Division)
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Location::MainWarehouse => f.write_str("main-warehouse"),
            Location::Division(id) => write!(f, "division:{id}"),
        }
    }
}

/// Aggregate root: a stock-keeping item.
///
/// One item row per SKU; stock is a balance per [`Location`] rather than a
/// duplicated row per division. Every balance is non-negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    name: String,
    unit: String,
    multiplier: Option<u32>,
    reference_item_id: Option<ItemId>,
    balances: BTreeMap<Location, i64>,
    version: u64,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, unit: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            unit: unit.into(),
            multiplier: None,
            reference_item_id: None,
            balances: BTreeMap::new(),
            version: 0,
        })
    }

    /// Declare that one unit of this item breaks down into `multiplier` units of `reference`.
    pub fn with_conversion(mut self, multiplier: u32, reference: ItemId) -> DomainResult<Self> {
        if multiplier == 0 {
            return Err(DomainError::validation("multiplier must be at least 1"));
        }
        self.multiplier = Some(multiplier);
        self.reference_item_id = Some(reference);
        Ok(self)
    }

    /// Opening balance recorded by catalog management at creation time.
    pub fn with_opening_stock(mut self, location: Location, quantity: i64) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::invalid_quantity("opening stock cannot be negative"));
        }
        self.balances.insert(location, quantity);
        Ok(self)
    }

    /// Used by stores when a committed write bumps the row version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn multiplier(&self) -> Option<u32> {
        self.multiplier
    }

    pub fn reference_item_id(&self) -> Option<ItemId> {
        self.reference_item_id
    }

    /// Main-warehouse stock.
    pub fn stock(&self) -> i64 {
        self.stock_at(Location::MainWarehouse)
    }

    pub fn stock_at(&self, location: Location) -> i64 {
        self.balances.get(&location).copied().unwrap_or(0)
    }

    pub fn balances(&self) -> impl Iterator<Item = (Location, i64)> + '_ {
        self.balances.iter().map(|(l, q)| (*l, *q))
    }

    /// Whether any balance is recorded for `location` (even a zero one).
    pub fn is_stocked_at(&self, location: Location) -> bool {
        self.balances.contains_key(&location)
    }

    /// Usable conversion setup, if any (`multiplier > 1` and a distinct reference item).
    pub fn conversion(&self) -> Option<Conversion> {
        match (self.multiplier, self.reference_item_id) {
            (Some(multiplier), Some(reference)) if multiplier > 1 && reference != self.id => {
                Some(Conversion {
                    multiplier,
                    reference_item_id: reference,
                })
            }
            _ => None,
        }
    }

    /// Apply a signed delta to one balance, creating the balance if absent.
    ///
    /// Only the ledger calls this; the resulting balance is returned.
    pub(crate) fn apply_delta(&mut self, location: Location, delta: i64) -> DomainResult<i64> {
        let current = self.stock_at(location);
        let next = current
            .checked_add(delta)
            .ok_or_else(|| DomainError::invalid_quantity("stock balance overflow"))?;
        if next < 0 {
            let requested = delta.checked_neg().unwrap_or(i64::MAX);
            return Err(DomainError::insufficient_stock(self.id, requested, current));
        }
        self.balances.insert(location, next);
        Ok(next)
    }
}

impl AggregateRoot for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Item {
        Item::new(ItemId::new(), "Paper A4", "ream").unwrap()
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Item::new(ItemId::new(), "  ", "pcs").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn most_negative_delta_is_insufficient_not_a_panic() {
        let mut item = item()
            .with_opening_stock(Location::MainWarehouse, 2)
            .unwrap();
        let err = item.apply_delta(Location::MainWarehouse, i64::MIN).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(item.id_typed(), i64::MAX, 2));
        assert_eq!(item.stock(), 2);
    }

    #[test]
    fn apply_delta_creates_missing_division_balance() {
        let division = DivisionId::new();
        let mut item = item();
        assert!(!item.is_stocked_at(Location::Division(division)));

        let after = item.apply_delta(Location::Division(division), 4).unwrap();
        assert_eq!(after, 4);
        assert_eq!(item.stock_at(Location::Division(division)), 4);
        assert_eq!(item.stock(), 0);
    }

    #[test]
    fn apply_delta_refuses_negative_balance_and_leaves_state() {
        let mut item = item()
            .with_opening_stock(Location::MainWarehouse, 3)
            .unwrap();
        let before = item.clone();

        let err = item.apply_delta(Location::MainWarehouse, -4).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(item.id_typed(), 4, 3));
        assert_eq!(item, before);
    }

    #[test]
    fn conversion_requires_multiplier_above_one_and_distinct_reference() {
        let reference = ItemId::new();
        assert!(item().conversion().is_none());
        assert!(item().with_conversion(1, reference).unwrap().conversion().is_none());

        let converted = item().with_conversion(12, reference).unwrap();
        assert_eq!(
            converted.conversion(),
            Some(Conversion {
                multiplier: 12,
                reference_item_id: reference
            })
        );

        let id = ItemId::new();
        let self_ref = Item::new(id, "Box", "box").unwrap().with_conversion(6, id).unwrap();
        assert!(self_ref.conversion().is_none());
    }

    #[test]
    fn zero_multiplier_is_invalid() {
        assert!(item().with_conversion(0, ItemId::new()).is_err());
    }

    #[test]
    fn location_from_optional_division() {
        let d = DivisionId::new();
        assert_eq!(Location::from(None), Location::MainWarehouse);
        assert_eq!(Location::from(Some(d)), Location::Division(d));
        assert_eq!(Location::Division(d).division_id(), Some(d));
    }
}
