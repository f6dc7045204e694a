//! Read-side resolution of bulk-to-reference unit conversions.

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, ItemId};

use crate::item::Item;
use crate::ledger::ItemCatalog;

/// Conversion setup declared on a bulk item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub multiplier: u32,
    pub reference_item_id: ItemId,
}

/// A conversion whose reference item was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConversion {
    pub multiplier: u32,
    pub reference: Item,
}

/// Resolves an item's conversion relationship against a catalog.
///
/// Pure lookups: no side effects, no locking.
pub struct UnitConversionResolver<'c, C: ?Sized> {
    catalog: &'c C,
}

impl<'c, C> UnitConversionResolver<'c, C>
where
    C: ItemCatalog + ?Sized,
{
    pub fn new(catalog: &'c C) -> Self {
        Self { catalog }
    }

    /// `None` when `multiplier <= 1`, no reference is set, or the reference is dangling.
    pub fn resolve(&self, item: &Item) -> Result<Option<ResolvedConversion>, C::Error> {
        let Some(conversion) = item.conversion() else {
            return Ok(None);
        };
        let reference = self.catalog.find_item(conversion.reference_item_id)?;
        Ok(reference.map(|reference| ResolvedConversion {
            multiplier: conversion.multiplier,
            reference,
        }))
    }

    /// Like [`resolve`](Self::resolve), but a missing conversion is `NotConvertible`.
    pub fn require(&self, item: &Item) -> Result<ResolvedConversion, C::Error> {
        if item.conversion().is_none() {
            return Err(DomainError::not_convertible(format!(
                "item {} has no multiplier above 1 with a reference item",
                item.id_typed()
            ))
            .into());
        }
        self.resolve(item)?.ok_or_else(|| {
            DomainError::not_convertible(format!(
                "reference item of {} does not exist",
                item.id_typed()
            ))
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct Catalog(HashMap<ItemId, Item>);

    impl ItemCatalog for Catalog {
        type Error = DomainError;

        fn find_item(&self, id: ItemId) -> Result<Option<Item>, DomainError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    #[test]
    fn resolves_multiplier_and_reference() {
        let piece = Item::new(ItemId::new(), "Pencil", "pcs").unwrap();
        let boxed = Item::new(ItemId::new(), "Pencil box", "box")
            .unwrap()
            .with_conversion(12, piece.id_typed())
            .unwrap();
        let catalog = Catalog(HashMap::from([(piece.id_typed(), piece.clone())]));

        let resolved = UnitConversionResolver::new(&catalog)
            .resolve(&boxed)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.multiplier, 12);
        assert_eq!(resolved.reference, piece);
    }

    #[test]
    fn unit_multiplier_resolves_to_none() {
        let piece = Item::new(ItemId::new(), "Pencil", "pcs").unwrap();
        let single = Item::new(ItemId::new(), "Pencil single", "pcs")
            .unwrap()
            .with_conversion(1, piece.id_typed())
            .unwrap();
        let catalog = Catalog(HashMap::from([(piece.id_typed(), piece)]));

        assert!(UnitConversionResolver::new(&catalog).resolve(&single).unwrap().is_none());
    }

    #[test]
    fn dangling_reference_is_not_convertible() {
        let boxed = Item::new(ItemId::new(), "Pencil box", "box")
            .unwrap()
            .with_conversion(12, ItemId::new())
            .unwrap();
        let catalog = Catalog(HashMap::new());
        let resolver = UnitConversionResolver::new(&catalog);

        assert!(resolver.resolve(&boxed).unwrap().is_none());
        assert!(matches!(
            resolver.require(&boxed),
            Err(DomainError::NotConvertible(_))
        ));
    }
}
