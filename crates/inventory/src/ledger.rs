//! Stock ledger posting rules.
//!
//! Every balance mutation goes through [`issue`], [`adjust`] or [`convert`],
//! each of which changes the balance and records exactly one
//! [`StockTransaction`] per changed balance. The writer is the caller's unit of
//! work: nothing here is visible until the caller commits it, so a failed
//! posting (or a later failure in the same unit) leaves no partial effect.

use chrono::{DateTime, Utc};

use stockroom_core::{DomainError, DomainResult, ItemId, UserId};

use crate::conversion::UnitConversionResolver;
use crate::item::{Item, Location};
use crate::transaction::{StockTransaction, TransactionReference, TransactionType};

/// Read access to items.
pub trait ItemCatalog {
    type Error: From<DomainError>;

    fn find_item(&self, id: ItemId) -> Result<Option<Item>, Self::Error>;
}

/// Staged write access used by the posting rules.
pub trait StockWriter: ItemCatalog {
    /// Mutable handle to an item within the current unit of work (`NotFound` if absent).
    fn item_mut(&mut self, id: ItemId) -> Result<&mut Item, Self::Error>;

    /// Append a ledger entry to the current unit of work.
    fn record(&mut self, transaction: StockTransaction);
}

/// Who, why and when for a posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingContext {
    pub actor: UserId,
    pub description: String,
    pub reference: Option<TransactionReference>,
    pub occurred_at: DateTime<Utc>,
}

impl PostingContext {
    pub fn new(actor: UserId, description: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            actor,
            description: description.into(),
            reference: None,
            occurred_at,
        }
    }

    pub fn with_reference(mut self, reference: TransactionReference) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// The two coupled entries of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPosting {
    pub outgoing: StockTransaction,
    pub incoming: StockTransaction,
}

/// Parse an externally supplied quantity; must be a positive integer.
pub fn parse_quantity(input: &str) -> DomainResult<i64> {
    let quantity: i64 = input
        .trim()
        .parse()
        .map_err(|_| DomainError::invalid_quantity(format!("'{input}' is not a whole number")))?;
    if quantity <= 0 {
        return Err(DomainError::invalid_quantity("quantity must be positive"));
    }
    Ok(quantity)
}

/// Take `quantity` out of the balance at `location`.
pub fn issue<W>(
    writer: &mut W,
    item_id: ItemId,
    location: Location,
    quantity: i64,
    kind: TransactionType,
    ctx: &PostingContext,
) -> Result<StockTransaction, W::Error>
where
    W: StockWriter + ?Sized,
{
    if quantity <= 0 {
        return Err(DomainError::invalid_quantity("quantity must be positive").into());
    }
    let available = writer.item_mut(item_id)?.stock_at(location);
    if quantity > available {
        return Err(DomainError::insufficient_stock(item_id, quantity, available).into());
    }
    post(writer, item_id, location, -quantity, kind, ctx)
}

/// Apply a signed, non-zero delta to the balance at `location`.
pub fn adjust<W>(
    writer: &mut W,
    item_id: ItemId,
    location: Location,
    delta: i64,
    kind: TransactionType,
    ctx: &PostingContext,
) -> Result<StockTransaction, W::Error>
where
    W: StockWriter + ?Sized,
{
    if delta == 0 {
        return Err(DomainError::invalid_quantity("delta cannot be zero").into());
    }
    post(writer, item_id, location, delta, kind, ctx)
}

/// Break `quantity` units of a bulk item into its reference item.
///
/// Source is decremented by `quantity` (`ConversionOut`), the reference item is
/// incremented by `quantity × multiplier` (`ConversionIn`), both at `location`.
pub fn convert<W>(
    writer: &mut W,
    source_id: ItemId,
    location: Location,
    quantity: i64,
    ctx: &PostingContext,
) -> Result<ConversionPosting, W::Error>
where
    W: StockWriter + ?Sized,
{
    if quantity <= 0 {
        return Err(DomainError::invalid_quantity("quantity must be positive").into());
    }
    let source = writer.item_mut(source_id)?.clone();
    let resolved = UnitConversionResolver::new(&*writer).require(&source)?;

    let available = source.stock_at(location);
    if quantity > available {
        return Err(DomainError::insufficient_stock(source_id, quantity, available).into());
    }
    let produced = quantity
        .checked_mul(i64::from(resolved.multiplier))
        .ok_or_else(|| DomainError::invalid_quantity("converted quantity overflows"))?;

    let outgoing = post(
        writer,
        source_id,
        location,
        -quantity,
        TransactionType::ConversionOut,
        ctx,
    )?;
    let incoming = post(
        writer,
        resolved.reference.id_typed(),
        location,
        produced,
        TransactionType::ConversionIn,
        ctx,
    )?;

    Ok(ConversionPosting { outgoing, incoming })
}

fn post<W>(
    writer: &mut W,
    item_id: ItemId,
    location: Location,
    delta: i64,
    kind: TransactionType,
    ctx: &PostingContext,
) -> Result<StockTransaction, W::Error>
where
    W: StockWriter + ?Sized,
{
    let balance_after = writer.item_mut(item_id)?.apply_delta(location, delta)?;
    let transaction = StockTransaction::new(
        item_id,
        location,
        kind,
        delta,
        balance_after,
        ctx.actor,
        ctx.description.clone(),
        ctx.reference,
        ctx.occurred_at,
    );
    writer.record(transaction.clone());
    Ok(transaction)
}
