//! # Denomination Reconciler
//!
//! Physical cash counts at shift close.
//!
//! A count is advisory: it is stored next to the shift, summed into
//! `countedCash`, and compared against the computed balance. It never
//! feeds back into `currentBalance` or `endBalance`.
//!
//! ## Keys
//! Counts are keyed by nominal as a decimal string (`"1000"`, `"0.5"`).
//! A coin whose value collides with a banknote gets a `c` suffix, so the
//! 10 ₴ coin is `"10c"` next to the 10 ₴ banknote `"10"`.
//!
//! ## Autosave Debounce
//! ```text
//!   edit    edit  edit                       reset
//!    │       │     │                           │
//!    ▼       ▼     ▼                           ▼
//!   ─┬───────┬─────┬──────── 800ms ────────┬───┬───────►
//!                                          │   │
//!                                       save   save (immediate, empty)
//! ```
//! [`CountDraft`] models this with injected instants; the async worker in
//! `kassa-db` drives it with a real clock.

use std::str::FromStr;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::{Money, MINOR_PER_MAJOR};
use crate::types::DenominationCounts;

/// Debounce window between the last edit and the save.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(800);

const COIN_SUFFIX: char = 'c';

// =============================================================================
// Denomination Set
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DenominationKind {
    Banknote,
    Coin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Denomination {
    /// Key in [`DenominationCounts`].
    pub key: String,
    pub value: Money,
    pub kind: DenominationKind,
}

/// The nominals a register counts, largest first within each kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DenominationSet {
    pub currency: String,
    pub denominations: Vec<Denomination>,
}

impl DenominationSet {
    /// Hryvnia: banknotes 1000..10, coins 10..0.5.
    pub fn uah() -> Self {
        let banknotes = [1000, 500, 200, 100, 50, 20, 10]
            .into_iter()
            .map(|major| Denomination {
                key: major.to_string(),
                value: Money::from_major(major),
                kind: DenominationKind::Banknote,
            });
        let coins = [("10c", 1000), ("5", 500), ("2", 200), ("1", 100), ("0.5", 50)]
            .into_iter()
            .map(|(key, minor)| Denomination {
                key: key.to_string(),
                value: Money::from_minor(minor),
                kind: DenominationKind::Coin,
            });

        Self {
            currency: "UAH".to_string(),
            denominations: banknotes.chain(coins).collect(),
        }
    }

    /// Picks the set for a currency code, falling back to hryvnia.
    pub fn for_currency(currency: &str) -> Self {
        match currency.to_ascii_uppercase().as_str() {
            "UAH" => Self::uah(),
            _ => {
                let mut set = Self::uah();
                set.currency = currency.to_ascii_uppercase();
                set
            }
        }
    }

    pub fn value_of(&self, key: &str) -> Option<Money> {
        self.denominations
            .iter()
            .find(|d| d.key == key)
            .map(|d| d.value)
    }

    /// Validates keys against this set and drops zero counts.
    pub fn normalize(&self, counts: &DenominationCounts) -> CoreResult<DenominationCounts> {
        let mut normalized = DenominationCounts::new();
        for (key, count) in counts {
            if self.value_of(key).is_none() {
                return Err(ValidationError::InvalidFormat {
                    field: "denominationCounts".to_string(),
                    reason: format!("unknown nominal '{key}' for {}", self.currency),
                }
                .into());
            }
            if *count > 0 {
                normalized.insert(key.clone(), *count);
            }
        }
        Ok(normalized)
    }
}

impl Default for DenominationSet {
    fn default() -> Self {
        Self::uah()
    }
}

// =============================================================================
// Counting
// =============================================================================

/// Parses a nominal key (`"1000"`, `"0.5"`, `"10c"`) into money.
pub fn parse_nominal(key: &str) -> Result<Money, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "denominationCounts".to_string(),
        reason: format!("'{key}': {reason}"),
    };

    let digits = key.trim().trim_end_matches(COIN_SUFFIX);
    let major = Decimal::from_str(digits).map_err(|_| invalid("not a number"))?;
    let minor = major * Decimal::from(MINOR_PER_MAJOR);

    if !minor.fract().is_zero() {
        return Err(invalid("finer than one kopiyka"));
    }
    if minor <= Decimal::ZERO {
        return Err(invalid("must be positive"));
    }

    let minor: i64 = minor.trunc().try_into().map_err(|_| invalid("too large"))?;
    Ok(Money::from_minor(minor))
}

/// `Σ nominal * count`.
///
/// ```rust
/// use kassa_core::denomination::counted_total;
/// use kassa_core::money::Money;
/// use kassa_core::types::DenominationCounts;
///
/// let counts = DenominationCounts::from([
///     ("500".to_string(), 2),
///     ("0.5".to_string(), 3),
/// ]);
/// assert_eq!(counted_total(&counts).unwrap(), Money::from_minor(100_150));
/// ```
pub fn counted_total(counts: &DenominationCounts) -> CoreResult<Money> {
    let mut total = Money::zero();
    for (key, count) in counts {
        total += parse_nominal(key)? * i64::from(*count);
    }
    Ok(total)
}

/// `countedCash - endBalance`; `None` while nothing has been counted.
pub fn cash_difference(counts: &DenominationCounts, end_balance: Money) -> CoreResult<Option<Money>> {
    let counted = counted_total(counts)?;
    if counted.is_zero() {
        return Ok(None);
    }
    Ok(Some(counted - end_balance))
}

/// Result of [`record_count`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RecordedCount {
    pub counts: DenominationCounts,
    pub counted_total: Money,
}

/// Validates and sums a count for storage.
pub fn record_count(set: &DenominationSet, counts: &DenominationCounts) -> CoreResult<RecordedCount> {
    let counts = set.normalize(counts)?;
    let counted_total = counted_total(&counts)?;
    Ok(RecordedCount {
        counts,
        counted_total,
    })
}

// =============================================================================
// Autosave Draft
// =============================================================================

/// In-progress count awaiting a debounced save.
#[derive(Debug, Clone)]
pub struct CountDraft {
    counts: DenominationCounts,
    window: Duration,
    deadline: Option<Instant>,
}

impl CountDraft {
    pub fn new(initial: DenominationCounts) -> Self {
        Self::with_window(initial, AUTOSAVE_DEBOUNCE)
    }

    pub fn with_window(initial: DenominationCounts, window: Duration) -> Self {
        Self {
            counts: initial,
            window,
            deadline: None,
        }
    }

    pub fn counts(&self) -> &DenominationCounts {
        &self.counts
    }

    /// When the pending save is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Records one nominal's count and (re)starts the debounce window.
    pub fn edit(&mut self, key: impl Into<String>, count: u32, now: Instant) {
        let key = key.into();
        if count == 0 {
            self.counts.remove(&key);
        } else {
            self.counts.insert(key, count);
        }
        self.deadline = Some(now + self.window);
    }

    /// Clears every count. The returned snapshot must be saved immediately.
    pub fn reset(&mut self) -> DenominationCounts {
        self.counts.clear();
        self.deadline = None;
        self.counts.clone()
    }

    /// Returns the snapshot to save once the window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<DenominationCounts> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(self.counts.clone())
            }
            _ => None,
        }
    }

    /// Takes any pending snapshot regardless of the window (shutdown).
    pub fn flush(&mut self) -> Option<DenominationCounts> {
        self.deadline.take().map(|_| self.counts.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
