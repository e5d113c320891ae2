//! # Money and Volume
//!
//! Integer quantity types for everything the station counts.
//!
//! ## Why Integers?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Meter readings arrive as 1234.56 L, prices as ₹102.45 per litre.       │
//! │  Summing a month of those as floats drifts by fractions of a paisa,     │
//! │  and the khata must balance to the paisa.                               │
//! │                                                                         │
//! │  OUR SOLUTION:                                                          │
//! │    Money  = i64 paise        (₹1 = 100 paise)                           │
//! │    Volume = i64 millilitres  (1 L = 1000 mL)                            │
//! │    Revenue = mL × paise/L ÷ 1000, rounded half-up ONCE at the end       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pumpdesk_core::money::{Money, Volume};
//!
//! let price = Money::from_rupees(100);      // ₹100.00 per litre
//! let sold = Volume::from_litres(50);       // 50 L
//! assert_eq!(price.for_volume(sold), Money::from_rupees(5000));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money
// =============================================================================

/// A monetary value in paise (1/100 of a rupee).
///
/// Signed: a customer in credit has a negative due, and a staff member whose
/// advances exceed salary has a negative payable.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ```rust
    /// use pumpdesk_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(12).paise(), 1200);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Price of `volume` at `self` per litre, rounded half-up to the paisa.
    ///
    /// ## Implementation
    /// `(paise_per_litre × millilitres + 500) / 1000` in i128, so a full
    /// year of station sales cannot overflow the intermediate product.
    ///
    /// ```rust
    /// use pumpdesk_core::money::{Money, Volume};
    ///
    /// let price = Money::from_paise(10_245);            // ₹102.45 / L
    /// let sold = Volume::from_millilitres(1_500);       // 1.5 L
    /// assert_eq!(price.for_volume(sold).paise(), 15_368); // ₹153.675 → ₹153.68
    /// ```
    pub fn for_volume(&self, volume: Volume) -> Money {
        let product = self.0 as i128 * volume.millilitres() as i128;
        let rounded = if product >= 0 {
            (product + 500) / 1000
        } else {
            (product - 500) / 1000
        };
        Money(rounded as i64)
    }
}

/// Display uses the rupee sign. Locale-aware grouping is a presentation
/// concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Volume
// =============================================================================

/// A fuel volume in millilitres.
///
/// Signed because tank stock may legitimately go negative when usage is
/// recorded before the matching intake.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Volume(i64);

impl Volume {
    #[inline]
    pub const fn from_millilitres(ml: i64) -> Self {
        Volume(ml)
    }

    /// Creates a volume from whole litres.
    #[inline]
    pub const fn from_litres(litres: i64) -> Self {
        Volume(litres * 1000)
    }

    #[inline]
    pub const fn millilitres(&self) -> i64 {
        self.0
    }

    /// Litres as a float, for display and percentage math only.
    #[inline]
    pub fn litres(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Volume(0)
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `max(0, self - earlier)`: fuel dispensed between two meter values.
    ///
    /// A meter that reads lower at closing (reset, typo) never produces
    /// negative sales.
    ///
    /// ```rust
    /// use pumpdesk_core::money::Volume;
    ///
    /// let opening = Volume::from_litres(150);
    /// let closing = Volume::from_litres(100);
    /// assert_eq!(closing.dispensed_since(opening), Volume::zero());
    /// ```
    #[inline]
    pub fn dispensed_since(&self, earlier: Volume) -> Volume {
        Volume((self.0 - earlier.0).max(0))
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:03} L", sign, abs / 1000, abs % 1000)
    }
}

impl Add for Volume {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Volume(self.0 + other.0)
    }
}

impl AddAssign for Volume {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Volume {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Volume(self.0 - other.0)
    }
}

impl SubAssign for Volume {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Volume {
    fn sum<I: Iterator<Item = Volume>>(iter: I) -> Self {
        iter.fold(Volume::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_parts() {
        let money = Money::from_paise(10_245);
        assert_eq!(money.rupees(), 102);
        assert_eq!(money.paise_part(), 45);

        let negative = Money::from_paise(-550);
        assert_eq!(negative.rupees(), -5);
        assert_eq!(negative.paise_part(), 50);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_paise(10_245).to_string(), "₹102.45");
        assert_eq!(Money::from_rupees(5).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_money_sum_and_neg() {
        let items = [Money::from_rupees(500), Money::from_rupees(300)];
        let total: Money = items.iter().sum();
        assert_eq!(total, Money::from_rupees(800));
        assert_eq!(-total, Money::from_rupees(-800));
    }

    #[test]
    fn test_for_volume_rounds_half_up() {
        // 1 paisa/L × 0.5 L = 0.5 paise → 1; 0.499 L → 0
        let price = Money::from_paise(1);
        assert_eq!(price.for_volume(Volume::from_millilitres(500)).paise(), 1);
        assert_eq!(price.for_volume(Volume::from_millilitres(499)).paise(), 0);
    }

    #[test]
    fn test_for_volume_whole_litres_is_exact() {
        let price = Money::from_rupees(100);
        assert_eq!(
            price.for_volume(Volume::from_litres(50)),
            Money::from_rupees(5000)
        );
    }

    #[test]
    fn test_dispensed_since_never_negative() {
        let opening = Volume::from_litres(100);
        assert_eq!(
            Volume::from_litres(150).dispensed_since(opening),
            Volume::from_litres(50)
        );
        assert_eq!(Volume::from_litres(90).dispensed_since(opening), Volume::zero());
    }

    #[test]
    fn test_volume_display() {
        assert_eq!(Volume::from_millilitres(12_500).to_string(), "12.500 L");
        assert_eq!(Volume::from_litres(-3).to_string(), "-3.000 L");
    }
}
