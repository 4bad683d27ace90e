//! Element counters and the recipe arithmetic applied to them.
//!
//! The inventory is a plain value: persistence and locking live in
//! [`crate::persistence`], which decodes an [`Inventory`], hands it to a
//! mutation closure and encodes it back.

mod recipe;

use std::fmt;

use thiserror::Error;

pub use recipe::{Cost, Drink, Element, Molecule};

/// Upper bound for any single element counter.
pub const MAX_UNITS: u64 = 1_000_000_000_000_000_000;

/// Failures raised by inventory mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    /// Adding would push the counter past [`MAX_UNITS`].
    #[error("adding to {element} would exceed {MAX_UNITS} units")]
    Overflow {
        /// Element whose counter would overflow.
        element: Element,
    },
    /// The element name is not one of the stocked elements.
    #[error("unknown element '{name}'")]
    UnknownElement {
        /// Name as received.
        name: String,
    },
    /// At least one element falls short of the molecule requirement.
    #[error("not enough atoms to deliver {molecule}")]
    InsufficientStock {
        /// Molecule that could not be delivered.
        molecule: Molecule,
    },
    /// The molecule name is not one of the deliverable molecules.
    #[error("unknown molecule '{name}'")]
    UnknownMolecule {
        /// Name as received.
        name: String,
    },
    /// A seed value was larger than [`MAX_UNITS`].
    #[error("initial {element} count {count} exceeds {MAX_UNITS} units")]
    SeedTooLarge {
        /// Element whose seed is out of range.
        element: Element,
        /// Rejected seed.
        count: u64,
    },
}

/// Current carbon, hydrogen and oxygen counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inventory {
    carbon: u64,
    hydrogen: u64,
    oxygen: u64,
}

impl Inventory {
    /// An inventory holding nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            carbon: 0,
            hydrogen: 0,
            oxygen: 0,
        }
    }

    /// Builds an inventory from counters already known to be in range.
    ///
    /// Used when decoding persisted records, which are validated separately.
    pub(crate) const fn from_counts(carbon: u64, hydrogen: u64, oxygen: u64) -> Self {
        Self {
            carbon,
            hydrogen,
            oxygen,
        }
    }

    /// Builds an inventory from start-up seeds.
    ///
    /// # Errors
    ///
    /// Returns [`StockError::SeedTooLarge`] when any seed exceeds
    /// [`MAX_UNITS`].
    pub fn seeded(carbon: u64, hydrogen: u64, oxygen: u64) -> Result<Self, StockError> {
        let inventory = Self::from_counts(carbon, hydrogen, oxygen);
        if let Some(element) = inventory.first_out_of_range() {
            return Err(StockError::SeedTooLarge {
                element,
                count: inventory.held(element),
            });
        }
        Ok(inventory)
    }

    /// Units of `element` currently held.
    #[must_use]
    pub const fn held(&self, element: Element) -> u64 {
        match element {
            Element::Carbon => self.carbon,
            Element::Hydrogen => self.hydrogen,
            Element::Oxygen => self.oxygen,
        }
    }

    /// Counters in persisted record order.
    #[must_use]
    pub const fn counts(&self) -> [u64; 3] {
        [self.carbon, self.hydrogen, self.oxygen]
    }

    /// First element whose counter exceeds [`MAX_UNITS`], if any.
    pub(crate) fn first_out_of_range(&self) -> Option<Element> {
        Element::ALL
            .into_iter()
            .find(|element| self.held(*element) > MAX_UNITS)
    }

    const fn slot_mut(&mut self, element: Element) -> &mut u64 {
        match element {
            Element::Carbon => &mut self.carbon,
            Element::Hydrogen => &mut self.hydrogen,
            Element::Oxygen => &mut self.oxygen,
        }
    }

    /// Adds `amount` units of `element`, returning the new total.
    ///
    /// The counter is left untouched on failure.
    ///
    /// # Errors
    ///
    /// Returns [`StockError::Overflow`] if the new total would exceed
    /// [`MAX_UNITS`].
    pub fn add_units(&mut self, element: Element, amount: u64) -> Result<u64, StockError> {
        let slot = self.slot_mut(element);
        let total = slot
            .checked_add(amount)
            .filter(|sum| *sum <= MAX_UNITS)
            .ok_or(StockError::Overflow { element })?;
        *slot = total;
        Ok(total)
    }

    /// Removes the elements needed for `amount` molecules of `molecule`.
    ///
    /// Either every counter is decremented or none is.
    ///
    /// # Errors
    ///
    /// Returns [`StockError::InsufficientStock`] when any element falls short,
    /// including when the requirement itself overflows `u64`.
    pub fn consume_for_molecule(
        &mut self,
        molecule: Molecule,
        amount: u64,
    ) -> Result<(), StockError> {
        let shortfall = || StockError::InsufficientStock { molecule };
        let needed = molecule.cost().scaled(amount).ok_or_else(shortfall)?;
        let mut remaining = *self;
        for element in Element::ALL {
            let slot = remaining.slot_mut(element);
            *slot = slot
                .checked_sub(needed.of(element))
                .ok_or_else(shortfall)?;
        }
        *self = remaining;
        Ok(())
    }

    /// Number of whole `drink`s the current stock could produce.
    ///
    /// Read-only: nothing is reserved or consumed.
    #[must_use]
    pub fn estimate_drink_capacity(&self, drink: Drink) -> u64 {
        let cost = drink.cost();
        Element::ALL
            .into_iter()
            .filter_map(|element| self.held(element).checked_div(cost.of(element)))
            .min()
            .unwrap_or(0)
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "C={}, H={}, O={}",
            self.carbon, self.hydrogen, self.oxygen
        )
    }
}
