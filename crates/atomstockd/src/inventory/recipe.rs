//! Compiled-in element, molecule and drink tables.

use std::fmt;
use std::str::FromStr;

use super::StockError;

/// Per-unit elemental cost of a molecule or drink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cost {
    /// Carbon units per item.
    pub carbon: u64,
    /// Hydrogen units per item.
    pub hydrogen: u64,
    /// Oxygen units per item.
    pub oxygen: u64,
}

impl Cost {
    /// Builds a cost from carbon, hydrogen and oxygen counts.
    #[must_use]
    pub const fn new(carbon: u64, hydrogen: u64, oxygen: u64) -> Self {
        Self {
            carbon,
            hydrogen,
            oxygen,
        }
    }

    const fn plus(self, other: Self) -> Self {
        Self::new(
            self.carbon + other.carbon,
            self.hydrogen + other.hydrogen,
            self.oxygen + other.oxygen,
        )
    }

    /// Multiplies every component, or `None` if any product overflows `u64`.
    #[must_use]
    pub const fn scaled(self, factor: u64) -> Option<Self> {
        let Some(carbon) = self.carbon.checked_mul(factor) else {
            return None;
        };
        let Some(hydrogen) = self.hydrogen.checked_mul(factor) else {
            return None;
        };
        let Some(oxygen) = self.oxygen.checked_mul(factor) else {
            return None;
        };
        Some(Self::new(carbon, hydrogen, oxygen))
    }

    /// Cost of `element` within this recipe.
    #[must_use]
    pub const fn of(self, element: Element) -> u64 {
        match element {
            Element::Carbon => self.carbon,
            Element::Hydrogen => self.hydrogen,
            Element::Oxygen => self.oxygen,
        }
    }
}

/// One of the three stocked raw materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// `CARBON`
    Carbon,
    /// `HYDROGEN`
    Hydrogen,
    /// `OXYGEN`
    Oxygen,
}

impl Element {
    /// Every element, in persisted record order.
    pub const ALL: [Self; 3] = [Self::Carbon, Self::Hydrogen, Self::Oxygen];

    /// Wire name of the element.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Carbon => "CARBON",
            Self::Hydrogen => "HYDROGEN",
            Self::Oxygen => "OXYGEN",
        }
    }
}

impl FromStr for Element {
    type Err = StockError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|element| element.name() == name)
            .ok_or_else(|| StockError::UnknownElement {
                name: name.to_owned(),
            })
    }
}

impl fmt::Display for Element {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// A deliverable molecule built from a fixed ratio of elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Molecule {
    /// H2O
    Water,
    /// CO2
    CarbonDioxide,
    /// C2H6O
    Alcohol,
    /// C6H12O6
    Glucose,
}

impl Molecule {
    /// Every molecule the store can deliver.
    pub const ALL: [Self; 4] = [
        Self::Water,
        Self::CarbonDioxide,
        Self::Alcohol,
        Self::Glucose,
    ];

    /// Wire name of the molecule; `CARBON DIOXIDE` spans two words.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Water => "WATER",
            Self::CarbonDioxide => "CARBON DIOXIDE",
            Self::Alcohol => "ALCOHOL",
            Self::Glucose => "GLUCOSE",
        }
    }

    /// Elements consumed per molecule.
    #[must_use]
    pub const fn cost(self) -> Cost {
        match self {
            Self::Water => Cost::new(0, 2, 1),
            Self::CarbonDioxide => Cost::new(1, 0, 2),
            Self::Alcohol => Cost::new(2, 6, 1),
            Self::Glucose => Cost::new(6, 12, 6),
        }
    }
}

impl FromStr for Molecule {
    type Err = StockError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|molecule| molecule.name() == name)
            .ok_or_else(|| StockError::UnknownMolecule {
                name: name.to_owned(),
            })
    }
}

impl fmt::Display for Molecule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// A drink assembled from three molecules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drink {
    /// Water, carbon dioxide and glucose.
    SoftDrink,
    /// Water, alcohol and glucose.
    Vodka,
    /// Water, carbon dioxide and alcohol.
    Champagne,
}

impl Drink {
    /// Every drink the console can estimate.
    pub const ALL: [Self; 3] = [Self::SoftDrink, Self::Vodka, Self::Champagne];

    /// Console name of the drink; `SOFT DRINK` spans two words.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SoftDrink => "SOFT DRINK",
            Self::Vodka => "VODKA",
            Self::Champagne => "CHAMPAGNE",
        }
    }

    /// Looks a drink up by its console name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|drink| drink.name() == name)
    }

    /// Molecules combined into one drink.
    #[must_use]
    pub const fn molecules(self) -> [Molecule; 3] {
        match self {
            Self::SoftDrink => [Molecule::Water, Molecule::CarbonDioxide, Molecule::Glucose],
            Self::Vodka => [Molecule::Water, Molecule::Alcohol, Molecule::Glucose],
            Self::Champagne => [Molecule::Water, Molecule::CarbonDioxide, Molecule::Alcohol],
        }
    }

    /// Net elemental cost of one drink.
    #[must_use]
    pub const fn cost(self) -> Cost {
        let [first, second, third] = self.molecules();
        first.cost().plus(second.cost()).plus(third.cost())
    }
}

impl fmt::Display for Drink {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}
