//! Environmental savings estimates for second-hand purchases
use super::product::Category;
use std::collections::HashMap;

/// Estimated savings from buying an item second hand instead of new
#[derive(minicbor::Encode, minicbor::Decode, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EcoImpact {
    #[n(0)]
    pub co2_saved: u64, // kilograms
    #[n(1)]
    pub water_saved: u64, // litres
}

/// Per-category baseline at the reference price of 1000
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ImpactBase {
    pub co2: u64,
    pub water: u64,
}

/// Immutable lookup table mapping a category and price to an [`EcoImpact`].
///
/// Price acts as a rough proxy for item size and complexity, so the baseline
/// is scaled by `sqrt(price / 1000)` rather than linearly.
#[derive(Clone, Debug)]
pub struct ImpactModel {
    table: HashMap<Category, ImpactBase>,
    fallback: ImpactBase,
}

impl Default for ImpactModel {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ImpactModel {
    /// The built-in baseline table covering every category
    pub fn builtin() -> Self {
        let table = HashMap::from([
            (Category::Electronics, ImpactBase { co2: 100, water: 1000 }),
            (Category::Clothing, ImpactBase { co2: 25, water: 2500 }),
            (Category::Fashion, ImpactBase { co2: 25, water: 2500 }),
            (Category::Furniture, ImpactBase { co2: 60, water: 500 }),
            (Category::Books, ImpactBase { co2: 10, water: 300 }),
            (Category::Sports, ImpactBase { co2: 30, water: 400 }),
            (Category::HomeGarden, ImpactBase { co2: 20, water: 600 }),
            (Category::Toys, ImpactBase { co2: 15, water: 250 }),
            (Category::Other, ImpactBase { co2: 15, water: 350 }),
        ]);

        Self {
            table,
            fallback: ImpactBase { co2: 15, water: 350 },
        }
    }

    pub fn new(table: HashMap<Category, ImpactBase>, fallback: ImpactBase) -> Self {
        Self { table, fallback }
    }

    /// Baseline for a category, falling back when the table has no entry
    pub fn base_for(&self, category: Category) -> ImpactBase {
        self.table.get(&category).copied().unwrap_or(self.fallback)
    }

    /// Pure and deterministic. Both components are rounded to the nearest
    /// whole unit, so impact grows sub-linearly with price.
    pub fn estimate(&self, category: Category, price: u64) -> EcoImpact {
        let base = self.base_for(category);
        let factor = (price as f64 / 1000.0).sqrt();

        EcoImpact {
            co2_saved: (base.co2 as f64 * factor).round() as u64,
            water_saved: (base.water as f64 * factor).round() as u64,
        }
    }
}
