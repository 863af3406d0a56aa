use serde::{Deserialize, Serialize};

/// One item from the market reference database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketItem {
    pub id: String,
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub flea_price: i64,
    #[serde(default)]
    pub trader_price: i64,
    /// Grid cells the item occupies; 0 behaves as 1.
    #[serde(default)]
    pub slots: i32,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MarketItem {
    pub fn grid_count(&self) -> i64 {
        self.slots.max(1) as i64
    }

    /// Higher of the two price sources.
    pub fn best_price(&self) -> i64 {
        self.flea_price.max(self.trader_price)
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Static searchable containers ship in the same table as items.
    pub fn is_container(&self) -> bool {
        self.has_tag("Static Container")
    }

    pub fn is_quest_item(&self) -> bool {
        self.has_tag("Quest Item")
    }

    pub fn is_meds(&self) -> bool {
        self.has_tag("Meds")
    }

    pub fn is_food(&self) -> bool {
        self.has_tag("Food")
    }

    pub fn is_backpack(&self) -> bool {
        self.has_tag("Backpack")
    }

    pub fn is_weapon(&self) -> bool {
        self.has_tag("Weapon")
    }

    pub fn is_currency(&self) -> bool {
        self.has_tag("Currency")
    }
}
