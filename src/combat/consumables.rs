use crate::combat::stats::CombatantStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PotionTier {
    Greater,
    Standard,
    Minor,
}

impl PotionTier {
    pub const ALL: [PotionTier; 3] = [PotionTier::Greater, PotionTier::Standard, PotionTier::Minor];

    pub fn heal_amount(self) -> i32 {
        match self {
            PotionTier::Greater => 250,
            PotionTier::Standard => 150,
            PotionTier::Minor => 75,
        }
    }

    fn index(self) -> usize {
        match self {
            PotionTier::Greater => 0,
            PotionTier::Standard => 1,
            PotionTier::Minor => 2,
        }
    }
}

pub const FOOD_HEAL_AMOUNT: i32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsumableStock {
    pub potions: [u32; 3],
    pub food: u32,
}

impl ConsumableStock {
    pub fn potion_count(&self, tier: PotionTier) -> u32 {
        self.potions[tier.index()]
    }

    pub fn set_potions(&mut self, tier: PotionTier, count: u32) {
        self.potions[tier.index()] = count;
    }

    pub fn is_empty(&self) -> bool {
        self.potions.iter().all(|&count| count == 0) && self.food == 0
    }

    /// Heal a combatant in danger from stock. Success without consumption
    /// when hp is at or above half. Potions are drunk highest tier first,
    /// food only once every potion is gone. Returns false only when healing
    /// was needed and nothing was left, which is the signal that death may
    /// proceed.
    pub fn try_heal(&mut self, stats: &mut CombatantStats) -> bool {
        if stats.hp * 2 >= stats.max_hp {
            return true;
        }
        for tier in PotionTier::ALL {
            let index = tier.index();
            if self.potions[index] > 0 {
                self.potions[index] -= 1;
                stats.apply_heal(tier.heal_amount());
                return true;
            }
        }
        if self.food > 0 {
            self.food -= 1;
            stats.apply_heal(FOOD_HEAL_AMOUNT);
            return true;
        }
        false
    }
}
