use crate::combat::rng::CombatRng;
use crate::combat::stats::CombatantStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Hit,
    Crit,
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackOutcome {
    pub kind: OutcomeKind,
    pub damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillSpec {
    pub id: &'static str,
    pub spell: bool,
    pub cooldown_ms: u64,
}

/// Resolve one attack exchange. Pure: mutates nothing but the rng, so a
/// seeded rng makes every roll reproducible.
///
/// Order of rolls matters: dodge first (miss, zero damage), then the crit
/// roll on the mitigated amount. Any landed attack deals at least 1 damage.
pub fn resolve(
    attacker: &CombatantStats,
    defender: &CombatantStats,
    skill: Option<&SkillSpec>,
    rng: &mut CombatRng,
) -> AttackOutcome {
    if rng.roll_percent(defender.dodge_chance) {
        return AttackOutcome {
            kind: OutcomeKind::Miss,
            damage: 0,
        };
    }

    let spell = skill.map_or(false, |spec| spec.spell);
    let base = if spell {
        attacker.spell_power
    } else {
        attacker.attack_power
    };
    let penetration = if spell {
        attacker.spell_penetration
    } else {
        attacker.penetration
    };

    let mitigation = defender.mitigation_percent(spell, penetration);
    let mitigated = (base as f32 * (1.0 - mitigation / 100.0)).floor() as i32;

    if rng.roll_percent(attacker.critical_chance) {
        let damage = (mitigated as f32 * attacker.critical_damage / 100.0).floor() as i32;
        return AttackOutcome {
            kind: OutcomeKind::Crit,
            damage: damage.max(1),
        };
    }

    AttackOutcome {
        kind: OutcomeKind::Hit,
        damage: mitigated.max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attacker() -> CombatantStats {
        CombatantStats {
            attack_power: 100,
            spell_power: 80,
            critical_chance: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn landed_attack_deals_at_least_one() {
        let weak = CombatantStats {
            attack_power: 1,
            critical_chance: 0.0,
            ..Default::default()
        };
        let tank = CombatantStats {
            armor: 5000,
            dodge_chance: 0.0,
            ..Default::default()
        };
        let mut rng = CombatRng::from_seed(1);
        let outcome = resolve(&weak, &tank, None, &mut rng);
        assert_ne!(outcome.kind, OutcomeKind::Miss);
        assert!(outcome.damage >= 1);
    }

    #[test]
    fn guaranteed_dodge_is_a_zero_damage_miss() {
        let defender = CombatantStats {
            dodge_chance: 100.0,
            ..Default::default()
        };
        let mut rng = CombatRng::from_seed(1);
        let outcome = resolve(&attacker(), &defender, None, &mut rng);
        assert_eq!(outcome.kind, OutcomeKind::Miss);
        assert_eq!(outcome.damage, 0);
    }

    #[test]
    fn forced_crit_multiplies_mitigated_damage_exactly() {
        let crit_attacker = CombatantStats {
            attack_power: 100,
            critical_chance: 100.0,
            critical_damage: 150.0,
            ..Default::default()
        };
        let defender = CombatantStats {
            armor: 200,
            dodge_chance: 0.0,
            ..Default::default()
        };
        let mut rng = CombatRng::from_seed(9);
        let outcome = resolve(&crit_attacker, &defender, None, &mut rng);
        assert_eq!(outcome.kind, OutcomeKind::Crit);
        // 100 base, 20% mitigation -> 80, crit 150% -> 120
        assert_eq!(outcome.damage, 120);
    }

    #[test]
    fn spell_skills_use_spell_power_and_magic_resistance() {
        let skill = SkillSpec {
            id: "firebolt",
            spell: true,
            cooldown_ms: 0,
        };
        let defender = CombatantStats {
            magic_resistance: 400,
            armor: 0,
            dodge_chance: 0.0,
            ..Default::default()
        };
        let mut rng = CombatRng::from_seed(5);
        let outcome = resolve(&attacker(), &defender, Some(&skill), &mut rng);
        // 80 spell power, 40% mitigation -> 48
        assert_eq!(outcome.damage, 48);
    }

    #[test]
    fn mitigation_cannot_exceed_cap() {
        let defender = CombatantStats {
            armor: 100_000,
            dodge_chance: 0.0,
            ..Default::default()
        };
        let mut rng = CombatRng::from_seed(2);
        let outcome = resolve(&attacker(), &defender, None, &mut rng);
        // 90% cap leaves 10 of the 100 base.
        assert_eq!(outcome.damage, 10);
    }
}
