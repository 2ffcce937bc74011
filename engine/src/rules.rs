//! The roll-versus-roll duel rule used at the table.

use serde::Serialize;

use crate::entity::EntityInstance;
use crate::life::apply_damage;
use crate::Rolls;

pub const STR: &str = "STR";
pub const VIT: &str = "VIT";

#[derive(Debug, Clone, Copy)]
pub struct DuelOptions {
    /// Ignore the defender's VIT when computing hit damage.
    pub pierce_armor: bool,
    pub vit_divisor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DuelOutcome {
    pub hit: bool,
    pub rolls: (f64, f64),
    /// Damage dealt to the defender on a hit.
    pub damage: Option<i32>,
    /// Raw defense value when the defender holds; positive means recoil on the attacker.
    pub defense: Option<f64>,
    pub effects: Vec<String>,
}

/// Resolve one exchange. On `a > b` the defender takes
/// `(a - b) + STR_A - VIT_B / divisor`; otherwise a positive
/// `(b - a) + VIT_B / divisor - STR_A` comes back at the attacker.
pub fn resolve_attack(
    attacker: &mut EntityInstance,
    defender: &mut EntityInstance,
    rolls: Rolls,
    opts: DuelOptions,
    mut log: impl FnMut(String),
) -> DuelOutcome {
    let divisor = if opts.vit_divisor > 0.0 { opts.vit_divisor } else { 1.0 };
    let vit_term = defender.stat(VIT) / divisor;
    let strength = attacker.stat(STR);
    let mut effects = Vec::new();

    if rolls.attacker > rolls.defender {
        let mut raw = (rolls.attacker - rolls.defender) + strength;
        if !opts.pierce_armor {
            raw -= vit_term;
        }
        let dmg = raw.max(0.0).round() as i32;
        effects.push(format!(
            "{} hits {} for {} damage",
            attacker.name, defender.name, dmg
        ));
        apply_damage(defender, dmg, |line| effects.push(line));
        effects.push(format!(
            "[HP][{}] {}/{}",
            defender.name, defender.current_hp, defender.max_hp
        ));
        for line in &effects {
            log(line.clone());
        }
        return DuelOutcome {
            hit: true,
            rolls: (rolls.attacker, rolls.defender),
            damage: Some(dmg),
            defense: None,
            effects,
        };
    }

    // defender holds (ties included)
    let defense = (rolls.defender - rolls.attacker) + vit_term - strength;
    if defense > 0.0 {
        let recoil = defense.round() as i32;
        effects.push(format!(
            "{} holds; {} takes {} recoil",
            defender.name, attacker.name, recoil
        ));
        apply_damage(attacker, recoil, |line| effects.push(line));
        effects.push(format!(
            "[HP][{}] {}/{}",
            attacker.name, attacker.current_hp, attacker.max_hp
        ));
    } else {
        effects.push(format!("{} holds; no recoil", defender.name));
    }
    for line in &effects {
        log(line.clone());
    }

    DuelOutcome {
        hit: false,
        rolls: (rolls.attacker, rolls.defender),
        damage: None,
        defense: Some(defense),
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_log(_: String) {}

    fn opts() -> DuelOptions {
        DuelOptions { pierce_armor: false, vit_divisor: 100.0 }
    }

    #[test]
    fn hit_subtracts_scaled_vit() {
        let mut a = EntityInstance::player("Aya", 30, 0).with_stat(STR, 5.0);
        let mut b = EntityInstance::player("Gob", 40, 0).with_stat(VIT, 250.0);
        let out = resolve_attack(&mut a, &mut b, Rolls::new(15.0, 5.0), opts(), noop_log);
        // 10 + 5 - 2.5 = 12.5 → 13
        assert!(out.hit);
        assert_eq!(out.damage, Some(13));
        assert_eq!(b.current_hp, 27);
    }

    #[test]
    fn piercing_ignores_vit() {
        let mut a = EntityInstance::player("Aya", 30, 0).with_stat(STR, 5.0);
        let mut b = EntityInstance::player("Gob", 40, 0).with_stat(VIT, 250.0);
        let o = DuelOptions { pierce_armor: true, ..opts() };
        let out = resolve_attack(&mut a, &mut b, Rolls::new(15.0, 5.0), o, noop_log);
        assert_eq!(out.damage, Some(15));
    }

    #[test]
    fn strong_defense_recoils_on_attacker() {
        let mut a = EntityInstance::player("Aya", 30, 0).with_stat(STR, 2.0);
        let mut b = EntityInstance::player("Gob", 40, 0);
        let out = resolve_attack(&mut a, &mut b, Rolls::new(5.0, 12.0), opts(), noop_log);
        assert!(!out.hit);
        assert_eq!(out.defense, Some(5.0));
        assert_eq!(a.current_hp, 25);
        assert_eq!(b.current_hp, 40);
    }

    #[test]
    fn tie_with_strong_attacker_does_nothing() {
        let mut a = EntityInstance::player("Aya", 30, 0).with_stat(STR, 4.0);
        let mut b = EntityInstance::player("Gob", 40, 0);
        let out = resolve_attack(&mut a, &mut b, Rolls::new(8.0, 8.0), opts(), noop_log);
        assert!(!out.hit);
        assert_eq!(a.current_hp, 30);
        assert!(out.effects[0].contains("no recoil"));
    }
}
