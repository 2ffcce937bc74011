use crate::entity::{EntityInstance, InstanceState};

/// Apply damage and handle the drop to 0. Returns true if the participant dropped to 0 this call.
pub fn apply_damage(target: &mut EntityInstance, dmg: i32, mut log: impl FnMut(String)) -> bool {
    if dmg <= 0 || target.is_down() {
        return false;
    }

    let before = target.current_hp;
    target.current_hp = (target.current_hp - dmg).max(0);
    target.state = InstanceState::Modified;
    log(format!(
        "[DMG][{}] {} → {} (−{})",
        target.name, before, target.current_hp, dmg
    ));

    if before > 0 && target.current_hp == 0 {
        log(format!("[STATE][{}] drops to 0 HP", target.name));
        return true;
    }
    false
}

/// Healing, capped at max HP.
pub fn heal(target: &mut EntityInstance, amount: i32, mut log: impl FnMut(String)) {
    if amount <= 0 {
        return;
    }
    let before = target.current_hp;
    let was_down = target.is_down();
    target.current_hp = (target.current_hp + amount).min(target.max_hp);
    target.state = InstanceState::Modified;
    if was_down && target.current_hp > 0 {
        log(format!(
            "[HEAL][{}] +{} HP ({} → {}) and gets back up",
            target.name, amount, before, target.current_hp
        ));
    } else {
        log(format!(
            "[HEAL][{}] +{} HP ({} → {})",
            target.name, amount, before, target.current_hp
        ));
    }
}

/// Pay `cost` MP. Returns false (and changes nothing) when MP is insufficient.
pub fn spend_mp(target: &mut EntityInstance, cost: i32, mut log: impl FnMut(String)) -> bool {
    if cost <= 0 {
        return true;
    }
    if target.current_mp < cost {
        log(format!(
            "[MP][{}] needs {} MP, has {}",
            target.name, cost, target.current_mp
        ));
        return false;
    }
    let before = target.current_mp;
    target.current_mp -= cost;
    target.state = InstanceState::Modified;
    log(format!(
        "[MP][{}] {} → {} (−{})",
        target.name, before, target.current_mp, cost
    ));
    true
}

pub fn restore_mp(target: &mut EntityInstance, amount: i32, mut log: impl FnMut(String)) {
    if amount <= 0 {
        return;
    }
    let before = target.current_mp;
    target.current_mp = (target.current_mp + amount).min(target.max_mp);
    target.state = InstanceState::Modified;
    log(format!(
        "[MP][{}] +{} MP ({} → {})",
        target.name, amount, before, target.current_mp
    ));
}
