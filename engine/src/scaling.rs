//! Stats for an arbitrary level, derived from the levels a monster actually defines.

use indexmap::IndexMap;
use tracing::warn;

use crate::model::{LevelStats, MonsterDefinition};

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_i(a: i32, b: i32, t: f64) -> i32 {
    lerp(a as f64, b as f64, t).round() as i32
}

/// Exact level if defined; otherwise a linear interpolation between the
/// surrounding defined levels, clamped to the lowest/highest one.
pub fn stats_for_level(def: &MonsterDefinition, level: i32) -> LevelStats {
    let levels = &def.levels;
    let (Some(first), Some(last)) = (levels.first(), levels.last()) else {
        warn!(monster = %def.name, level, "no level stats defined; instantiating with zeroed stats");
        return LevelStats::empty(level);
    };

    // clamped stats still report the requested level
    if level <= first.level {
        return LevelStats { level, ..first.clone() };
    }
    if level >= last.level {
        return LevelStats { level, ..last.clone() };
    }
    if let Some(exact) = def.level(level) {
        return exact.clone();
    }

    // levels is sorted and level lies strictly between first and last
    let upper = levels.partition_point(|s| s.level < level);
    let hi = &levels[upper];
    let lo = &levels[upper - 1];
    let t = (level - lo.level) as f64 / (hi.level - lo.level) as f64;

    let mut other_stats = IndexMap::new();
    for (key, a) in &lo.other_stats {
        let b = hi.other_stats.get(key).copied().unwrap_or(*a);
        other_stats.insert(key.clone(), lerp(*a, b, t).round());
    }
    for (key, b) in &hi.other_stats {
        other_stats.entry(key.clone()).or_insert(*b);
    }

    let hp_max = lerp_i(lo.hp_max, hi.hp_max, t);
    let mp_max = lerp_i(lo.mp_max, hi.mp_max, t);
    let nearest = if t < 0.5 { lo } else { hi };

    LevelStats {
        level,
        label: None,
        hp: lerp_i(lo.hp, hi.hp, t).min(hp_max),
        hp_max,
        mp: lerp_i(lo.mp, hi.mp, t).min(mp_max),
        mp_max,
        other_stats,
        base_attack: nearest.base_attack.clone(),
        extra: nearest.extra.clone(),
    }
}
