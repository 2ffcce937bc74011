use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod entity;
pub mod error;
pub mod life;
pub mod model;
pub mod parser;
pub mod rules;
pub mod scaling;
pub mod session;
pub mod store;

pub use entity::{reset_all, EntityInstance, EntityKind, EntityPatch, InstanceState};
pub use error::{ParseError, SessionError, StoreError, UnknownDefinition};
pub use model::{Compendium, Entry, LevelRange, LevelStats, MonsterDefinition, SkillDefinition};
pub use parser::{ImportReport, ParseWarning, SkillMerge};
pub use store::settings::Settings;

pub struct Dice { rng: ChaCha8Rng }

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    pub fn from_entropy() -> Self {
        Self { rng: ChaCha8Rng::from_entropy() }
    }

    /// Roll a single die in `1..=max` (a `max` of 0 is treated as 1).
    pub fn roll(&mut self, max: u32) -> u32 {
        self.rng.gen_range(1..=max.max(1))
    }
}

/* ---------------- duel rolls ---------------- */

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rolls {
    pub attacker: f64,
    pub defender: f64,
}

impl Rolls {
    pub fn new(attacker: f64, defender: f64) -> Self {
        Self { attacker, defender }
    }

    /// Draw both sides from the dice; either side can be pinned by the caller.
    pub fn draw(dice: &mut Dice, max: u32, attacker: Option<f64>, defender: Option<f64>) -> Self {
        let attacker = attacker.unwrap_or_else(|| dice.roll(max) as f64);
        let defender = defender.unwrap_or_else(|| dice.roll(max) as f64);
        Self { attacker, defender }
    }
}
