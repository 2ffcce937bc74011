use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use palier::parser::text::as_number;
use palier::scaling::stats_for_level;
use palier::session::Session;
use palier::{Dice, EntityInstance, EntityPatch, Entry, Rolls, Settings, SkillMerge};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Subcommand)]
enum SettingsCmd {
    /// Print every setting, defaults included
    Show,
    /// Set one key (known keys are validated)
    Set { key: String, value: String },
    /// Write the built-in defaults back to the settings file
    Reset,
}

#[derive(Subcommand)]
enum Cmd {
    /// Parse the Markdown documents and replace the compendium
    Import {
        /// Documents directory (defaults to the docs_dir setting)
        dir: Option<PathBuf>,
        /// Precedence for colliding skill names: last_wins | first_wins | keep_both
        #[arg(long)]
        merge: Option<SkillMerge>,
    },
    /// List monster definitions
    Monsters,
    /// Show one monster (or skill) from the compendium
    Monster {
        name: String,
        /// Show the stats scaled to this level
        #[arg(long)]
        level: Option<i32>,
        /// Print as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List skill definitions
    Skills {
        /// Only skills whose category contains this text
        #[arg(long)]
        category: Option<String>,
    },
    /// List persisted players and kept monsters
    Players,
    /// Add a player character
    AddPlayer {
        name: String,
        #[arg(long)]
        hp: i32,
        #[arg(long, default_value_t = 0)]
        mp: i32,
        #[arg(long)]
        level: Option<i32>,
        /// Extra stat, repeatable (e.g. --stat STR=12)
        #[arg(long = "stat", value_parser = parse_stat)]
        stats: Vec<(String, f64)>,
    },
    /// Edit a player character; current HP/MP are clamped to the new maxima
    EditPlayer {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long)]
        level: Option<i32>,
        #[arg(long)]
        hp_max: Option<i32>,
        #[arg(long)]
        mp_max: Option<i32>,
        /// Current HP
        #[arg(long)]
        hp: Option<i32>,
        /// Current MP
        #[arg(long)]
        mp: Option<i32>,
        /// Set or add a stat, repeatable (e.g. --stat STR=12)
        #[arg(long = "stat", value_parser = parse_stat)]
        stats: Vec<(String, f64)>,
    },
    /// Remove a player character
    RemovePlayer { name: String },
    /// Instantiate a monster from the compendium
    Spawn {
        name: String,
        #[arg(long, conflicts_with = "phase")]
        level: Option<i32>,
        /// Boss phase label instead of a level
        #[arg(long)]
        phase: Option<String>,
        /// Persist the instance with the players
        #[arg(long, default_value_t = false)]
        keep: bool,
    },
    /// Damage a player or kept monster
    Damage { name: String, amount: i32 },
    /// Heal a player or kept monster
    Heal { name: String, amount: i32 },
    /// Spend MP (or restore it with --restore)
    Mana {
        name: String,
        amount: i32,
        #[arg(long, default_value_t = false)]
        restore: bool,
    },
    /// Resolve one attack; sides are participant names or `Monster@level`
    Duel {
        #[arg(long)]
        attacker: String,
        #[arg(long)]
        defender: String,
        #[arg(long)]
        roll_a: Option<f64>,
        #[arg(long)]
        roll_b: Option<f64>,
        /// RNG seed for determinism
        #[arg(long)]
        seed: Option<u64>,
        /// Ignore the defender's VIT
        #[arg(long, default_value_t = false)]
        pierce: bool,
        /// Print the outcome as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Every player back to full HP/MP
    Reset,
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        cmd: SettingsCmd,
    },
}

impl Cmd {
    fn name(&self) -> &'static str {
        match self {
            Cmd::Import { .. } => "import",
            Cmd::Monsters => "monsters",
            Cmd::Monster { .. } => "monster",
            Cmd::Skills { .. } => "skills",
            Cmd::Players => "players",
            Cmd::AddPlayer { .. } => "add-player",
            Cmd::EditPlayer { .. } => "edit-player",
            Cmd::RemovePlayer { .. } => "remove-player",
            Cmd::Spawn { .. } => "spawn",
            Cmd::Damage { .. } => "damage",
            Cmd::Heal { .. } => "heal",
            Cmd::Mana { .. } => "mana",
            Cmd::Duel { .. } => "duel",
            Cmd::Reset => "reset",
            Cmd::Settings { .. } => "settings",
        }
    }
}

#[derive(Parser)]
#[command(name = "palier")]
#[command(about = "Game-master aid: bestiary compendium and combat tracker")]
struct Cli {
    /// Directory holding compendium.json, entities.json and settings.json
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,
    /// -v for info, -vv for debug (overrides RUST_LOG)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Do not persist anything
    #[arg(long, global = true, default_value_t = false)]
    dry_run: bool,
    /// Allow overwriting a store file that fails to parse
    #[arg(long, global = true, default_value_t = false)]
    force: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

fn parse_stat(raw: &str) -> Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let value = as_number(value).ok_or_else(|| format!("'{value}' is not a number"))?;
    Ok((key.trim().to_string(), value))
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// `Slime@3` spawns a transient monster; anything else names a participant.
fn resolve_side(session: &mut Session, side: &str) -> anyhow::Result<String> {
    if session.participant(side).is_some() {
        return Ok(side.to_string());
    }
    if let Some((name, level)) = side.rsplit_once('@') {
        let level: i32 = level
            .trim()
            .parse()
            .with_context(|| format!("bad level in '{side}'"))?;
        let spawned = session.spawn(name.trim(), level)?;
        return Ok(spawned.name.clone());
    }
    bail!("no participant named '{side}' (use Monster@level to spawn one)")
}

fn print_log(session: &Session) {
    for line in session.combat_log() {
        println!("{line}");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut session = Session::open(&cli.data_dir);
    session.set_force(cli.force);
    let persist = !cli.dry_run;
    let command = cli.cmd.name();

    match cli.cmd {
        Cmd::Import { dir, merge } => {
            if cli.dry_run {
                let dir = dir.unwrap_or_else(|| session.settings().docs_dir());
                let merge = merge.unwrap_or_else(|| session.settings().skill_merge());
                let report = palier::parser::import_dir(&dir, merge)
                    .with_context(|| format!("importing {}", dir.display()))?;
                println!(
                    "parsed {} monsters, {} skills (dry run, nothing saved)",
                    report.compendium.monsters.len(),
                    report.compendium.skills.len()
                );
                for w in &report.warnings {
                    println!("warning: {w}");
                }
            } else {
                let report = session
                    .import_documents(dir.as_deref(), merge)
                    .context("import failed; the previous compendium is unchanged")?;
                println!(
                    "imported {} monsters, {} skills",
                    report.compendium.monsters.len(),
                    report.compendium.skills.len()
                );
                for w in &report.warnings {
                    println!("warning: {w}");
                }
            }
        }
        Cmd::Monsters => {
            for def in session.compendium().monsters.values() {
                let tier = def.tier.as_deref().map(|t| format!(" tier {t}")).unwrap_or_default();
                let boss = if def.boss { " boss" } else { "" };
                println!(
                    "{} [lvl {}-{}]{}{}",
                    def.name, def.level_range.min, def.level_range.max, tier, boss
                );
            }
        }
        Cmd::Monster { name, level, json } => {
            let entry = session
                .compendium()
                .lookup(&name)
                .with_context(|| format!("looking up '{name}'"))?;
            match (entry, level) {
                (Entry::Monster(def), Some(level)) => {
                    let stats = stats_for_level(def, level);
                    if json {
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    } else {
                        println!(
                            "{} lvl {}: HP {}/{} MP {}/{}",
                            def.name, stats.level, stats.hp, stats.hp_max, stats.mp, stats.mp_max
                        );
                        for (k, v) in &stats.other_stats {
                            println!("  {k}: {v}");
                        }
                    }
                }
                (Entry::Monster(def), None) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(def)?);
                    } else {
                        println!(
                            "{} [lvl {}-{}]",
                            def.name, def.level_range.min, def.level_range.max
                        );
                        for stats in &def.levels {
                            println!(
                                "  lvl {}: HP {}/{} MP {}/{}",
                                stats.level, stats.hp, stats.hp_max, stats.mp, stats.mp_max
                            );
                        }
                        for phase in &def.phases {
                            let label = phase.label.as_deref().unwrap_or("?");
                            println!("  phase {label}: HP {} MP {}", phase.hp_max, phase.mp_max);
                        }
                        if !def.skills.is_empty() {
                            let skills: Vec<&str> = def.skills.iter().map(String::as_str).collect();
                            println!("  skills: {}", skills.join(", "));
                        }
                    }
                }
                (Entry::Skill(skill), _) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(skill)?);
                    } else {
                        println!("{} (skill)", skill.name);
                        if !skill.description.is_empty() {
                            println!("  {}", skill.description);
                        }
                    }
                }
            }
        }
        Cmd::Skills { category } => {
            let wanted = category.map(|c| c.to_lowercase());
            for skill in session.compendium().skills.values() {
                let cat = skill.category.as_deref().unwrap_or("");
                if let Some(w) = &wanted {
                    if !cat.to_lowercase().contains(w.as_str()) {
                        continue;
                    }
                }
                let cost = skill.cost.as_deref().map(|c| format!(" [cost {c}]")).unwrap_or_default();
                println!("{}{}", skill.name, cost);
            }
        }
        Cmd::Players => {
            for view in session.view() {
                let p = view.instance;
                if p.is_player() {
                    println!("{}", p.status_line());
                } else {
                    println!("{}  <{}>", p.status_line(), view.definition_label());
                }
            }
        }
        Cmd::AddPlayer {
            name,
            hp,
            mp,
            level,
            stats,
        } => {
            let mut player = EntityInstance::player(name, hp, mp);
            player.level = level;
            for (k, v) in stats {
                player = player.with_stat(k, v);
            }
            let line = player.status_line();
            session.add_player(player)?;
            if persist {
                session.save().context("saving players")?;
            }
            println!("added {line}");
        }
        Cmd::EditPlayer {
            name,
            rename,
            level,
            hp_max,
            mp_max,
            hp,
            mp,
            stats,
        } => {
            let patch = EntityPatch {
                name: rename,
                level,
                max_hp: hp_max,
                max_mp: mp_max,
                current_hp: hp,
                current_mp: mp,
                stats: stats.into_iter().collect(),
            };
            if patch.is_empty() {
                bail!("nothing to edit for '{name}'");
            }
            let line = session.edit_player(&name, patch)?.status_line();
            if persist {
                session.save().context("saving players")?;
            }
            println!("edited {line}");
        }
        Cmd::RemovePlayer { name } => {
            let removed = session.remove_player(&name)?;
            if persist {
                session.save().context("saving players")?;
            }
            println!("removed {}", removed.name);
        }
        Cmd::Spawn {
            name,
            level,
            phase,
            keep,
        } => {
            let spawned = match (level, phase) {
                (_, Some(label)) => session.spawn_phase(&name, &label)?,
                (Some(level), None) => session.spawn(&name, level)?,
                (None, None) => {
                    let min = session.compendium().monster(&name)?.level_range.min;
                    session.spawn(&name, min)?
                }
            };
            let spawned_name = spawned.name.clone();
            println!("{}", spawned.status_line());
            if keep {
                session.keep(&spawned_name)?;
                if persist {
                    session.save().context("saving kept monster")?;
                }
            }
        }
        Cmd::Damage { name, amount } => {
            session.damage(&name, amount)?;
            print_log(&session);
            if persist {
                session.save()?;
            }
        }
        Cmd::Heal { name, amount } => {
            session.heal(&name, amount)?;
            print_log(&session);
            if persist {
                session.save()?;
            }
        }
        Cmd::Mana {
            name,
            amount,
            restore,
        } => {
            if restore {
                session.restore_mp(&name, amount)?;
            } else if !session.spend_mp(&name, amount)? {
                print_log(&session);
                bail!("'{name}' does not have {amount} MP");
            }
            print_log(&session);
            if persist {
                session.save()?;
            }
        }
        Cmd::Duel {
            attacker,
            defender,
            roll_a,
            roll_b,
            seed,
            pierce,
            json,
        } => {
            let a = resolve_side(&mut session, &attacker)?;
            let d = resolve_side(&mut session, &defender)?;
            let mut dice = match seed {
                Some(seed) => Dice::from_seed(seed),
                None => Dice::from_entropy(),
            };
            let rolls = Rolls::draw(&mut dice, session.settings().max_roll(), roll_a, roll_b);
            let outcome = session.resolve_attack(&a, &d, rolls, pierce)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("[DUEL] {a} ({}) vs {d} ({})", rolls.attacker, rolls.defender);
                for line in &outcome.effects {
                    println!("{line}");
                }
            }
            if persist {
                session.save()?;
            }
        }
        Cmd::Reset => {
            if cli.dry_run {
                println!("would reset {} players", session.players().len());
            } else {
                session.reset_hp_mp().context("resetting players")?;
                for p in session.players() {
                    println!("{}", p.status_line());
                }
            }
        }
        Cmd::Settings { cmd } => match cmd {
            SettingsCmd::Show => {
                for (k, v) in session.settings().iter() {
                    println!("{k} = {v}");
                }
            }
            SettingsCmd::Set { key, value } => {
                session.settings_mut().set(&key, &value)?;
                if persist {
                    session.save_settings().context("saving settings")?;
                }
                println!("{key} = {value}");
            }
            SettingsCmd::Reset => {
                *session.settings_mut() = Settings::default();
                if persist {
                    session.save_settings().context("saving settings")?;
                }
                println!("settings reset to defaults");
            }
        },
    }
    info!(command, dry_run = cli.dry_run, "done");
    Ok(())
}
