//! Resolution of a single command against a single village.
//!
//! [`resolve_battle`] runs the full attack sequence:
//!
//! 1. Regenerate allegiance up to the arrival time.
//! 2. Fight: support effects, modifier pipeline, power, casualties.
//! 3. Siege damage: rams as sent, catapults that survived a win.
//! 4. Plunder for a winning attacker.
//! 5. Allegiance reduction and, at zero, capture.
//!
//! The caller must hold the village's lock for the whole call.

use bastion_combat::modifiers::sample_luck;
use bastion_combat::plunder::{calculate_available_loot, calculate_carry_capacity, distribute_plunder};
use bastion_combat::siege::{SiegeForce, resolve_siege};
use bastion_combat::stats::count_matching;
use bastion_combat::{
    CombatError, EngagementInput, ModifierPipeline, UnitStatSource, resolve_engagement,
};
use bastion_types::{
    ArmyComposition, BattleResult, BattleWinner, Building, Command, CommandId, CommandKind,
    Resources, UnitRole, VillageId,
};
use rand::Rng;
use tracing::{debug, info};

use crate::catalog::UnitCatalog;
use crate::config::WorldConfig;
use crate::scheduler::is_fake_attack;
use crate::village::VillageCombatState;

/// Errors that stop one command from resolving.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Combat math failed, typically on an unknown unit type.
    #[error("combat error: {source}")]
    Combat {
        /// The underlying combat error.
        #[from]
        source: CombatError,
    },

    /// The command was routed to the wrong village.
    #[error("command {command_id} targets {expected}, not {actual}")]
    WrongVillage {
        /// The command.
        command_id: CommandId,
        /// Village the command targets.
        expected: VillageId,
        /// Village it was applied to.
        actual: VillageId,
    },

    /// The command kind does not match the operation.
    #[error("command {command_id} is not a {expected:?} command")]
    WrongKind {
        /// The command.
        command_id: CommandId,
        /// Kind the operation expects.
        expected: CommandKind,
    },
}

/// Shared, read-only inputs to resolution.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// World configuration.
    pub config: WorldConfig,
    /// Unit stats.
    pub catalog: UnitCatalog,
    /// Modifier stage order.
    pub pipeline: ModifierPipeline,
}

impl ResolveContext {
    /// Context with the catalog derived from `config` and the standard
    /// pipeline.
    pub fn new(config: WorldConfig) -> Self {
        let catalog = UnitCatalog::from_config(&config);
        Self {
            config,
            catalog,
            pipeline: ModifierPipeline::standard(),
        }
    }
}

/// Result of a support command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reinforcement {
    /// The support command.
    pub command_id: CommandId,
    /// Village reinforced.
    pub village_id: VillageId,
    /// Troops stationed.
    pub units: ArmyComposition,
}

/// Station a support command's army in its target village.
pub fn apply_support(
    command: &Command,
    village: &mut VillageCombatState,
) -> Result<Reinforcement, ResolveError> {
    check_routing(command, village, CommandKind::Support)?;
    village.station_support(&command.units);
    debug!(
        command_id = %command.id,
        village_id = %village.id,
        units = command.units.total_units(),
        "Support stationed"
    );
    Ok(Reinforcement {
        command_id: command.id,
        village_id: village.id,
        units: command.units.clone(),
    })
}

/// Resolve an attack command against its target village.
///
/// On success the village reflects the battle: defender casualties, siege
/// damage, looted resources, allegiance and, on capture, the new owner
/// and garrison. On error the village is unchanged.
pub fn resolve_battle(
    command: &Command,
    village: &mut VillageCombatState,
    ctx: &ResolveContext,
    rng: &mut impl Rng,
) -> Result<BattleResult, ResolveError> {
    check_routing(command, village, CommandKind::Attack)?;
    let config = &ctx.config;
    let catalog = &ctx.catalog;
    let now = command.arrival;

    // Validate everything that can fail before touching the village.
    let defenders = village.defending_force();
    let fake = is_fake_attack(&command.units, config.scheduler.fake_attack_population, catalog)?;

    let luck = sample_luck(rng, &config.combat.luck);
    let input = EngagementInput {
        attackers: &command.units,
        defenders: &defenders,
        wall_level: village.wall_level,
        fought_at: now,
        attacker_points: command.attacker_points,
        defender_points: village.owner_points,
        luck,
    };
    let engagement = resolve_engagement(&input, &ctx.pipeline, &config.combat, catalog)?;
    let attacker_won = engagement.winner == BattleWinner::AttackerWin;
    let attacker_survivors = engagement.attacker.survivors.without_empty();

    let carry = if attacker_won {
        calculate_carry_capacity(&attacker_survivors, catalog)?
    } else {
        0
    };

    village
        .allegiance
        .regenerate_to(now, village.regen_bonuses, &config.conquest);

    let siege = resolve_siege(
        SiegeForce {
            sent: &command.units,
            survivors: &attacker_survivors,
        },
        catalog,
        village.wall_level,
        &village.buildings,
        command.catapult_target,
        config.world.speed,
        attacker_won,
    );
    village.wall_level = siege.wall_after;
    for (building, &(_, after)) in &siege.building_damage {
        if *building != Building::Wall {
            village.buildings.insert(*building, after);
        }
    }

    village.split_defender_survivors(&engagement.defender.survivors);

    let loot = if attacker_won {
        plunder(village, carry, ctx)
    } else {
        Resources::default()
    };

    let nobles = count_matching(&attacker_survivors, catalog, |s| s.role == UnitRole::Conquest);
    let mut allegiance =
        village
            .allegiance
            .reduce_allegiance(nobles, attacker_won, now, &config.conquest, rng);

    let captured = attacker_won && allegiance.blocked.is_none() && village.allegiance.can_be_captured();
    let defender = village.owner;
    if captured {
        capture(village, command, &attacker_survivors, ctx);
        allegiance.after = village.allegiance.allegiance;
    }

    info!(
        command_id = %command.id,
        village_id = %village.id,
        winner = ?engagement.winner,
        ratio = engagement.ratio,
        wall_after = village.wall_level,
        allegiance = allegiance.after,
        captured,
        loot = loot.total(),
        "Battle resolved"
    );

    Ok(BattleResult {
        command_id: command.id,
        village_id: village.id,
        attacker: command.player,
        defender,
        fought_at: now,
        attacker_side: engagement.attacker,
        defender_side: engagement.defender,
        winner: engagement.winner,
        ratio: engagement.ratio,
        offense: engagement.offense,
        defense: engagement.defense,
        modifiers: engagement.modifiers,
        wall_before: siege.wall_before,
        wall_after: siege.wall_after,
        building_damage: siege.building_damage,
        allegiance,
        captured,
        loot,
        fake,
    })
}

fn check_routing(
    command: &Command,
    village: &VillageCombatState,
    expected: CommandKind,
) -> Result<(), ResolveError> {
    if command.target != village.id {
        return Err(ResolveError::WrongVillage {
            command_id: command.id,
            expected: command.target,
            actual: village.id,
        });
    }
    if command.kind != expected {
        return Err(ResolveError::WrongKind {
            command_id: command.id,
            expected,
        });
    }
    Ok(())
}

/// Take loot from the stockpile and return it.
fn plunder(village: &mut VillageCombatState, carry: u64, ctx: &ResolveContext) -> Resources {
    let limits = &ctx.config.combat.plunder;
    let assessment = calculate_available_loot(
        &village.resources,
        village.hiding_place_capacity,
        village.vault_percent,
        limits.cap_per_resource,
        limits.diminishing_factor,
    );
    let loot = distribute_plunder(&assessment.lootable, carry);
    village.resources = village.resources.saturating_sub(&loot);
    loot
}

/// Hand the village to the attacker.
///
/// Surviving attackers other than conquest units become the garrison and
/// stationed support goes home.
fn capture(
    village: &mut VillageCombatState,
    command: &Command,
    attacker_survivors: &ArmyComposition,
    ctx: &ResolveContext,
) {
    let previous = village.owner;
    village.owner = Some(command.player);
    village.owner_points = command.attacker_points;
    village.garrison = attacker_survivors
        .iter()
        .filter(|(unit, _)| {
            ctx.catalog
                .unit_stats(unit.as_str())
                .is_some_and(|s| s.role != UnitRole::Conquest)
        })
        .map(|(unit, count)| (unit.clone(), count))
        .collect::<ArmyComposition>()
        .without_empty();
    village.support = ArmyComposition::new();
    village
        .allegiance
        .apply_post_capture_allegiance(command.arrival, &ctx.config.conquest);

    info!(
        village_id = %village.id,
        previous_owner = ?previous,
        new_owner = %command.player,
        "Village captured"
    );
}
