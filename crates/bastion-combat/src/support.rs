//! Support unit effects: banner aura, mantlet protection, healer recovery.

use bastion_types::{ArmyComposition, SideOutcome, SupportEffect, UnitRole};

use crate::config::SupportConfig;
use crate::stats::{UnitStatSource, count_matching};

/// Banner aura granted to a defending force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BannerAura {
    /// Tier reached; 0 means no banner present.
    pub tier: u8,
    /// Defense multiplier; 1 at tier 0.
    pub multiplier: f64,
}

impl BannerAura {
    /// No aura.
    pub const NONE: Self = Self {
        tier: 0,
        multiplier: 1.0,
    };
}

/// Banner aura of a force, from the number of banner units present.
///
/// Tiers are numbered from 1 in ascending `min_units` order; the highest
/// satisfied tier applies.
pub fn banner_aura(
    force: &ArmyComposition,
    stats: &impl UnitStatSource,
    config: &SupportConfig,
) -> BannerAura {
    let banners = count_matching(force, stats, |s| {
        s.support_effect == Some(SupportEffect::Banner)
    });
    if banners == 0 {
        return BannerAura::NONE;
    }

    let mut tiers = config.banner_tiers.clone();
    tiers.sort_by_key(|t| t.min_units);

    let mut aura = BannerAura::NONE;
    for (index, tier) in tiers.iter().enumerate() {
        if banners >= u64::from(tier.min_units) {
            aura = BannerAura {
                tier: u8::try_from(index.saturating_add(1)).unwrap_or(u8::MAX),
                multiplier: tier.multiplier,
            };
        }
    }
    aura
}

/// Fraction of ranged damage a force ignores thanks to mantlets.
///
/// Requires both a mantlet and a siege unit in the same force.
pub fn mantlet_protection(
    force: &ArmyComposition,
    stats: &impl UnitStatSource,
    config: &SupportConfig,
) -> f64 {
    let mantlets = count_matching(force, stats, |s| {
        s.support_effect == Some(SupportEffect::Mantlet)
    });
    let siege = count_matching(force, stats, |s| s.role == UnitRole::Siege);
    if mantlets > 0 && siege > 0 {
        config.mantlet_reduction
    } else {
        0.0
    }
}

/// Recovery rate for a number of surviving healers.
#[allow(clippy::cast_precision_loss)]
pub fn healer_recovery_rate(healer_survivors: u64, config: &SupportConfig) -> f64 {
    (config.healer_rate_per_unit * healer_survivors as f64).clamp(0.0, config.healer_max_rate)
}

/// Move `floor(lost * rate)` units of each type from losses back to survivors.
///
/// Only applies when healers are among the survivors. Recovered counts are
/// recorded in `side.recovered`. Returns the rate used.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn apply_healer_recovery(
    side: &mut SideOutcome,
    stats: &impl UnitStatSource,
    config: &SupportConfig,
) -> f64 {
    let healers = count_matching(&side.survivors, stats, |s| {
        s.support_effect == Some(SupportEffect::Healer)
    });
    if healers == 0 {
        return 0.0;
    }

    let rate = healer_recovery_rate(healers, config);
    let lost: Vec<_> = side
        .losses
        .iter()
        .filter(|&(_, count)| count > 0)
        .map(|(unit, count)| (unit.clone(), count))
        .collect();

    for (unit, count) in lost {
        let recovered = ((f64::from(count) * rate).floor() as u32).min(count);
        if recovered == 0 {
            continue;
        }
        side.losses.set(unit.as_str(), count.saturating_sub(recovered));
        let alive = side.survivors.get(unit.as_str());
        side.survivors.set(unit.as_str(), alive.saturating_add(recovered));
        side.recovered.set(unit.as_str(), recovered);
    }
    rate
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::casualties::apply_attrition;
    use crate::stats::standard_unit_table;

    #[test]
    fn no_banner_means_tier_zero() {
        let table = standard_unit_table();
        let force = ArmyComposition::new().with("spear", 100);
        assert_eq!(
            banner_aura(&force, &table, &SupportConfig::default()),
            BannerAura::NONE
        );
    }

    #[test]
    fn one_banner_reaches_tier_one() {
        let table = standard_unit_table();
        let force = ArmyComposition::new().with("spear", 100).with("banner", 1);
        let aura = banner_aura(&force, &table, &SupportConfig::default());
        assert_eq!(aura.tier, 1);
        assert!((aura.multiplier - 1.15).abs() < f64::EPSILON);
    }

    #[test]
    fn more_banners_reach_higher_tiers() {
        let table = standard_unit_table();
        let force = ArmyComposition::new().with("banner", 12);
        let aura = banner_aura(&force, &table, &SupportConfig::default());
        assert_eq!(aura.tier, 3);
        assert!((aura.multiplier - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn mantlet_needs_siege_in_same_force() {
        let table = standard_unit_table();
        let config = SupportConfig::default();
        let mantlet_only = ArmyComposition::new().with("mantlet", 2).with("axe", 50);
        let siege_only = ArmyComposition::new().with("ram", 2).with("axe", 50);
        let both = ArmyComposition::new().with("mantlet", 1).with("ram", 2);
        assert!(mantlet_protection(&mantlet_only, &table, &config).abs() < f64::EPSILON);
        assert!(mantlet_protection(&siege_only, &table, &config).abs() < f64::EPSILON);
        assert!((mantlet_protection(&both, &table, &config) - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn healer_rate_is_capped() {
        let config = SupportConfig::default();
        assert!((healer_recovery_rate(1, &config) - 0.05).abs() < 1e-12);
        assert!((healer_recovery_rate(2, &config) - 0.10).abs() < 1e-12);
        assert!((healer_recovery_rate(10, &config) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn healers_restore_floor_of_losses_and_keep_conservation() {
        let table = standard_unit_table();
        let army = ArmyComposition::new().with("spear", 100).with("healer", 4);
        // 50% attrition: 50 spears and 2 healers lost, 2 healers survive.
        let mut side = apply_attrition(&army, 0.5);
        let rate = apply_healer_recovery(&mut side, &table, &SupportConfig::default());
        assert!((rate - 0.10).abs() < 1e-12);
        assert_eq!(side.recovered.get("spear"), 5);
        assert_eq!(side.survivors.get("spear"), 55);
        assert_eq!(side.losses.get("spear"), 45);
        assert_eq!(side.recovered.get("healer"), 0);
        assert!(side.is_conserved());
    }

    #[test]
    fn no_surviving_healers_no_recovery() {
        let table = standard_unit_table();
        let army = ArmyComposition::new().with("spear", 100).with("healer", 1);
        let mut side = apply_attrition(&army, 1.0);
        let rate = apply_healer_recovery(&mut side, &table, &SupportConfig::default());
        assert!(rate.abs() < f64::EPSILON);
        assert!(side.recovered.is_empty());
    }
}
