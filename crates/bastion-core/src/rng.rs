//! Per-command random number generators.

use bastion_types::Command;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::RngMode;

/// RNG used to resolve one command.
///
/// In [`RngMode::Seeded`] the generator is derived from the world seed and
/// the command's sequence number, so replaying a tick reproduces every
/// luck roll and allegiance drop.
pub fn command_rng(mode: RngMode, world_seed: u64, command: &Command) -> StdRng {
    match mode {
        RngMode::Seeded => StdRng::seed_from_u64(world_seed ^ command.sequence),
        RngMode::Entropy => StdRng::from_os_rng(),
    }
}
