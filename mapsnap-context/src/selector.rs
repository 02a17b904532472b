//! Graphics config selection by caveat ranking.
//!
//! Some drivers list software-emulated or non-conformant configs ahead of
//! hardware-accelerated ones. The selector queries every config that meets
//! the hard requirements and orders them by [`ConfigCaveat`] severity with a
//! stable sort, so configs with equal caveats keep platform order.

use crate::{ConfigAttributes, ConfigCaveat, ConfigRequirements, ContextError, GraphicsPlatform};
use tracing::{debug, warn};

/// A candidate config with the data used to rank it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedConfig<C> {
    pub handle: C,
    pub caveat: ConfigCaveat,
    /// Reported sizes, `None` if the platform could not be queried.
    pub attributes: Option<ConfigAttributes>,
}

impl<C> RankedConfig<C> {
    pub fn new(handle: C, caveat: ConfigCaveat) -> Self {
        Self {
            handle,
            caveat,
            attributes: None,
        }
    }

    /// Lower is better.
    pub fn rank_weight(&self) -> i32 {
        self.caveat.rank_weight()
    }
}

/// Order candidates best first. Ties keep their input order.
pub fn rank_configs<C>(mut candidates: Vec<RankedConfig<C>>) -> Vec<RankedConfig<C>> {
    candidates.sort_by_key(RankedConfig::rank_weight);
    candidates
}

/// Picks configs for a fixed set of requirements.
#[derive(Debug, Clone, Copy)]
pub struct GraphicsConfigSelector<'a> {
    requirements: &'a ConfigRequirements,
}

impl<'a> GraphicsConfigSelector<'a> {
    pub fn new(requirements: &'a ConfigRequirements) -> Self {
        Self { requirements }
    }

    /// Every matching config, best first.
    ///
    /// A config whose caveat cannot be read is skipped.
    ///
    /// # Errors
    ///
    /// [`ContextError::NoConfigAvailable`] if nothing matches.
    pub fn ranked_configs<P: GraphicsPlatform>(
        &self,
        platform: &mut P,
        display: P::Display,
    ) -> Result<Vec<RankedConfig<P::Config>>, ContextError> {
        let configs = platform
            .matching_configs(display, self.requirements)
            .map_err(|e| {
                warn!(error = %e, "config query failed");
                ContextError::NoConfigAvailable
            })?;

        let mut candidates = Vec::with_capacity(configs.len());
        for (index, handle) in configs.into_iter().enumerate() {
            let caveat = match platform.config_caveat(display, handle) {
                Ok(caveat) => caveat,
                Err(e) => {
                    warn!(index, error = %e, "skipping config with unreadable caveat");
                    continue;
                }
            };
            let attributes = platform.config_attributes(display, handle).ok();
            match &attributes {
                Some(attrs) => debug!(index, %caveat, %attrs, "candidate config"),
                None => debug!(index, %caveat, "candidate config"),
            }
            candidates.push(RankedConfig {
                handle,
                caveat,
                attributes,
            });
        }

        if candidates.is_empty() {
            return Err(ContextError::NoConfigAvailable);
        }
        Ok(rank_configs(candidates))
    }

    /// The best matching config.
    pub fn select_best_config<P: GraphicsPlatform>(
        &self,
        platform: &mut P,
        display: P::Display,
    ) -> Result<RankedConfig<P::Config>, ContextError> {
        self.ranked_configs(platform, display)?
            .into_iter()
            .next()
            .ok_or(ContextError::NoConfigAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeConfig, FakePlatform};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_rank_prefers_no_caveat() {
        let ranked = rank_configs(vec![
            RankedConfig::new("slow", ConfigCaveat::Slow),
            RankedConfig::new("none", ConfigCaveat::None),
            RankedConfig::new("non-conformant", ConfigCaveat::NonConformant),
        ]);
        let order: Vec<_> = ranked.iter().map(|c| c.handle).collect();
        assert_eq!(order, vec!["none", "slow", "non-conformant"]);
    }

    #[test]
    fn test_rank_is_stable() {
        let ranked = rank_configs(vec![
            RankedConfig::new(1, ConfigCaveat::Slow),
            RankedConfig::new(2, ConfigCaveat::None),
            RankedConfig::new(3, ConfigCaveat::Slow),
            RankedConfig::new(4, ConfigCaveat::None),
        ]);
        let order: Vec<_> = ranked.iter().map(|c| c.handle).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_select_best_from_platform() {
        let mut platform = FakePlatform::with_configs(vec![
            FakeConfig::new(ConfigCaveat::Slow),
            FakeConfig::new(ConfigCaveat::None),
            FakeConfig::new(ConfigCaveat::NonConformant),
        ]);
        let display = platform.default_display().unwrap();
        let requirements = ConfigRequirements::default();

        let best = GraphicsConfigSelector::new(&requirements)
            .select_best_config(&mut platform, display)
            .unwrap();
        assert_eq!(best.caveat, ConfigCaveat::None);
        assert_eq!(best.attributes, Some(ConfigAttributes {
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            alpha_bits: 8,
            depth_bits: 16,
            stencil_bits: 0,
        }));
    }

    #[test]
    fn test_no_configs() {
        let mut platform = FakePlatform::with_configs(Vec::new());
        let display = platform.default_display().unwrap();
        let requirements = ConfigRequirements::default();
        let result = GraphicsConfigSelector::new(&requirements).select_best_config(&mut platform, display);
        assert!(matches!(result, Err(ContextError::NoConfigAvailable)));
    }

    fn caveat() -> impl Strategy<Value = ConfigCaveat> {
        prop_oneof![
            Just(ConfigCaveat::None),
            Just(ConfigCaveat::Slow),
            Just(ConfigCaveat::NonConformant),
        ]
    }

    proptest! {
        #[test]
        fn prop_first_has_minimal_weight(caveats in proptest::collection::vec(caveat(), 1..16)) {
            let candidates: Vec<_> = caveats
                .iter()
                .enumerate()
                .map(|(i, &c)| RankedConfig::new(i, c))
                .collect();
            let min = caveats.iter().map(|c| c.rank_weight()).min().unwrap();
            let first_with_min = caveats.iter().position(|c| c.rank_weight() == min).unwrap();

            let ranked = rank_configs(candidates);
            prop_assert_eq!(ranked[0].handle, first_with_min);
            prop_assert!(ranked.windows(2).all(|w| w[0].rank_weight() <= w[1].rank_weight()));
        }
    }
}
