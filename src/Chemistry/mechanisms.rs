//! Ready-made mixtures for the demonstration driver and the tests.
use super::elementary_kinetics::{Arrhenius, ElementaryReaction};
use super::ideal_gas::IdealGasMixture;
use super::nasa7::Nasa7;

/// Enthalpy of formation released by A -> B, J/kmol
pub const TOY_HEAT_OF_REACTION: f64 = 1.0e8;

/// Three species: fuel-like `A`, product `B`, inert `N`.
///
/// Reactions:
/// - `A => B`, thermal decomposition
/// - `A + B => 2B`, autocatalytic branch
pub fn toy_flame_mechanism(pressure: f64) -> IdealGasMixture {
    let mut gas = inert_mixture(pressure);
    let mut decomposition =
        ElementaryReaction::new(vec![(0, 1.0)], vec![(1, 1.0)], Arrhenius::new(2.0e7, 0.0, 1.0e8));
    decomposition.equation = "A => B".to_string();
    let mut branching = ElementaryReaction::new(
        vec![(0, 1.0), (1, 1.0)],
        vec![(1, 2.0)],
        Arrhenius::new(5.0e8, 0.0, 8.0e7),
    );
    branching.equation = "A + B => 2B".to_string();
    gas.push_reaction(decomposition);
    gas.push_reaction(branching);
    gas
}

/// The species of [`toy_flame_mechanism`] without any reaction: all rates
/// vanish identically.
pub fn inert_mixture(pressure: f64) -> IdealGasMixture {
    let mut gas = IdealGasMixture::new(pressure);
    gas.add_species("A", 20.0, Nasa7::constant_cp(3.5, 0.0));
    gas.add_species("B", 20.0, Nasa7::constant_cp(4.0, -TOY_HEAT_OF_REACTION));
    gas.add_species("N", 28.0, Nasa7::constant_cp(3.5, 0.0));
    gas
}

/// Non-reacting binary mixture of `A` and `N`.
pub fn binary_inert_mixture(pressure: f64) -> IdealGasMixture {
    let mut gas = IdealGasMixture::new(pressure);
    gas.add_species("A", 20.0, Nasa7::constant_cp(3.5, 0.0));
    gas.add_species("N", 28.0, Nasa7::constant_cp(3.5, 0.0));
    gas
}
