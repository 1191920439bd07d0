//! Convective transport of the flame state on the whole grid.
//! See [`convection_system::ConvectionSystem`].
pub mod convection_system;
