mod atmos;
mod gaslab;
mod mesonet;

pub use atmos::AtmosSpace;
pub use gaslab::GaslabSpace;
pub use mesonet::MesonetSpace;
