// Domain layer: core models, the region catalog and ports (interfaces).

pub mod model;
pub mod ports;
pub mod regions;
