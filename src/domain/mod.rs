// Domain layer: core models, ports (interfaces) and the pure reconciliation services.

pub mod model;
pub mod ports;

pub mod services;
