// Domain layer: session models and the ports the transfer code is written against.

pub mod model;
pub mod ports;
