// Domain layer: lookup results and the ports the backends implement.

pub mod model;
pub mod ports;
