// Domain layer: model types and ports. Calculation lives in `core`, I/O in `adapters`.

pub mod model;
pub mod ports;
