// Domain layer: the brick/service data model and the ports the engines are written against.

pub mod model;
pub mod ports;
