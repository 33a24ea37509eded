//! Health subsystem: route probes, component checks and the module prober

mod checks;
mod prober;
mod route;

pub use checks::{CheckOutcome, ComponentCheck, ComponentChecks, EndpointCheck};
pub use prober::{
    ModuleProber, DEFAULT_NOISE_PROBABILITY, DEFAULT_PROBE_TIMEOUT, MINOR_PERFORMANCE_ISSUE,
};
pub use route::{classify_status, join_url, HttpRouteProbe, RouteOutcome, RouteProbe};
