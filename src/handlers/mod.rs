// One module per service. Each exposes `routes` for its REST surface and,
// where siblings depend on it, `internal_routes` for service-to-service calls.

pub mod examinations;
pub mod facilities;
pub mod individuals;
pub mod practitioners;
pub mod public;
