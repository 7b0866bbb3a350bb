//! Host activation capability.
//!
//! Making a resolved artifact's exported symbols visible to the running
//! process is entirely host-specific, so the engine never implements it —
//! hosts inject an `Activator` at engine construction and the engine calls it
//! once per resolved artifact, in declaration order.

use std::path::Path;

/// "Given a local artifact file, make its contents available for symbol
/// lookup within the current process." Assumed synchronous and idempotent
/// per path.
pub trait Activator: Send + Sync {
    fn activate(&self, artifact: &Path) -> anyhow::Result<()>;
}
