//! Synchronous versus asynchronous completion.

/// How an operation that may run in the background is completed.
///
/// The driver has a single async implementation. `IoBehavior` only decides
/// whether follow-up work (such as returning a session to its pool) is
/// awaited inline or spawned onto the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoBehavior {
    /// Spawn the work and return immediately.
    #[default]
    Asynchronous,
    /// Await the work before returning.
    Synchronous,
}

impl IoBehavior {
    /// Pick the behavior implied by a `force_synchronous` setting.
    #[must_use]
    pub fn from_force_synchronous(force: bool) -> Self {
        if force {
            Self::Synchronous
        } else {
            Self::Asynchronous
        }
    }
}
