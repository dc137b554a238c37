//! Stage abstraction: pad templates, the [`Stage`] trait and factories.

mod factory;
mod pad;
mod stage;

pub use factory::{StageConstructor, StageFactory, StageKlass};
pub use pad::{PadDirection, PadPresence, PadTemplate};
pub use stage::Stage;
