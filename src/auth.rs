//! Auth-domain identifiers, state tokens, the access guard, scope sets, and token models.

pub mod guard;
pub mod id;
pub mod scope;
pub mod state;
pub mod token;

pub use guard::*;
pub use id::*;
pub use scope::*;
pub use state::*;
pub use token::{record::*, secret::*};
