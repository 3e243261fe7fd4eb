//! Store access: queries, identifiers, values and introspection

pub mod identifier;
pub mod introspect;
pub mod store;
pub mod value;

pub use identifier::*;
pub use introspect::*;
pub use store::*;
pub use value::*;
