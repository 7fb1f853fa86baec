// Domain layer - business logic, entities, value objects
// No dependencies on other layers

pub mod entities;
pub mod events;
pub mod value_objects;

pub use entities::*;
pub use events::*;
pub use value_objects::*;
