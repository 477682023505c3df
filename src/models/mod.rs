mod collection;
mod devices;
mod interfaces;
mod links;
mod neighbors;
mod records;
mod topology;

pub use collection::*;
pub use devices::*;
pub use interfaces::*;
pub use links::*;
pub use neighbors::*;
pub use records::*;
pub use topology::*;
