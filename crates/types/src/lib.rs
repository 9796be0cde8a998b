pub mod agreement;
pub mod clock;
pub mod contract_id;
pub mod entity;
pub mod message;
pub mod negotiation;
pub mod offer;
pub mod policy;
pub mod response;
pub mod state;

pub use agreement::*;
pub use clock::*;
pub use contract_id::*;
pub use entity::*;
pub use message::*;
pub use negotiation::*;
pub use offer::*;
pub use policy::*;
pub use response::*;
pub use state::*;

pub const PROTOCOL_VERSION: &str = "1.0";
