//! Pure game rules. Nothing here touches the store or the network.

pub mod map;
pub mod roles;
pub mod tally;
pub mod win;

pub use roles::assign_roles;
pub use tally::{quorum_reached, tally, Verdict};
pub use win::evaluate;
