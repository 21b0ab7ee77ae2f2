//! Message passing between ranks.

pub mod communicator;
pub mod wire;

pub use communicator::{CommTag, Communicator, NoComm, ThreadComm};
