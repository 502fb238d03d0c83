//! Command-layer entry points that sit between platform events and the
//! caches. Permission checks and message delivery happen in the caller.

pub mod assign;
pub mod players;
