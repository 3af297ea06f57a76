//! Chant animation: display modes and line rendering, the fade, and the
//! session state machine.

pub(crate) mod fade;
pub(crate) mod lines;
pub(crate) mod player;
