//! User interface components which are reused between different parts of the
//! user interface.

pub mod actions;
pub mod alert;
pub mod badge;
