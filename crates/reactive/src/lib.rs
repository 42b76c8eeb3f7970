//! Reactive form-to-output sessions.
//!
//! [`view`] describes controls and output placeholders, [`session`] keeps the
//! input values of one user and re-runs reactions when they change, and
//! [`App`] ties a view to the reactions that serve it.

mod app;
pub mod input;
pub mod session;
pub mod view;

pub use app::App;
pub use input::InputError;
pub use session::{
    Change, Inputs, ReactionError, ReactionTable, Session, SessionError, Trigger, Updates,
    MAX_FLUSH_ROUNDS,
};
pub use view::{InputKind, InputSpec, Layout, Node, OutputKind, OutputSpec, View, ViewError};
