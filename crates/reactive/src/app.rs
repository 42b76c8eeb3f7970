use std::sync::Arc;

use crate::{
    session::{Change, ReactionTable, Session, SessionError},
    view::View,
};

type ServerFn<O> = Arc<dyn Fn() -> ReactionTable<O> + Send + Sync>;

/// A view description paired with the function that builds its reactions.
///
/// Each session gets its own reaction table, so nothing is shared between
/// sessions except the immutable view.
pub struct App<O> {
    name: String,
    view: View,
    server: ServerFn<O>,
}

impl<O> Clone for App<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            view: self.view.clone(),
            server: Arc::clone(&self.server),
        }
    }
}

impl<O: Clone> App<O> {
    pub fn new<F>(name: &str, view: View, server: F) -> Self
    where
        F: Fn() -> ReactionTable<O> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            view,
            server: Arc::new(server),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.view.title
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn start_session(&self) -> Result<(Session<O>, Vec<Change<O>>), SessionError> {
        Session::start(&self.view, (self.server)())
    }
}
