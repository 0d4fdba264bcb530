//! Cached-view invalidation hooks.
//!
//! Actions that change who is signed in or what a page shows signal the
//! presentation layer to drop cached renders for a scope. Delivery is
//! fire-and-forget: a failing sink never fails the action.

use std::sync::Mutex;

/// Root layout, re-rendered after login/logout.
pub const LAYOUT_ROOT: &str = "/";
/// Profile page, re-rendered after a profile update.
pub const PROFILE_PAGE: &str = "/admin/profile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewScope {
    /// A layout and everything nested under it.
    Layout(String),
    /// A single page.
    Page(String),
}

impl ViewScope {
    pub fn root_layout() -> Self {
        Self::Layout(LAYOUT_ROOT.to_string())
    }

    pub fn profile_page() -> Self {
        Self::Page(PROFILE_PAGE.to_string())
    }

    pub fn path(&self) -> &str {
        match self {
            ViewScope::Layout(p) | ViewScope::Page(p) => p,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ViewScope::Layout(_) => "layout",
            ViewScope::Page(_) => "page",
        }
    }
}

pub trait ViewInvalidator: Send + Sync {
    fn invalidate(&self, scope: &ViewScope);
}

/// Logs each invalidation. Used when no render cache sits in front of the API.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInvalidator;

impl ViewInvalidator for LoggingInvalidator {
    fn invalidate(&self, scope: &ViewScope) {
        tracing::debug!(kind = scope.kind(), path = scope.path(), "view invalidated");
    }
}

/// Records scopes in order, for assertions.
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    scopes: Mutex<Vec<ViewScope>>,
}

impl RecordingInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scopes(&self) -> Vec<ViewScope> {
        self.scopes.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ViewInvalidator for RecordingInvalidator {
    fn invalidate(&self, scope: &ViewScope) {
        if let Ok(mut scopes) = self.scopes.lock() {
            scopes.push(scope.clone());
        }
    }
}

impl<V> ViewInvalidator for std::sync::Arc<V>
where
    V: ViewInvalidator + ?Sized,
{
    fn invalidate(&self, scope: &ViewScope) {
        (**self).invalidate(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_keeps_order() {
        let r = RecordingInvalidator::new();
        r.invalidate(&ViewScope::root_layout());
        r.invalidate(&ViewScope::profile_page());
        assert_eq!(r.scopes(), vec![ViewScope::root_layout(), ViewScope::profile_page()]);
        assert_eq!(r.scopes()[1].path(), "/admin/profile");
        assert_eq!(r.scopes()[0].kind(), "layout");
    }
}
