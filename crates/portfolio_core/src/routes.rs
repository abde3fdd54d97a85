//! Application routes.

use std::fmt::{Display, Formatter};

/// Navigable location in the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Admin,
    Login,
    Guide,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Home, Route::Admin, Route::Login, Route::Guide];

    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Admin => "/admin",
            Self::Login => "/login",
            Self::Guide => "/guide",
        }
    }

    /// Parses a request path. A trailing slash is tolerated.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        Self::ALL
            .into_iter()
            .find(|route| route.path() == normalized)
    }

    /// Whether the route requires an authorized session.
    pub fn is_protected(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::Route;

    #[test]
    fn parse_accepts_known_paths_and_trailing_slash() {
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse("/admin/"), Some(Route::Admin));
        assert_eq!(Route::parse("/login"), Some(Route::Login));
        assert_eq!(Route::parse("/guide"), Some(Route::Guide));
        assert_eq!(Route::parse("/missing"), None);
    }

    #[test]
    fn only_admin_is_protected() {
        let protected: Vec<Route> = Route::ALL
            .into_iter()
            .filter(|route| route.is_protected())
            .collect();
        assert_eq!(protected, vec![Route::Admin]);
    }
}
