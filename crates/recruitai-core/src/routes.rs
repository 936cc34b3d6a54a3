//! Navigation targets and the guard protecting signed-in views.

use std::fmt;

use crate::auth::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Signup,
    Profile,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Landing, Route::Login, Route::Signup, Route::Profile];

    /// Resolve a path. Unknown paths go to the landing page.
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        Self::ALL
            .into_iter()
            .find(|r| r.path().trim_end_matches('/') == trimmed)
            .unwrap_or(Route::Landing)
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Profile => "/me",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Landing => "RecruitAI",
            Route::Login => "Login",
            Route::Signup => "Sign Up",
            Route::Profile => "My Profile",
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Profile)
    }

    /// Where a navigation to this route actually lands.
    pub fn resolve(self, authenticated: bool) -> Route {
        if self.requires_auth() && !authenticated {
            Route::Login
        } else {
            self
        }
    }

    pub fn guard(self, session: &SessionState) -> Route {
        self.resolve(session.is_authenticated())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Links shown in the navigation bar.
pub fn nav_links(authenticated: bool) -> Vec<Route> {
    if authenticated {
        vec![Route::Profile]
    } else {
        vec![Route::Login, Route::Signup]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(Route::from_path("/"), Route::Landing);
        assert_eq!(Route::from_path("/login"), Route::Login);
        assert_eq!(Route::from_path("/signup/"), Route::Signup);
        assert_eq!(Route::from_path("/me"), Route::Profile);
        assert_eq!(Route::from_path("/admin"), Route::Landing);
        assert_eq!(Route::from_path(""), Route::Landing);
    }

    #[test]
    fn test_protected_route_redirects_to_login() {
        assert_eq!(Route::Profile.resolve(false), Route::Login);
        assert_eq!(Route::Profile.resolve(true), Route::Profile);
        for route in [Route::Landing, Route::Login, Route::Signup] {
            assert_eq!(route.resolve(false), route);
        }
    }

    #[test]
    fn test_nav_links() {
        assert_eq!(nav_links(true), vec![Route::Profile]);
        assert_eq!(nav_links(false), vec![Route::Login, Route::Signup]);
    }
}
