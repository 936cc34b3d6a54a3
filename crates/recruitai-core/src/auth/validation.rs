//! Input checks for the login and signup forms.
//!
//! These run before any network call. A failed check never reaches the API.

use std::fmt;

use thiserror::Error;

/// Minimum length for a login identifier (username or email)
const MIN_IDENTIFIER_LENGTH: usize = 3;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 32;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// One or more rejected fields, in form order.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("{}", display_errors(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn display_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: &'static str) {
        self.0.push(FieldError { field, message });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First message reported for `field`
    pub fn message_for(&self, field: &str) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn validate_login(identifier: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let identifier = identifier.trim();

    if identifier.is_empty() {
        errors.push("usernameOrEmail", "Username or email is required");
    } else if identifier.chars().count() < MIN_IDENTIFIER_LENGTH {
        errors.push("usernameOrEmail", "Must be at least 3 characters");
    }

    if password.is_empty() {
        errors.push("password", "Password is required");
    }

    errors.into_result()
}

pub fn validate_signup(username: &str, email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_username(username, &mut errors);
    check_email(email, &mut errors);
    check_password(password, &mut errors);
    errors.into_result()
}

/// The signup form as entered, including the password confirmation.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = match validate_signup(&self.username, &self.email, &self.password) {
            Ok(()) => ValidationErrors::default(),
            Err(errors) => errors,
        };
        if self.confirm.is_empty() {
            errors.push("confirm", "Please confirm your password");
        } else if self.confirm != self.password {
            errors.push("confirm", "Passwords do not match");
        }
        errors.into_result()
    }
}

fn check_username(username: &str, errors: &mut ValidationErrors) {
    let len = username.chars().count();
    if username.is_empty() {
        errors.push("username", "Username is required");
    } else if len < MIN_USERNAME_LENGTH {
        errors.push("username", "At least 3 characters");
    } else if len > MAX_USERNAME_LENGTH {
        errors.push("username", "At most 32 characters");
    } else if !username.chars().all(is_username_char) {
        errors.push("username", "Only letters, numbers, . _ -");
    }
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn check_email(email: &str, errors: &mut ValidationErrors) {
    if email.is_empty() {
        errors.push("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.push("email", "Enter a valid email");
    }
}

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot in the
/// domain with text on both sides of it.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot + 1 < domain.len(),
        None => false,
    }
}

fn check_password(password: &str, errors: &mut ValidationErrors) {
    if password.is_empty() {
        errors.push("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push("password", "At least 8 characters");
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("password", "Must include an uppercase letter");
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("password", "Must include a lowercase letter");
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("password", "Must include a number");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_both_fields() {
        let errors = validate_login("", "").unwrap_err();
        assert_eq!(errors.message_for("usernameOrEmail"), Some("Username or email is required"));
        assert_eq!(errors.message_for("password"), Some("Password is required"));
    }

    #[test]
    fn test_login_identifier_is_trimmed() {
        let errors = validate_login("  ab  ", "pw").unwrap_err();
        assert_eq!(errors.message_for("usernameOrEmail"), Some("Must be at least 3 characters"));
        assert!(validate_login("  ada  ", "pw").is_ok());
    }

    #[test]
    fn test_username_rules() {
        let check = |u: &str| {
            validate_signup(u, "ada@example.com", "Secret123")
                .err()
                .and_then(|e| e.message_for("username"))
        };
        assert_eq!(check(""), Some("Username is required"));
        assert_eq!(check("ab"), Some("At least 3 characters"));
        assert_eq!(check(&"a".repeat(33)), Some("At most 32 characters"));
        assert_eq!(check("ada lovelace"), Some("Only letters, numbers, . _ -"));
        assert_eq!(check("ada!"), Some("Only letters, numbers, . _ -"));
        assert_eq!(check("ada.love_lace-1"), None);
        assert_eq!(check(&"a".repeat(32)), None);
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.co"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada@example."));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada @example.com"));
        assert!(!is_valid_email("ada.example.com"));
    }

    #[test]
    fn test_password_rules() {
        let check = |p: &str| {
            validate_signup("ada", "ada@example.com", p)
                .err()
                .and_then(|e| e.message_for("password"))
        };
        assert_eq!(check(""), Some("Password is required"));
        assert_eq!(check("Ab1"), Some("At least 8 characters"));
        assert_eq!(check("secret123"), Some("Must include an uppercase letter"));
        assert_eq!(check("SECRET123"), Some("Must include a lowercase letter"));
        assert_eq!(check("SecretPass"), Some("Must include a number"));
        assert_eq!(check("Secret123"), None);
    }

    #[test]
    fn test_signup_form_confirmation() {
        let mut form = SignupForm {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "Secret123".to_string(),
            confirm: String::new(),
        };
        assert_eq!(
            form.validate().unwrap_err().message_for("confirm"),
            Some("Please confirm your password")
        );

        form.confirm = "Secret124".to_string();
        assert_eq!(
            form.validate().unwrap_err().message_for("confirm"),
            Some("Passwords do not match")
        );

        form.confirm = "Secret123".to_string();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_errors_display_in_form_order() {
        let errors = validate_signup("", "", "").unwrap_err();
        assert_eq!(
            errors.to_string(),
            "username: Username is required; email: Email is required; password: Password is required"
        );
    }
}
