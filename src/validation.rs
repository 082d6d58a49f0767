use crate::error::{CourtError, Result};
use crate::models::{ApplicationRecord, StaffAccount};

/// Field-level problems collected before anything is reported.
#[derive(Debug, Default)]
struct Problems(Vec<String>);

impl Problems {
    fn require(&mut self, field: &str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.0.push(format!("{field}: {label} is required"));
        }
    }

    fn push(&mut self, field: &str, message: &str) {
        self.0.push(format!("{field}: {message}"));
    }

    fn finish(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(CourtError::Validation(self.0))
        }
    }
}

/// Checks a new application before it is submitted.
pub fn validate_application(record: &ApplicationRecord) -> Result<()> {
    let mut problems = Problems::default();
    if record.sr_no.is_none() {
        problems.push("sr_no", "Sr. No is required");
    }
    problems.require("dairy_no", "Dairy No", &record.dairy_no);
    problems.require("name", "Name", &record.name);
    problems.require("contact", "Contact", &record.contact);
    problems.require("police_station", "Police Station", &record.police_station);
    problems.require("category", "Category", &record.category);
    problems.finish()
}

pub const MIN_PASSWORD_LEN: usize = 3;

/// Checks the staff form. Passwords are only mandatory when creating;
/// an edit may leave the password blank to keep the current one.
pub fn validate_staff(account: &StaffAccount, creating: bool) -> Result<()> {
    let mut problems = Problems::default();
    problems.require("username", "Username", &account.username);

    let password = account.password.as_deref().unwrap_or_default();
    if password.is_empty() {
        if creating {
            problems.push("password", "Password is required");
        }
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push("password", "Password must be at least 3 characters");
    }

    problems.require("police_station", "Police Station", &account.police_station);

    let email = account.email.trim();
    if !email.is_empty() && !looks_like_email(email) {
        problems.push("email", "Email is invalid");
    }
    problems.finish()
}

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
