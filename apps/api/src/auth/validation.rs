//! Field validators shared by registration and profile updates.
//! Each returns `Some(message)` when the value is rejected.

const MAX_USERNAME_LENGTH: usize = 150;
const MAX_NAME_LENGTH: usize = 150;
pub const MAX_BIO_LENGTH: usize = 500;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn check_email(email: &str) -> Option<String> {
    let invalid = Some("Enter a valid email address.".to_string());
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return invalid;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return invalid;
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return invalid;
    }
    if domain.split('.').any(str::is_empty) {
        return invalid;
    }
    None
}

pub fn check_username(username: &str) -> Option<String> {
    if username.is_empty() {
        return Some("This field is required.".to_string());
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Some(format!(
            "Ensure this field has no more than {MAX_USERNAME_LENGTH} characters."
        ));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    None
}

/// Accepts an optional `+`, then 9 to 15 digits (an extra leading `1` allowed).
pub fn check_phone(phone: &str) -> Option<String> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let valid_digits = !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
    let len = digits.len();
    let valid_len = (9..=15).contains(&len) || (len == 16 && digits.starts_with('1'));
    if valid_digits && valid_len {
        None
    } else {
        Some("Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.".to_string())
    }
}

pub fn check_name(name: &str) -> Option<String> {
    (name.chars().count() > MAX_NAME_LENGTH)
        .then(|| format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters."))
}

pub fn check_bio(bio: &str) -> Option<String> {
    (bio.chars().count() > MAX_BIO_LENGTH)
        .then(|| format!("Ensure this field has no more than {MAX_BIO_LENGTH} characters."))
}
