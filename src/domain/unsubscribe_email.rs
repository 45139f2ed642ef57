use validator::ValidateEmail;

/// A syntactically valid email address, trimmed of surrounding whitespace.
/// Case is preserved; two addresses differing only in case are distinct
/// records.
#[derive(Debug)]
pub struct UnsubscribeEmail(String);

impl UnsubscribeEmail {
    pub fn parse(email: String) -> Result<Self, String> {
        let email = email.trim().to_string();
        match ValidateEmail::validate_email(&email) {
            true => Ok(Self(email)),
            false => Err("Invalid email address".to_string()),
        }
    }
}

impl AsRef<str> for UnsubscribeEmail {
    fn as_ref(&self) -> &str { &self.0 }
}
