/// Free-text label naming the site or system that triggered an unsubscribe.
///
/// Must be instantiated with `SiteLabel::parse`, which trims the input and
/// maps blank input to "no label".
#[derive(Debug)]
pub struct SiteLabel(String);

/// Matches the width of the `site` column
pub const MAX_SITE_CHARS: usize = 100;

impl SiteLabel {
    pub fn parse(site: String) -> Result<Option<Self>, String> {
        let site = site.trim();
        if site.is_empty() {
            return Ok(None);
        }
        if site.chars().count() > MAX_SITE_CHARS {
            return Err(format!(
                "Site label must be at most {MAX_SITE_CHARS} characters"
            ));
        }
        if site.chars().any(char::is_control) {
            return Err("Site label contains invalid characters".to_string());
        }
        Ok(Some(Self(site.to_string())))
    }
}

impl AsRef<str> for SiteLabel {
    fn as_ref(&self) -> &str { &self.0 }
}
