use chrono::DateTime;
use chrono::Utc;

/// A row of the `unsubscribes` table, as shown to the admin. The surrogate id
/// is never selected.
#[derive(Debug, sqlx::FromRow)]
pub struct UnsubscribeRecord {
    pub email: String,
    pub site: Option<String>,
    pub unsubscribed_at: DateTime<Utc>,
}

impl UnsubscribeRecord {
    /// `YYYY-MM-DD HH:MM:SS`, in UTC
    pub fn unsubscribed_at_display(&self) -> String {
        self.unsubscribed_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn site_or_empty(&self) -> &str { self.site.as_deref().unwrap_or_default() }
}
