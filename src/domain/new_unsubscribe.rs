use super::SiteLabel;
use super::UnsubscribeEmail;

#[derive(Debug)]
pub struct NewUnsubscribe {
    pub email: UnsubscribeEmail,
    pub site: Option<SiteLabel>,
}
