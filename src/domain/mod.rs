mod date_range;
mod new_unsubscribe;
mod site_label;
mod unsubscribe_email;
mod unsubscribe_record;
// allow external `use` statements to skip `date_range` etc
pub use date_range::DateRange;
pub use new_unsubscribe::NewUnsubscribe;
pub use site_label::SiteLabel;
pub use unsubscribe_email::UnsubscribeEmail;
pub use unsubscribe_record::UnsubscribeRecord;
