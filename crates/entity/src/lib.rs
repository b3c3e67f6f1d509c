pub mod activity;
pub mod company;
pub mod company_tag;
pub mod contact;
pub mod contact_tag;
pub mod deal;
pub mod deal_tag;
pub mod email_template;
pub mod tag;
pub mod task;
