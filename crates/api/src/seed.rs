//! Demo fixture data, shared by the `seed` CLI command and the integration
//! tests.

use chrono::{TimeZone, Utc};
use entity::{activity, company, contact, deal, tag, task};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DbErr};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SeededRecords {
    pub companies: Vec<company::Model>,
    pub contacts: Vec<contact::Model>,
    pub deals: Vec<deal::Model>,
    pub tags: Vec<tag::Model>,
}

impl SeededRecords {
    pub fn company_named(&self, name: &str) -> Option<&company::Model> {
        self.companies.iter().find(|c| c.name == name)
    }

    pub fn contact_named(&self, name: &str) -> Option<&contact::Model> {
        self.contacts.iter().find(|c| c.name == name)
    }

    pub fn deal_titled(&self, title: &str) -> Option<&deal::Model> {
        self.deals.iter().find(|d| d.title == title)
    }

    pub fn tag_named(&self, name: &str) -> Option<&tag::Model> {
        self.tags.iter().find(|t| t.name == name)
    }
}

fn timestamp(year: i32, month: u32, day: u32) -> DateTimeWithTimeZone {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid seed timestamp")
        .into()
}

pub async fn seed_demo(db: &DatabaseConnection) -> Result<SeededRecords, DbErr> {
    let seeded_at: DateTimeWithTimeZone = Utc::now().into();

    let hanbit = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Hanbit Systems".into()),
        industry: Set(Some("Software".into())),
        website: Set(Some("https://hanbit.test".into())),
        address: Set(None),
        employee_count: Set(Some(120)),
        memo: Set(None),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let daesung = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Daesung Trading".into()),
        industry: Set(Some("Wholesale".into())),
        website: Set(Some("https://daesung.test".into())),
        address: Set(Some("21 Teheran-ro, Seoul".into())),
        employee_count: Set(Some(45)),
        memo: Set(None),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let mina = contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Kim Mina".into()),
        email: Set(Some("mina@hanbit.test".into())),
        phone: Set(Some("010-1234-5678".into())),
        position: Set(Some("CTO".into())),
        company_id: Set(Some(hanbit.id)),
        memo: Set(None),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let junho = contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Park Junho".into()),
        email: Set(Some("junho@daesung.test".into())),
        phone: Set(Some("010-8765-4321".into())),
        position: Set(Some("Purchasing Lead".into())),
        company_id: Set(Some(daesung.id)),
        memo: Set(Some("Prefers morning calls.".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let mut deals = Vec::new();
    for (title, amount, stage, company_id, contact_id, updated) in [
        (
            "Hanbit platform license",
            48_000_000_i64,
            deal::Stage::Qualified,
            Some(hanbit.id),
            Some(mina.id),
            timestamp(2025, 5, 20),
        ),
        (
            "Daesung annual contract",
            120_000_000,
            deal::Stage::Proposal,
            Some(daesung.id),
            Some(junho.id),
            timestamp(2025, 6, 2),
        ),
        (
            "Hanbit support renewal",
            12_000_000,
            deal::Stage::Negotiation,
            Some(hanbit.id),
            Some(mina.id),
            timestamp(2025, 6, 10),
        ),
        (
            "Daesung pilot",
            6_500_000,
            deal::Stage::ClosedWon,
            Some(daesung.id),
            Some(junho.id),
            timestamp(2025, 4, 28),
        ),
        (
            "Inbound lead",
            0,
            deal::Stage::Lead,
            None,
            None,
            timestamp(2025, 6, 15),
        ),
    ] {
        let model = deal::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.into()),
            amount: Set(amount),
            stage: Set(stage),
            expected_close_date: Set(Some(timestamp(2025, 9, 30))),
            contact_id: Set(contact_id),
            company_id: Set(company_id),
            memo: Set(None),
            created_at: Set(timestamp(2025, 4, 1)),
            updated_at: Set(updated),
        }
        .insert(db)
        .await?;
        deals.push(model);
    }

    activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        kind: Set(activity::Kind::Meeting),
        title: Set("Kickoff with Hanbit".into()),
        description: Set(Some("Scope the platform rollout.".into())),
        scheduled_at: Set(Some(timestamp(2025, 6, 20))),
        completed_at: Set(None),
        contact_id: Set(Some(mina.id)),
        company_id: Set(Some(hanbit.id)),
        deal_id: Set(None),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    task::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Send revised quote".into()),
        description: Set(Some("Include the volume discount.".into())),
        due_date: Set(Some(timestamp(2025, 6, 25))),
        priority: Set(task::Priority::High),
        is_completed: Set(false),
        contact_id: Set(Some(junho.id)),
        company_id: Set(Some(daesung.id)),
        deal_id: Set(Some(deals[1].id)),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let mut tags = Vec::new();
    for (name, color) in [("vip", "#F87171"), ("renewal", "#60A5FA")] {
        let model = tag::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.into()),
            color: Set(color.into()),
            created_at: Set(seeded_at),
        }
        .insert(db)
        .await?;
        tags.push(model);
    }

    Ok(SeededRecords {
        companies: vec![hanbit, daesung],
        contacts: vec![mina, junho],
        deals,
        tags,
    })
}
