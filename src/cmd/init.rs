//! Project initialization command — `pipeline-board init`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use pipeline_board::config::{PipelineConfig, PipelineToml};
use pipeline_board::store::db::CrmDb;
use pipeline_common::{CompanyRef, NewDeal, Priority, Stage};

pub fn cmd_init(config: &PipelineConfig, demo: bool) -> Result<()> {
    let was_initialized = config.config_file().exists();

    std::fs::create_dir_all(&config.pipeline_dir)
        .with_context(|| format!("Failed to create {}", config.pipeline_dir.display()))?;
    if !was_initialized {
        PipelineToml::default().save(&config.config_file())?;
    }

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = CrmDb::new(&db_path).context("Failed to initialize CRM database")?;
    let stages = db.seed_default_stages()?;

    if was_initialized {
        println!(
            "Pipeline board already initialized at {}",
            config.pipeline_dir.display()
        );
    } else {
        println!(
            "Initialized pipeline board at {}",
            config.pipeline_dir.display()
        );
        println!();
        println!("Created:");
        println!("  .pipeline/");
        println!("  ├── pipeline.toml   # Configuration (see `pipeline-board config show`)");
        println!("  └── crm.db          # Deals, stages, companies and contacts");
    }

    println!();
    println!("Stages:");
    for stage in &stages {
        println!(
            "  {:<12} default probability {}%",
            stage.name,
            stage.default_probability.unwrap_or(0)
        );
    }

    if demo {
        let added = seed_demo(&db, &stages, &config.current_user())?;
        println!();
        if added == 0 {
            println!("Deals already present; sample data skipped.");
        } else {
            println!("Added {} sample deals.", added);
        }
    }

    println!();
    println!("Next steps:");
    println!("  1. Run `pipeline-board board` to see the pipeline");
    println!("  2. Run `pipeline-board serve` to start the API");

    Ok(())
}

struct DemoDeal {
    name: &'static str,
    company: &'static str,
    value: i64,
    stage: &'static str,
    mine: bool,
    probability: Option<u8>,
    close_in_days: Option<i64>,
    priority: Option<Priority>,
    tags: &'static [&'static str],
}

const DEMO_DEALS: [DemoDeal; 5] = [
    DemoDeal {
        name: "Acme Platform Expansion",
        company: "Acme",
        value: 48_000,
        stage: "Proposal",
        mine: true,
        probability: None,
        close_in_days: Some(20),
        priority: Some(Priority::High),
        tags: &["expansion"],
    },
    DemoDeal {
        name: "Globex Renewal",
        company: "Globex",
        value: 12_000,
        stage: "Negotiation",
        mine: true,
        probability: Some(80),
        close_in_days: Some(10),
        priority: Some(Priority::Medium),
        tags: &["renewal"],
    },
    DemoDeal {
        name: "Initech Pilot",
        company: "Initech",
        value: 4_500,
        stage: "Lead",
        mine: false,
        probability: None,
        close_in_days: None,
        priority: Some(Priority::Low),
        tags: &["pilot"],
    },
    DemoDeal {
        name: "Umbrella Security Suite",
        company: "Umbrella",
        value: 260_000,
        stage: "Qualified",
        mine: false,
        probability: Some(30),
        close_in_days: Some(60),
        priority: Some(Priority::Urgent),
        tags: &["enterprise"],
    },
    DemoDeal {
        name: "Acme Support Add-on",
        company: "Acme",
        value: 3_000,
        stage: "Closed Won",
        mine: true,
        probability: None,
        close_in_days: None,
        priority: None,
        tags: &[],
    },
];

/// Insert sample companies and deals into an empty database. Returns the
/// number of deals added.
fn seed_demo(db: &CrmDb, stages: &[Stage], current_user: &str) -> Result<usize> {
    if !db.list_deals(None)?.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let today = now.date_naive();
    let mut companies: HashMap<&str, CompanyRef> = HashMap::new();
    let mut added = 0;

    for demo in &DEMO_DEALS {
        let stage = stages
            .iter()
            .find(|s| s.name == demo.stage)
            .with_context(|| format!("Stage '{}' missing from catalog", demo.stage))?;
        let company = match companies.get(demo.company) {
            Some(company) => company.clone(),
            None => {
                let company = db.create_company(demo.company)?;
                companies.insert(demo.company, company.clone());
                company
            }
        };
        let contact = if demo.mine {
            Some(db.create_contact(company.id, &format!("{} buyer", demo.company))?)
        } else {
            None
        };

        let fields = NewDeal {
            name: demo.name.to_string(),
            company_id: company.id,
            contact_id: contact.map(|c| c.id),
            value: Decimal::from(demo.value),
            stage_id: stage.id,
            owner_id: if demo.mine {
                current_user.to_string()
            } else {
                "alex".to_string()
            },
            expected_close_date: demo.close_in_days.map(|d| today + Duration::days(d)),
            probability: demo.probability,
            priority: demo.priority,
            lead_source: Some("demo".to_string()),
            tags: demo.tags.iter().map(|t| t.to_string()).collect(),
        };
        db.create_deal(&fields, now)?;
        added += 1;
    }

    Ok(added)
}
