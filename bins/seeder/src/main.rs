//! Database seeder for Bursar development and testing.
//!
//! Seeds a test school, departments with their source sets, sub-accounts,
//! users for every role, the standard four-stage workflow template, and its
//! bindings.
//!
//! Usage: cargo run --bin seeder

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use bursar_db::entities::{
    control_assignments, department_accounts, department_areas, department_schools, departments,
    schools, sub_accounts, template_stages, users, workflow_bindings, workflow_templates,
};

const SCHOOL_ID: i64 = 1;
const DEPT_LOGISTICS: i64 = 1;
const DEPT_NEEDED: i64 = 2;
const DEPT_COST: i64 = 3;
const DEPT_COORDINATION: i64 = 4;
const ACCOUNT_FOOD: i64 = 1;
const ACCOUNT_CLEANING: i64 = 2;
const TEMPLATE_STANDARD: i64 = 1;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding school...");
    seed_school(&db).await;

    println!("Seeding departments...");
    seed_departments(&db).await;

    println!("Seeding sub-accounts...");
    seed_sub_accounts(&db).await;

    println!("Seeding users...");
    seed_users(&db).await;

    println!("Seeding workflow template...");
    seed_template(&db).await;

    println!("Seeding control assignments...");
    seed_assignments(&db).await;

    println!("Seeding complete.");
}

async fn seed_school(db: &DatabaseConnection) {
    if schools::Entity::find_by_id(SCHOOL_ID)
        .one(db)
        .await
        .expect("query failed")
        .is_some()
    {
        return;
    }

    schools::ActiveModel {
        id: Set(SCHOOL_ID),
        name: Set("Merkez Kampüs".to_string()),
    }
    .insert(db)
    .await
    .expect("failed to seed school");
}

async fn seed_departments(db: &DatabaseConnection) {
    let rows = [
        (DEPT_LOGISTICS, "LOG", "Lojistik", "logistics"),
        (DEPT_NEEDED, "NEED", "İhtiyaç Kontrol", "needed"),
        (DEPT_COST, "COST", "Maliyet", "cost"),
        (DEPT_COORDINATION, "COORD", "Koordinasyon", ""),
    ];

    for (id, code, name, area) in rows {
        if departments::Entity::find_by_id(id)
            .one(db)
            .await
            .expect("query failed")
            .is_some()
        {
            continue;
        }

        departments::ActiveModel {
            id: Set(id),
            code: Set(code.to_string()),
            name: Set(name.to_string()),
            active: Set(true),
            notify_email: Set(Some(format!("{}@example.com", code.to_lowercase()))),
        }
        .insert(db)
        .await
        .expect("failed to seed department");

        department_schools::ActiveModel {
            department_id: Set(id),
            school_id: Set(SCHOOL_ID),
        }
        .insert(db)
        .await
        .expect("failed to seed department school");

        for account in [ACCOUNT_FOOD, ACCOUNT_CLEANING] {
            department_accounts::ActiveModel {
                department_id: Set(id),
                account_id: Set(account),
            }
            .insert(db)
            .await
            .expect("failed to seed department account");
        }

        if !area.is_empty() {
            department_areas::ActiveModel {
                department_id: Set(id),
                control_area: Set(area.to_string()),
            }
            .insert(db)
            .await
            .expect("failed to seed department area");
        }
    }
}

async fn seed_sub_accounts(db: &DatabaseConnection) {
    let rows = [
        (ACCOUNT_FOOD, "710-01", "Gıda", 710),
        (ACCOUNT_CLEANING, "730-02", "Temizlik", 730),
    ];

    for (id, code, name, master_id) in rows {
        if sub_accounts::Entity::find_by_id(id)
            .one(db)
            .await
            .expect("query failed")
            .is_some()
        {
            continue;
        }

        sub_accounts::ActiveModel {
            id: Set(id),
            code: Set(code.to_string()),
            name: Set(name.to_string()),
            master_id: Set(master_id),
        }
        .insert(db)
        .await
        .expect("failed to seed sub-account");
    }
}

async fn seed_users(db: &DatabaseConnection) {
    // (id, email, name, role, department, budget_mod)
    let rows: [(i64, &str, &str, &str, Option<i64>, Option<i64>); 7] = [
        (1, "author@example.com", "Ayşe Yılmaz", "author", None, Some(2)),
        (2, "moderator@example.com", "Mehmet Demir", "moderator", None, None),
        (3, "coordinator@example.com", "Fatma Kaya", "coordinator", Some(DEPT_COORDINATION), None),
        (4, "logistics@example.com", "Ali Çelik", "reviewer", Some(DEPT_LOGISTICS), None),
        (5, "needed@example.com", "Zeynep Arslan", "reviewer", Some(DEPT_NEEDED), None),
        (6, "cost@example.com", "Murat Doğan", "reviewer", Some(DEPT_COST), None),
        (7, "muhasebe@example.com", "Elif Şahin", "muhasebeci", None, None),
    ];

    for (id, email, name, role, department_id, budget_mod) in rows {
        if users::Entity::find_by_id(id)
            .one(db)
            .await
            .expect("query failed")
            .is_some()
        {
            continue;
        }

        users::ActiveModel {
            id: Set(id),
            email: Set(email.to_string()),
            display_name: Set(name.to_string()),
            role: Set(role.to_string()),
            school_id: Set(Some(SCHOOL_ID)),
            department_id: Set(department_id),
            budget_mod: Set(budget_mod),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await
        .expect("failed to seed user");
    }
}

async fn seed_template(db: &DatabaseConnection) {
    if workflow_templates::Entity::find_by_id(TEMPLATE_STANDARD)
        .one(db)
        .await
        .expect("query failed")
        .is_some()
    {
        return;
    }

    workflow_templates::ActiveModel {
        id: Set(TEMPLATE_STANDARD),
        name: Set("Standart Dört Aşama".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("failed to seed template");

    let stages = [
        ("logistics", 1, DEPT_LOGISTICS, false),
        ("needed", 2, DEPT_NEEDED, true),
        ("cost", 3, DEPT_COST, true),
        ("coordinator", 4, DEPT_COORDINATION, false),
    ];

    for (name, sort_order, owner, allow_revise) in stages {
        template_stages::ActiveModel {
            template_id: Set(TEMPLATE_STANDARD),
            stage_name: Set(name.to_string()),
            sort_order: Set(sort_order),
            owner_department_id: Set(owner),
            allow_revise: Set(allow_revise),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("failed to seed template stage");
    }

    for account in [ACCOUNT_FOOD, ACCOUNT_CLEANING] {
        workflow_bindings::ActiveModel {
            school_id: Set(SCHOOL_ID),
            account_id: Set(account),
            template_id: Set(TEMPLATE_STANDARD),
            priority: Set(100),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("failed to seed workflow binding");
    }
}

async fn seed_assignments(db: &DatabaseConnection) {
    let rows = [
        ("logistics", DEPT_LOGISTICS),
        ("needed", DEPT_NEEDED),
        ("cost", DEPT_COST),
    ];

    for account in [ACCOUNT_FOOD, ACCOUNT_CLEANING] {
        for (area, department_id) in rows {
            let existing = control_assignments::Entity::find()
                .all(db)
                .await
                .expect("query failed")
                .into_iter()
                .any(|r| {
                    r.school_id == SCHOOL_ID
                        && r.account_id == account
                        && r.control_area == area
                });
            if existing {
                continue;
            }

            control_assignments::ActiveModel {
                school_id: Set(SCHOOL_ID),
                account_id: Set(account),
                control_area: Set(area.to_string()),
                department_id: Set(department_id),
                ..Default::default()
            }
            .insert(db)
            .await
            .expect("failed to seed control assignment");
        }
    }
}
