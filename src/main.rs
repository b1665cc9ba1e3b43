use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod attach;
mod db;
mod directory;
mod error;
#[cfg(test)]
mod memory;
mod models;
mod profile;
mod report;
mod resolver;
mod saved;
mod store;

use crate::directory::Directory;
use crate::models::{CourseId, SavedKind};
use crate::profile::ProfileAggregator;
use crate::saved::SavedItems;

#[derive(Parser)]
#[command(name = "course-directory")]
#[command(about = "Browse professors, courses and their ratings", long_about = None)]
struct Cli {
    /// Postgres connection string for the directory database
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    #[value(alias = "professors")]
    Professor,
    #[value(alias = "courses")]
    Course,
}

impl From<Target> for SavedKind {
    fn from(target: Target) -> Self {
        match target {
            Target::Professor => SavedKind::Professor,
            Target::Course => SavedKind::Course,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import rating rows from a CSV file
    ImportRatings {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import professor course lists from a CSV file
    ImportMapping {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show a professor with every course they are linked to
    Professor {
        id: String,
        #[arg(long)]
        json: bool,
        /// Write a markdown report to this path
        #[arg(long = "report")]
        out: Option<PathBuf>,
    },
    /// Show a course with every professor rated for it
    Course {
        id: String,
        #[arg(long)]
        json: bool,
        #[arg(long = "report")]
        out: Option<PathBuf>,
        /// Compare the mapping table with the ratings table for this course
        #[arg(long)]
        drift: bool,
    },
    /// Search professors or courses
    Search {
        #[arg(value_enum)]
        target: Target,
        query: String,
    },
    /// List departments grouped by school
    Departments,
    /// List professors whose department matches
    DepartmentProfessors { name: String },
    /// List courses whose code matches
    DepartmentCourses { code: String },
    /// Save a professor or course for a user
    Save {
        #[arg(value_enum)]
        kind: Target,
        id: String,
        #[arg(long)]
        user: Uuid,
    },
    /// Remove a saved professor or course
    Unsave {
        #[arg(value_enum)]
        kind: Target,
        id: String,
        #[arg(long)]
        user: Uuid,
    },
    /// Flip the saved state of a professor or course
    Toggle {
        #[arg(value_enum)]
        kind: Target,
        id: String,
        #[arg(long)]
        user: Uuid,
    },
    /// List a user's saved professors or courses
    Saved {
        #[arg(value_enum)]
        kind: Target,
        #[arg(long)]
        user: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&cli.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = Arc::new(db::PgStore::new(pool.clone()));
    let profiles = ProfileAggregator::new(store.clone());
    let directory = Directory::new(store.clone());
    let saved = SavedItems::new(store);

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportRatings { csv } => {
            let written = db::import_ratings_csv(&pool, &csv).await?;
            println!("Wrote {written} ratings from {}.", csv.display());
        }
        Commands::ImportMapping { csv } => {
            let written = db::import_mapping_csv(&pool, &csv).await?;
            println!("Wrote {written} course mappings from {}.", csv.display());
        }
        Commands::Professor { id, json, out } => {
            let profile = profiles.full_professor_profile(&id).await;

            if let Some(out) = out {
                let text = report::build_professor_report(&profile, Utc::now().date_naive());
                std::fs::write(&out, text)?;
                println!("Report written to {}.", out.display());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                let Some(professor) = profile.professor.as_ref() else {
                    println!("No professor with id {id}.");
                    return Ok(());
                };
                println!(
                    "{} ({}) overall {}",
                    professor.full_name,
                    professor.department_name.as_deref().unwrap_or("unknown department"),
                    report::format_rating_with_max(professor.rating)
                );
                for entry in profile.courses.iter() {
                    println!(
                        "- {} {}: rating {}, difficulty {}, {} reviews",
                        entry.course.course_code,
                        entry.course.course_name,
                        report::format_rating(entry.rating),
                        report::format_rating(entry.difficulty),
                        entry.num_ratings.unwrap_or(0)
                    );
                }
            }
        }
        Commands::Course {
            id,
            json,
            out,
            drift,
        } => {
            let course_id = CourseId::parse(&id);
            let profile = profiles.full_course_profile(&course_id).await;
            let drift = match (drift, profile.course.as_ref()) {
                (true, Some(course)) => Some(profiles.mapping_drift(&course.course_code).await),
                _ => None,
            };

            if let Some(out) = out {
                let text =
                    report::build_course_report(&profile, drift.as_ref(), Utc::now().date_naive());
                std::fs::write(&out, text)?;
                println!("Report written to {}.", out.display());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
                if let Some(drift) = drift.as_ref() {
                    println!("{}", serde_json::to_string_pretty(drift)?);
                }
            } else {
                let Some(course) = profile.course.as_ref() else {
                    println!("No course with id {id}.");
                    return Ok(());
                };
                println!("{} {}", course.course_code, course.course_name);
                if profile.professors.is_empty() {
                    println!("No rated professors.");
                }
                for entry in profile.professors.iter() {
                    println!(
                        "- {}: rating {}, difficulty {}, {} reviews",
                        entry.professor.full_name,
                        report::format_rating(entry.course_rating),
                        report::format_rating(entry.course_difficulty),
                        entry.course_num_ratings.unwrap_or(0)
                    );
                }
                if let Some(drift) = drift.as_ref() {
                    for name in drift.mapped_only.iter() {
                        println!("! {name} is mapped to this course but has no ratings");
                    }
                    for name in drift.rated_only.iter() {
                        println!("! {name} is rated for this course but not mapped");
                    }
                }
            }
        }
        Commands::Search { target, query } => match target {
            Target::Professor => {
                let results = directory.search_professors(&query).await;
                if results.is_empty() {
                    println!("No professors found matching your search.");
                }
                for professor in results.iter() {
                    println!(
                        "- [{}] {} ({})",
                        professor.id,
                        professor.full_name,
                        professor.department_name.as_deref().unwrap_or("-")
                    );
                }
            }
            Target::Course => {
                let results = directory.search_courses(&query).await;
                if results.is_empty() {
                    println!("No courses found matching your search.");
                }
                for course in results.iter() {
                    println!("- [{}] {} {}", course.id, course.course_code, course.course_name);
                }
            }
        },
        Commands::Departments => {
            for group in directory.departments().await {
                println!("{}:", group.category);
                for department in group.departments.iter() {
                    println!("- {} {}", department.code, department.name);
                }
            }
        }
        Commands::DepartmentProfessors { name } => {
            for professor in directory.department_professors(&name).await {
                println!("- [{}] {}", professor.id, professor.full_name);
            }
        }
        Commands::DepartmentCourses { code } => {
            for course in directory.department_courses(&code).await {
                println!("- [{}] {} {}", course.id, course.course_code, course.course_name);
            }
        }
        Commands::Save { kind, id, user } => {
            let kind = SavedKind::from(kind);
            if saved.save(user, kind, &id).await {
                println!("Saved {kind} {id}.");
            } else {
                println!("Could not save {kind} {id}.");
            }
        }
        Commands::Unsave { kind, id, user } => {
            let kind = SavedKind::from(kind);
            if saved.unsave(user, kind, &id).await {
                println!("Removed {kind} {id}.");
            } else {
                println!("Could not remove {kind} {id}.");
            }
        }
        Commands::Toggle { kind, id, user } => {
            let kind = SavedKind::from(kind);
            let state = if saved.toggle(user, kind, &id).await {
                "saved"
            } else {
                "not saved"
            };
            println!("{kind} {id} is now {state}.");
        }
        Commands::Saved { kind, user } => {
            let items = saved.list(user, SavedKind::from(kind)).await;
            if items.is_empty() {
                println!("Nothing saved.");
            }
            for item in items.iter() {
                println!("- {} (saved {})", item.item_id, item.saved_at.format("%Y-%m-%d"));
            }
        }
    }

    Ok(())
}
