use std::io::{self, Write};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use rollcall_server::auth::passwords::PasswordService;
use rollcall_server::db;

#[derive(Parser, Debug)]
#[command(name = "create_user", about = "Create a Rollcall user account")]
struct Args {
    /// Email address for the account (case insensitive).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this user.
    #[arg(long)]
    password: String,

    /// Optional display name to associate with the account.
    #[arg(long)]
    name: Option<String>,

    /// Role to assign (`student`, `teacher`, or `admin`).
    #[arg(long, default_value = "student")]
    role: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let email = args.email.trim().to_lowercase();

    if !email.contains('@') {
        writeln!(io::stderr(), "error: email must contain '@'")?;
        std::process::exit(1);
    }

    let role = match args.role.trim().to_lowercase().as_str() {
        "admin" => "admin",
        "teacher" => "teacher",
        "student" => "student",
        other => {
            writeln!(
                io::stderr(),
                "error: unsupported role '{other}'. Use 'student', 'teacher', or 'admin'."
            )?;
            std::process::exit(1);
        }
    };

    let database_url = db::database_url_from_env()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or("set POSTGRES_URL (or POSTGRES_* parts, or DATABASE_URL)")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let existing =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE lower(email) = lower($1)")
            .bind(&email)
            .fetch_one(&pool)
            .await?;

    if existing > 0 {
        writeln!(
            io::stderr(),
            "error: a user with email '{email}' already exists."
        )?;
        std::process::exit(1);
    }

    let password_service = PasswordService::new().map_err(|err| {
        io::Error::new(io::ErrorKind::Other, format!("argon2 init failed: {err}"))
    })?;
    let password_hash = password_service
        .hash_password(&args.password)
        .map_err(|err| {
            io::Error::new(io::ErrorKind::Other, format!("password hash failed: {err}"))
        })?;

    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (email, name, role, password_hash) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&email)
    .bind(args.name.as_ref())
    .bind(role)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    println!("Created {role} user '{email}' with id {user_id}");
    Ok(())
}
