use std::env;
use vitalgate::services::auth::{create_user, find_by_email, NewUser};
use vitalgate::validation::is_valid_email;
use vitalgate::{db, Config};

#[derive(Debug, Clone)]
struct Args {
    email: String,
    password: String,
    full_name: String,
    fcm_token: Option<String>,
    id: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut email = None;
    let mut password = None;
    let mut full_name = None;
    let mut fcm_token = None;
    let mut id = None;

    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |name: &str| it.next().ok_or_else(|| format!("{} requires a value", name));
        match arg.as_str() {
            "--email" => email = Some(value("--email")?),
            "--password" => password = Some(value("--password")?),
            "--full_name" => full_name = Some(value("--full_name")?),
            "--fcmToken" => fcm_token = Some(value("--fcmToken")?),
            "--id" => id = Some(value("--id")?),
            "-h" | "--help" => return Err(help_text()),
            other => return Err(format!("Unknown argument: {}\n{}", other, help_text())),
        }
    }

    let email = email.ok_or_else(|| format!("--email is required\n{}", help_text()))?;
    let password = password.ok_or_else(|| format!("--password is required\n{}", help_text()))?;
    let full_name = full_name.ok_or_else(|| format!("--full_name is required\n{}", help_text()))?;

    if !is_valid_email(&email) {
        return Err("--email must be a valid email address".to_string());
    }
    if password.chars().count() < 6 {
        return Err("--password must be at least 6 characters".to_string());
    }

    Ok(Args {
        email,
        password,
        full_name,
        fcm_token,
        id,
    })
}

fn help_text() -> String {
    [
        "Creates a user account in the configured database.",
        "",
        "Usage:",
        "  create-user --email EMAIL --password PASSWORD --full_name NAME [--fcmToken TOKEN] [--id UUID]",
        "",
        "Reads DATABASE_URL (and the rest of the server config) from the environment or .env.",
        "An existing account with the same email is left untouched.",
    ]
    .join("\n")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    let config = Config::from_env()?;
    let pool = db::connect(&config.database_url, 1).await?;
    db::run_migrations(&pool).await?;

    if let Some(existing) = find_by_email(&pool, &args.email).await? {
        println!("User {} already exists (id {})", existing.email, existing.id);
        return Ok(());
    }

    let user = create_user(
        &pool,
        NewUser {
            id: args.id,
            email: args.email,
            password: args.password,
            full_name: args.full_name,
            fcm_token: args.fcm_token,
        },
    )
    .await?;

    println!("Created user {} (id {})", user.email, user.id);
    Ok(())
}
