use clap::{Parser, Subcommand};
use health_portal::{
    db,
    models::user::{AddressUpdate, User, UserType},
    repositories::user_repository::SqliteUserRepository,
    services::user_service::{CreateUserRequest, UpdatePasswordRequest, UserService},
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "portal-admin")]
#[command(about = "Operator tool for managing health portal accounts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List accounts
    List {
        /// Only show patients or doctors
        #[arg(short = 't', long)]
        user_type: Option<UserType>,

        /// Maximum number of users to display
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        /// Offset for pagination
        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Show every stored field of one account
    Show {
        #[arg(short, long)]
        username: String,
    },

    /// Create an account with the same checks as the signup form
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// patient or doctor
        #[arg(short = 't', long)]
        user_type: UserType,

        #[arg(long)]
        address_line1: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        state: String,

        #[arg(long)]
        pincode: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Set a new password for a user
    SetPassword {
        #[arg(short, long)]
        username: String,

        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Change any of the address fields of a user
    UpdateAddress {
        #[arg(short, long)]
        username: String,

        #[arg(long)]
        address_line1: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        pincode: Option<String>,
    },
}

fn get_password(prompt: &str) -> anyhow::Result<String> {
    use std::io::{self, Write};
    print!("{}: ", prompt);
    io::stdout().flush()?;

    Ok(rpassword::read_password()?)
}

fn confirm_password(prompt: &str) -> anyhow::Result<(String, String)> {
    let password = get_password(prompt)?;
    let confirm = get_password("Confirm password")?;
    Ok((password, confirm))
}

fn fail(message: String) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

async fn require_user(user_service: &UserService, username: &str) -> User {
    match user_service.find_user_by_username(username).await {
        Ok(Some(user)) => user,
        Ok(None) => fail(format!("User '{}' not found", username)),
        Err(err) => fail(format!("Failed to find user: {}", err)),
    }
}

fn print_user(user: &User) {
    println!("  ID: {}", user.id);
    println!("  Username: {}", user.username);
    println!("  Email: {}", user.email);
    println!("  Name: {}", user.full_name());
    println!("  User type: {}", user.user_type.label());
    println!(
        "  Address: {}, {}, {} {}",
        user.address_line1, user.city, user.state, user.pincode
    );
    println!(
        "  Profile picture: {}",
        user.profile_picture.as_deref().unwrap_or("-")
    );
    println!("  Joined: {}", user.date_joined);
    println!("  Last login: {}", user.last_login.as_deref().unwrap_or("never"));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let pool = db::create_pool().await?;
    db::run_migrations(&pool).await?;

    let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));
    let user_service = UserService::new(user_repository);

    let cli = Cli::parse();

    match cli.command {
        Commands::User { command } => match command {
            UserCommands::List {
                user_type,
                limit,
                offset,
            } => match user_service
                .list_users(user_type, Some(limit), Some(offset))
                .await
            {
                Ok(users) if users.is_empty() => println!("No users found."),
                Ok(users) => {
                    println!(
                        "{:<20} {:<32} {:<15} {:<15} {:<8}",
                        "Username", "Email", "First name", "Last name", "Type"
                    );
                    println!("{}", "-".repeat(94));
                    for user in users {
                        println!(
                            "{:<20} {:<32} {:<15} {:<15} {:<8}",
                            user.username,
                            user.email,
                            user.first_name,
                            user.last_name,
                            user.user_type
                        );
                    }
                }
                Err(err) => fail(format!("Failed to list users: {}", err)),
            },

            UserCommands::Show { username } => {
                let user = require_user(&user_service, &username).await;
                print_user(&user);
            }

            UserCommands::Create {
                username,
                email,
                first_name,
                last_name,
                user_type,
                address_line1,
                city,
                state,
                pincode,
                password,
            } => {
                let (password1, password2) = match password {
                    Some(pw) => (pw.clone(), pw),
                    None => confirm_password("Password")?,
                };

                let request = CreateUserRequest {
                    username,
                    email,
                    first_name,
                    last_name,
                    password1,
                    password2,
                    user_type: user_type.as_str().to_string(),
                    address_line1,
                    city,
                    state,
                    pincode,
                    profile_picture: None,
                };

                match user_service.create_user(request).await {
                    Ok(user) => {
                        println!("✅ User created successfully!");
                        print_user(&user);
                    }
                    Err(err) => fail(format!("Failed to create user: {}", err)),
                }
            }

            UserCommands::SetPassword { username, password } => {
                let user = require_user(&user_service, &username).await;
                let (new_password, password_confirm) = match password {
                    Some(pw) => (pw.clone(), pw),
                    None => confirm_password("New password")?,
                };

                let request = UpdatePasswordRequest {
                    user_id: user.id,
                    new_password,
                    new_password_confirm: Some(password_confirm),
                };

                match user_service.update_password(request).await {
                    Ok(()) => println!("✅ Password updated successfully for '{}'!", username),
                    Err(err) => fail(format!("Failed to update password: {}", err)),
                }
            }

            UserCommands::UpdateAddress {
                username,
                address_line1,
                city,
                state,
                pincode,
            } => {
                let update = AddressUpdate {
                    address_line1,
                    city,
                    state,
                    pincode,
                };
                if update.is_empty() {
                    fail("Nothing to update: pass at least one address field".to_string());
                }

                let user = require_user(&user_service, &username).await;
                match user_service.update_address(user.id, update).await {
                    Ok(()) => println!("✅ Address updated for '{}'!", username),
                    Err(err) => fail(format!("Failed to update address: {}", err)),
                }
            }
        },
    }

    Ok(())
}
