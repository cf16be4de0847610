use clap::{Args, Subcommand};
use dialoguer::Password;
use error_stack::{Report, ResultExt};

use crate::{
    auth::UserId,
    models::campsite::{self, CampsiteCreatePayload, CampsiteId},
    users::users::{create_new_user, UserCreatePayload},
    Error,
};

#[derive(Args, Debug)]
pub struct UtilCommand {
    /// The PostgreSQL database to connect to
    #[clap(long = "db", env = "DATABASE_URL")]
    database_url: String,

    #[clap(subcommand)]
    pub command: UtilSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum UtilSubcommand {
    /// Create a user, prompting for a password
    AddUser(AddUserCommand),
    /// Create a campsite
    AddCampsite(AddCampsiteCommand),
}

#[derive(Args, Debug)]
pub struct AddUserCommand {
    #[clap(long)]
    email: String,

    #[clap(long)]
    name: String,

    /// Mark the new user as verified
    #[clap(long)]
    verified: bool,
}

#[derive(Args, Debug)]
pub struct AddCampsiteCommand {
    #[clap(long)]
    name: String,

    #[clap(long, default_value = "")]
    description: String,

    /// Elevation in feet
    #[clap(long, default_value_t = 0)]
    elevation: i32,

    /// Feature this campsite in client applications
    #[clap(long)]
    featured: bool,
}

impl UtilCommand {
    pub async fn handle(self) -> Result<(), Report<Error>> {
        let pg_pool = sqlx::PgPool::connect(&self.database_url)
            .await
            .change_context(Error::Db)?;

        match self.command {
            UtilSubcommand::AddUser(cmd) => {
                let password = Password::new()
                    .with_prompt("Password for the new user")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()
                    .change_context(Error::Input)?;

                let user = create_new_user(
                    &pg_pool,
                    UserId::new(),
                    UserCreatePayload {
                        name: cmd.name,
                        email: cmd.email,
                        verified: cmd.verified,
                    },
                    password,
                )
                .await?;

                println!("Created user {}", user.id);
            }
            UtilSubcommand::AddCampsite(cmd) => {
                let campsite = campsite::queries::create_raw(
                    &pg_pool,
                    CampsiteId::new(),
                    CampsiteCreatePayload {
                        name: cmd.name,
                        description: cmd.description,
                        elevation: cmd.elevation,
                        featured: cmd.featured,
                    },
                )
                .await?;

                println!("Created campsite {}", campsite.id);
            }
        }

        Ok(())
    }
}
