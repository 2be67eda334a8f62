//! Authentication commands.

use std::io::{self, Write};

use anyhow::{bail, Result};
use petmatch_core::models::User;
use tracing::warn;

use super::Context;
use crate::output::{self, OutputFormat};

/// Read a line from stdin after printing `label`. `default` is used for blank input.
fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => print!("{} [{}]: ", label, default),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), default) {
        (true, Some(default)) => Ok(default.to_string()),
        (true, None) => bail!("{} is required", label),
        (false, _) => Ok(input.to_string()),
    }
}

fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("{}: ", label))?;
    if password.is_empty() {
        bail!("{} is required", label);
    }
    Ok(password)
}

fn print_user(user: &User, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            output::print_row("Username", &user.username);
            output::print_row("Email", &user.email);
            output::print_row("ID", &user.id.to_string());
        }
        OutputFormat::Json => output::print_json(user)?,
    }
    Ok(())
}

fn remember_email(ctx: &mut Context, email: &str) {
    ctx.config.last_email = Some(email.to_string());
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

/// Login with email and password.
pub async fn login(ctx: &mut Context, email: Option<String>, password: Option<String>) -> Result<()> {
    if let Some(user) = ctx.session.user() {
        output::print_success(&format!("Already logged in as {}", user.display_name()), ctx.format);
        return Ok(());
    }

    let email = match email {
        Some(email) => email,
        None => prompt("Email", ctx.config.last_email.as_deref())?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt_password("Password")?,
    };

    let user = ctx.session.login(&email, &password).await?;
    remember_email(ctx, &email);

    match ctx.format {
        OutputFormat::Text => println!("Logged in as {}", user.display_name()),
        OutputFormat::Json => output::print_json(&user)?,
    }
    Ok(())
}

/// Create an account and log in with it.
pub async fn register(
    ctx: &mut Context,
    email: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email", None)?,
    };
    let username = match username {
        Some(username) => username,
        None => prompt("Username", None)?,
    };
    let (password, confirm) = match password {
        Some(password) => (password.clone(), password),
        None => (prompt_password("Password")?, prompt_password("Confirm password")?),
    };

    let user = ctx.session.register(&email, &username, &password, &confirm).await?;
    remember_email(ctx, &email);

    match ctx.format {
        OutputFormat::Text => println!("Account created. Logged in as {}", user.display_name()),
        OutputFormat::Json => output::print_json(&user)?,
    }
    Ok(())
}

/// Logout and clear stored tokens.
pub fn logout(ctx: &Context) -> Result<()> {
    ctx.session.logout();
    output::print_success("Logged out", ctx.format);
    Ok(())
}

/// Show the logged-in user.
pub fn whoami(ctx: &Context) -> Result<()> {
    let user = ctx.require_user()?;
    print_user(&user, ctx.format)
}
