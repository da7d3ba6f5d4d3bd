use std::io::Write;

use crate::domain::events::CatalogEvent;
use crate::services::{AuthError, SignUpOutcome};
use crate::state::SharedState;

fn read_password(given: Option<&str>) -> anyhow::Result<String> {
    if let Some(password) = given {
        return Ok(password.to_string());
    }

    print!("Password: ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Expected user errors are printed; the rest propagate.
fn report(err: AuthError) -> anyhow::Result<()> {
    match err {
        AuthError::Internal(_) | AuthError::Storage(_) => Err(err.into()),
        other => {
            println!("✗ {other}");
            Ok(())
        }
    }
}

pub async fn cmd_signup(
    state: &SharedState,
    email: &str,
    password: Option<&str>,
) -> anyhow::Result<()> {
    let password = read_password(password)?;
    match state.auth.sign_up(email, &password).await {
        Ok(outcome) => {
            println!("✓ {}", outcome.message());
            if let SignUpOutcome::SignedIn { user } = outcome {
                state.publish(CatalogEvent::SessionChanged {
                    user_id: Some(user.id.to_string()),
                });
            }
            Ok(())
        }
        Err(e) => report(e),
    }
}

pub async fn cmd_login(
    state: &SharedState,
    email: &str,
    password: Option<&str>,
) -> anyhow::Result<()> {
    let password = read_password(password)?;
    match state.auth.sign_in(email, &password).await {
        Ok(user) => {
            println!("✓ Signed in as {} ({})", user.name, user.email);
            state.publish(CatalogEvent::SessionChanged {
                user_id: Some(user.id.to_string()),
            });
            Ok(())
        }
        Err(e) => report(e),
    }
}

pub async fn cmd_logout(state: &SharedState) -> anyhow::Result<()> {
    match state.auth.sign_out().await {
        Ok(()) => {
            println!("✓ Signed out");
            state.publish(CatalogEvent::SessionChanged { user_id: None });
            Ok(())
        }
        Err(e) => report(e),
    }
}

pub async fn cmd_reset_password(state: &SharedState, email: &str) -> anyhow::Result<()> {
    match state.auth.reset_password(email).await {
        Ok(()) => {
            println!("✓ Password reset email sent to {email}");
            Ok(())
        }
        Err(e) => report(e),
    }
}
