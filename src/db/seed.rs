use crate::crypto::PersonalDataCipher;
use crate::domain::models::UserRole;
use crate::passwords::hash_password;
use anyhow::{anyhow, Result};
use sqlx::PgPool;

/// Creates the bootstrap admin account when it does not exist yet.
pub async fn seed_admin(
    pool: &PgPool,
    cipher: &PersonalDataCipher,
    bootstrap: Option<&(String, String)>,
) -> Result<()> {
    let Some((email, password)) = bootstrap else {
        return Ok(());
    };

    if super::email_taken(pool, email).await? {
        tracing::debug!("Bootstrap admin {} already present", email);
        return Ok(());
    }

    let hash = hash_password(password)?;
    let enc_name = cipher
        .seal_str("Administrator")
        .map_err(|e| anyhow!("sealing admin name failed: {e}"))?;
    let admin = super::create_user(pool, email, &hash, UserRole::Admin, &enc_name).await?;
    tracing::info!("Seeded bootstrap admin {}", admin.id);
    Ok(())
}
