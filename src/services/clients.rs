use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::client::{Client, CreateClientRequest},
    services::auth::{sanitize, validate_email},
};

pub const INITIAL_STATUS: &str = "Active";

/// Validated (name, email, plan) for a new client.
fn client_input(req: &CreateClientRequest) -> Result<(String, String, String), ApiError> {
    let name = sanitize(req.name.as_deref().unwrap_or_default());
    let email = sanitize(req.email.as_deref().unwrap_or_default()).to_lowercase();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::validation("Name and email required"));
    }
    if !validate_email(&email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    let plan = req.plan.as_deref().map(sanitize).unwrap_or_default();
    Ok((name, email, plan))
}

pub struct ClientService;

impl ClientService {
    pub async fn list(pool: &PgPool, nutritionist_id: Uuid) -> Result<Vec<Client>, ApiError> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE nutritionist_id = $1 ORDER BY created_at DESC",
        )
        .bind(nutritionist_id)
        .fetch_all(pool)
        .await?;
        Ok(clients)
    }

    pub async fn create(pool: &PgPool, nutritionist_id: Uuid, req: CreateClientRequest) -> Result<Client, ApiError> {
        let (name, email, plan) = client_input(&req)?;

        let client = sqlx::query_as::<_, Client>(
            "INSERT INTO clients (nutritionist_id, name, email, plan, status)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(nutritionist_id)
        .bind(&name)
        .bind(&email)
        .bind(&plan)
        .bind(INITIAL_STATUS)
        .fetch_one(pool)
        .await?;

        tracing::info!(client_id = %client.id, nutritionist_id = %nutritionist_id, "Client added");
        Ok(client)
    }

    /// Only the owning nutritionist may remove a client; anyone else gets 404.
    pub async fn delete(pool: &PgPool, nutritionist_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let res = sqlx::query("DELETE FROM clients WHERE id = $1 AND nutritionist_id = $2")
            .bind(id)
            .bind(nutritionist_id)
            .execute(pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::not_found("Client not found"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: &str, email: &str, plan: Option<&str>) -> CreateClientRequest {
        CreateClientRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            plan: plan.map(Into::into),
        }
    }

    #[test]
    fn name_and_email_are_required() {
        assert!(client_input(&req("  ", "ana@example.com", None)).is_err());
        assert!(client_input(&req("Ana", "", None)).is_err());
        let missing = CreateClientRequest { name: None, email: None, plan: None };
        assert!(matches!(client_input(&missing), Err(ApiError::Validation(_))));
    }

    #[test]
    fn input_is_normalised() {
        let (name, email, plan) = client_input(&req(" Ana ", "Ana@Example.com ", Some(" Keto "))).unwrap();
        assert_eq!(name, "Ana");
        assert_eq!(email, "ana@example.com");
        assert_eq!(plan, "Keto");

        let (_, _, plan) = client_input(&req("Ana", "ana@example.com", None)).unwrap();
        assert_eq!(plan, "");
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert!(client_input(&req("Ana", "not-an-email", None)).is_err());
    }
}
