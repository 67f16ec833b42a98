//! Members repository for database operations

use sqlx::{PgExecutor, Pool, Postgres};

use super::{search_clause, search_patterns};
use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, UpdateMember},
};

const SEARCH_COLUMNS: &[&str] = &["first_name", "last_name", "email"];

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List members ordered by name, optionally filtered by `?search=`
    pub async fn list(&self, search: Option<&str>) -> AppResult<Vec<Member>> {
        let patterns = search.map(search_patterns).unwrap_or_default();

        let query = format!(
            "SELECT * FROM members {} ORDER BY last_name, first_name, id",
            search_clause(SEARCH_COLUMNS, patterns.len())
        );

        let mut builder = sqlx::query_as::<_, Member>(&query);
        for pattern in &patterns {
            builder = builder.bind(pattern);
        }

        let members = builder.fetch_all(&self.pool).await?;
        Ok(members)
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Create a new member
    pub async fn create(&self, data: &CreateMember) -> AppResult<Member> {
        if email_taken(&self.pool, &data.email, None).await? {
            return Err(duplicate_email());
        }

        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (first_name, last_name, email, phone, address, joined_date, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(data.joined_date)
        .bind(data.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    /// Update a member
    pub async fn update(&self, id: i32, patch: &UpdateMember) -> AppResult<Member> {
        let mut tx = self.pool.begin().await?;

        let mut member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))?;

        member.apply(patch);

        if patch.email.is_some() && email_taken(&mut *tx, &member.email, Some(id)).await? {
            return Err(duplicate_email());
        }

        let member = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members
            SET first_name = $1, last_name = $2, email = $3, phone = $4,
                address = $5, joined_date = $6, is_active = $7
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(member.joined_date)
        .bind(member.is_active)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(member)
    }

    /// Delete a member. Refused while any borrowing references them.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowings WHERE member_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if referenced {
            return Err(AppError::Conflict(format!(
                "Member with id {} has borrowings and cannot be deleted",
                id
            )));
        }

        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        Ok(())
    }
}

/// Check if an email is already used by another member (exact match, like `members_email_key`)
async fn email_taken<'e, E>(executor: E, email: &str, exclude_id: Option<i32>) -> AppResult<bool>
where
    E: PgExecutor<'e>,
{
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM members WHERE email = $1 AND ($2::int IS NULL OR id <> $2))",
    )
    .bind(email)
    .bind(exclude_id)
    .fetch_one(executor)
    .await?;
    Ok(exists)
}

fn duplicate_email() -> AppError {
    AppError::field("email", "member with this email already exists.")
}
