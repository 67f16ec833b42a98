//! Repository layer for database operations

pub mod books;
pub mod borrowings;
pub mod members;

use sqlx::{Pool, Postgres};

use crate::error::AppResult;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub members: members::MembersRepository,
    pub borrowings: borrowings::BorrowingsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            members: members::MembersRepository::new(pool.clone()),
            borrowings: borrowings::BorrowingsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database (readiness probe)
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Escape LIKE metacharacters so a search term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Split a `?search=` value into one `%term%` pattern per term
pub fn search_patterns(search: &str) -> Vec<String> {
    search
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(|term| format!("%{}%", escape_like(term)))
        .collect()
}

/// WHERE clause requiring every pattern to match at least one column.
///
/// Placeholders start at `$1`; bind the patterns in order.
pub fn search_clause(columns: &[&str], patterns: usize) -> String {
    if patterns == 0 {
        return String::new();
    }
    let conditions: Vec<String> = (1..=patterns)
        .map(|idx| {
            let any_column: Vec<String> = columns
                .iter()
                .map(|col| format!("{} ILIKE ${}", col, idx))
                .collect();
            format!("({})", any_column.join(" OR "))
        })
        .collect();
    format!("WHERE {}", conditions.join(" AND "))
}
