//! Repository functions for customers and policies.

use chrono::Utc;
use risk_structs::{CreateCustomer, CreatePolicy, Customer, POLICY_STATUS_ACTIVE, Policy};
use sqlx::SqliteConnection;

/// Creates a new customer record.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_customer(
    conn: &mut SqliteConnection,
    input: &CreateCustomer,
) -> Result<Customer, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r"
        INSERT INTO customer (full_name, email, phone, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING customer_id, full_name, email, phone, created_at, updated_at
        ",
    )
    .bind(&input.full_name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

/// Finds a customer by ID.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_customer(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r"
        SELECT customer_id, full_name, email, phone, created_at, updated_at
        FROM customer
        WHERE customer_id = $1
        ",
    )
    .bind(customer_id)
    .fetch_optional(conn)
    .await
}

/// Creates a new policy record.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_policy(
    conn: &mut SqliteConnection,
    input: &CreatePolicy,
) -> Result<Policy, sqlx::Error> {
    sqlx::query_as::<_, Policy>(
        r"
        INSERT INTO policy (customer_id, product_type, base_premium, status, effective_date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING policy_id, customer_id, product_type, base_premium, status, effective_date
        ",
    )
    .bind(input.customer_id)
    .bind(&input.product_type)
    .bind(input.base_premium)
    .bind(&input.status)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

/// Finds the customer's first `ACTIVE` policy (lowest policy ID).
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_active_policy(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> Result<Option<Policy>, sqlx::Error> {
    sqlx::query_as::<_, Policy>(
        r"
        SELECT policy_id, customer_id, product_type, base_premium, status, effective_date
        FROM policy
        WHERE customer_id = $1 AND status = $2
        ORDER BY policy_id ASC
        LIMIT 1
        ",
    )
    .bind(customer_id)
    .bind(POLICY_STATUS_ACTIVE)
    .fetch_optional(conn)
    .await
}
