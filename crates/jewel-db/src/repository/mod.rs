//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.bills().create(new_bill, day, now)                         │
//! │       ▼                                                                 │
//! │  BillRepository                                                        │
//! │  ├── create(&self, bill, day, now)   ← one transaction                 │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── search(&self, query)                                              │
//! │  └── list_between(&self, range)                                        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD (soft delete)
//! - [`bill::BillRepository`] - Bills, items, bill number sequence
//! - [`user::UserRepository`] - Accounts and admin bootstrap

pub mod bill;
pub mod product;
pub mod user;

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("PJ/2024"), "%PJ/2024%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
