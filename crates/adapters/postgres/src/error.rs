//! sqlx 错误映射

use warden_errors::AppError;

/// 将 sqlx 错误映射为 `AppError`
///
/// 唯一约束冲突映射为 `Conflict`，调用方据此识别重复键；其余均为 `Database`。
pub fn map_sqlx_error(context: &str, err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::conflict(format!(
            "{}: unique constraint {} violated",
            context,
            db.constraint().unwrap_or("<unknown>")
        )),
        _ => AppError::database(format!("{}: {}", context, err)),
    }
}
