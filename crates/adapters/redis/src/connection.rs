//! Redis 连接

use redis::Client;
use redis::aio::ConnectionManager;
use warden_errors::{AppError, AppResult};

/// 建立连接管理器并确认服务端可响应
///
/// 连接失败和 PING 失败都视为外部服务错误，交由调用方重试。
pub async fn create_connection_manager(url: &str) -> AppResult<ConnectionManager> {
    let client = Client::open(url).map_err(|e| redis_error("open client", e))?;
    let mut conn = ConnectionManager::new(client)
        .await
        .map_err(|e| redis_error("connect", e))?;

    check_connection(&mut conn).await?;
    Ok(conn)
}

pub async fn check_connection(conn: &mut ConnectionManager) -> AppResult<()> {
    let pong: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| redis_error("ping", e))?;

    if pong != "PONG" {
        return Err(AppError::external_service(format!(
            "Redis ping returned unexpected reply: {pong}"
        )));
    }
    Ok(())
}

fn redis_error(op: &str, err: redis::RedisError) -> AppError {
    AppError::external_service(format!("Redis {op} failed: {err}"))
}
