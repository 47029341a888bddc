//! 用户目录
//!
//! 用户由账号系统管理，账本只做存在性校验，绝不创建用户

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::UserDirectoryTrait;
use crate::error::Result;

/// 基于 users 表的用户目录实现
///
/// users 表归账号系统所有，这里只读
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectoryTrait for PgUserDirectory {
    async fn exists(&self, user_id: &str) -> Result<bool> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users WHERE id = $1
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }
}
