use super::DBClient;
use crate::dtos::CommentDto;
use uuid::Uuid;

/// Comment database operations. Comments always hang off an existing
/// post (FK), and disappear with it (cascade).
pub trait CommentExt {
    /// Comments for a post, oldest first, the order a thread reads in.
    async fn get_comments(&self, post_id: i32) -> Result<Vec<CommentDto>, sqlx::Error>;

    async fn create_comment(
        &self,
        user_id: Uuid,
        post_id: i32,
        content: &str,
    ) -> Result<CommentDto, sqlx::Error>;
}

impl CommentExt for DBClient {
    async fn get_comments(&self, post_id: i32) -> Result<Vec<CommentDto>, sqlx::Error> {
        let comments = sqlx::query_as::<_, CommentDto>(
            "SELECT c.id, c.content, c.timestamp, \
                    u.name AS author, c.user_id AS author_id, c.post_id \
             FROM comments c \
             INNER JOIN users u ON c.user_id = u.id \
             WHERE c.post_id = $1 \
             ORDER BY c.timestamp ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn create_comment(
        &self,
        user_id: Uuid,
        post_id: i32,
        content: &str,
    ) -> Result<CommentDto, sqlx::Error> {
        let comment = sqlx::query_as::<_, CommentDto>(
            "WITH new_comment AS ( \
                 INSERT INTO comments (user_id, post_id, content) \
                 VALUES ($1, $2, $3) \
                 RETURNING id, content, timestamp, user_id, post_id \
             ) \
             SELECT nc.id, nc.content, nc.timestamp, \
                    u.name AS author, nc.user_id AS author_id, nc.post_id \
             FROM new_comment nc \
             JOIN users u ON nc.user_id = u.id",
        )
        .bind(user_id)
        .bind(post_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }
}
