use super::DBClient;
use crate::dtos::PostDto;
use uuid::Uuid;

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.timestamp, \
     u.name AS author, p.user_id AS author_id, p.is_public";

/// Post database operations. Ownership and visibility decisions are
/// made by the policy layer; these queries fetch and mutate by id.
pub trait PostExt {
    async fn get_post(&self, post_id: i32) -> Result<Option<PostDto>, sqlx::Error>;

    /// Public posts only, newest first. The listing surface for
    /// anonymous readers.
    async fn get_public_posts(&self) -> Result<Vec<PostDto>, sqlx::Error>;

    /// All posts by one user, public and private, newest first.
    async fn get_posts_by_user(&self, user_id: Uuid) -> Result<Vec<PostDto>, sqlx::Error>;

    async fn create_post(
        &self,
        user_id: Uuid,
        title: &str,
        content: &str,
        is_public: bool,
    ) -> Result<PostDto, sqlx::Error>;

    async fn edit_post(
        &self,
        post_id: i32,
        title: &str,
        content: &str,
        is_public: bool,
    ) -> Result<PostDto, sqlx::Error>;

    /// Deletes the post; its comments go with it via the schema's
    /// ON DELETE CASCADE.
    async fn delete_post(&self, post_id: i32) -> Result<(), sqlx::Error>;
}

impl PostExt for DBClient {
    async fn get_post(&self, post_id: i32) -> Result<Option<PostDto>, sqlx::Error> {
        let post = sqlx::query_as::<_, PostDto>(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             INNER JOIN users u ON p.user_id = u.id \
             WHERE p.id = $1"
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn get_public_posts(&self) -> Result<Vec<PostDto>, sqlx::Error> {
        let posts = sqlx::query_as::<_, PostDto>(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             INNER JOIN users u ON p.user_id = u.id \
             WHERE p.is_public = TRUE \
             ORDER BY p.timestamp DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn get_posts_by_user(&self, user_id: Uuid) -> Result<Vec<PostDto>, sqlx::Error> {
        let posts = sqlx::query_as::<_, PostDto>(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             INNER JOIN users u ON p.user_id = u.id \
             WHERE p.user_id = $1 \
             ORDER BY p.timestamp DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn create_post(
        &self,
        user_id: Uuid,
        title: &str,
        content: &str,
        is_public: bool,
    ) -> Result<PostDto, sqlx::Error> {
        // CTE so the response carries the author name in one round trip.
        let post = sqlx::query_as::<_, PostDto>(
            "WITH new_post AS ( \
                 INSERT INTO posts (user_id, title, content, is_public) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, title, content, timestamp, user_id, is_public \
             ) \
             SELECT np.id, np.title, np.content, np.timestamp, \
                    u.name AS author, np.user_id AS author_id, np.is_public \
             FROM new_post np \
             JOIN users u ON np.user_id = u.id",
        )
        .bind(user_id)
        .bind(title)
        .bind(content)
        .bind(is_public)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn edit_post(
        &self,
        post_id: i32,
        title: &str,
        content: &str,
        is_public: bool,
    ) -> Result<PostDto, sqlx::Error> {
        let post = sqlx::query_as::<_, PostDto>(
            "WITH updated_post AS ( \
                 UPDATE posts \
                 SET title = $1, content = $2, is_public = $3 \
                 WHERE id = $4 \
                 RETURNING id, title, content, timestamp, user_id, is_public \
             ) \
             SELECT up.id, up.title, up.content, up.timestamp, \
                    u.name AS author, up.user_id AS author_id, up.is_public \
             FROM updated_post up \
             JOIN users u ON up.user_id = u.id",
        )
        .bind(title)
        .bind(content)
        .bind(is_public)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn delete_post(&self, post_id: i32) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}
