//! In-memory repositories - used when no database is configured and in tests.
//!
//! All repositories share one [`InMemoryStore`], so the relational rules the
//! PostgreSQL schema declares on its foreign keys are applied here explicitly:
//! uniqueness of usernames, slugs and follow pairs, referential checks on
//! save, and cascades on delete.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use yatube_core::domain::{Comment, Follow, Group, Post, User};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostFilter,
    PostRepository, UserRepository,
};

/// Rows kept in insertion order; listings sort stably on top of it.
#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
}

impl Tables {
    fn user_exists(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn post_matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    /// Filtered posts, newest first. Equal timestamps keep newest-inserted first.
    fn posts_newest_first(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .iter()
            .rev()
            .filter(|p| self.post_matches(p, filter))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    fn remove_post_cascade(&mut self, post_id: Uuid) {
        self.posts.retain(|p| p.id != post_id);
        self.comments.retain(|c| c.post_id != post_id);
    }

    fn remove_user_cascade(&mut self, user_id: Uuid) {
        let owned_posts: Vec<Uuid> = self
            .posts
            .iter()
            .filter(|p| p.author_id == user_id)
            .map(|p| p.id)
            .collect();
        for post_id in owned_posts {
            self.remove_post_cascade(post_id);
        }
        self.comments.retain(|c| c.author_id != user_id);
        self.follows
            .retain(|f| f.user_id != user_id && f.author_id != user_id);
        self.users.retain(|u| u.id != user_id);
    }

    fn remove_group_detaching_posts(&mut self, group_id: Uuid) {
        for post in self.posts.iter_mut().filter(|p| p.group_id == Some(group_id)) {
            post.group_id = None;
        }
        self.groups.retain(|g| g.id != group_id);
    }
}

/// Replace the row with the same id, or append it.
fn upsert<T: Clone>(rows: &mut Vec<T>, row: T, id_of: impl Fn(&T) -> Uuid) -> T {
    let id = id_of(&row);
    match rows.iter_mut().find(|existing| id_of(existing) == id) {
        Some(existing) => *existing = row.clone(),
        None => rows.push(row.clone()),
    }
    row
}

fn constraint(detail: &str) -> RepoError {
    RepoError::Constraint(detail.to_string())
}

/// Shared in-memory database.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            store: self.clone(),
        }
    }

    pub fn groups(&self) -> InMemoryGroupRepository {
        InMemoryGroupRepository {
            store: self.clone(),
        }
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository {
            store: self.clone(),
        }
    }

    pub fn comments(&self) -> InMemoryCommentRepository {
        InMemoryCommentRepository {
            store: self.clone(),
        }
    }

    pub fn follows(&self) -> InMemoryFollowRepository {
        InMemoryFollowRepository {
            store: self.clone(),
        }
    }
}

pub struct InMemoryUserRepository {
    store: InMemoryStore,
}

pub struct InMemoryGroupRepository {
    store: InMemoryStore,
}

pub struct InMemoryPostRepository {
    store: InMemoryStore,
}

pub struct InMemoryCommentRepository {
    store: InMemoryStore,
}

pub struct InMemoryFollowRepository {
    store: InMemoryStore,
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(constraint("users.username must be unique"));
        }
        Ok(upsert(&mut tables.users, user, |u| u.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.user_exists(id) {
            return Err(RepoError::NotFound);
        }
        tables.remove_user_cascade(id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Group, Uuid> for InMemoryGroupRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn save(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables
            .groups
            .iter()
            .any(|g| g.slug == group.slug && g.id != group.id)
        {
            return Err(constraint("groups.slug must be unique"));
        }
        Ok(upsert(&mut tables.groups, group, |g| g.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.groups.iter().any(|g| g.id == id) {
            return Err(RepoError::NotFound);
        }
        tables.remove_group_detaching_posts(id);
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .groups
            .iter()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut groups = tables.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.user_exists(post.author_id) {
            return Err(constraint("posts.author_id references a missing user"));
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.iter().any(|g| g.id == group_id) {
                return Err(constraint("posts.group_id references a missing group"));
            }
        }
        Ok(upsert(&mut tables.posts, post, |p| p.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == id) {
            return Err(RepoError::NotFound);
        }
        tables.remove_post_cascade(id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| tables.post_matches(p, filter))
            .count() as u64)
    }

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .posts_newest_first(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn save(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(constraint("comments.post_id references a missing post"));
        }
        if !tables.user_exists(comment.author_id) {
            return Err(constraint("comments.author_id references a missing user"));
        }
        Ok(upsert(&mut tables.comments, comment, |c| c.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        if tables.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}

#[async_trait]
impl BaseRepository<Follow, Uuid> for InMemoryFollowRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Follow>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.follows.iter().find(|f| f.id == id).cloned())
    }

    async fn save(&self, follow: Follow) -> Result<Follow, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.user_exists(follow.user_id) || !tables.user_exists(follow.author_id) {
            return Err(constraint("follows references a missing user"));
        }
        if tables.follows.iter().any(|f| {
            f.user_id == follow.user_id && f.author_id == follow.author_id && f.id != follow.id
        }) {
            return Err(constraint("follows (user_id, author_id) must be unique"));
        }
        Ok(upsert(&mut tables.follows, follow, |f| f.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        let before = tables.follows.len();
        tables.follows.retain(|f| f.id != id);
        if tables.follows.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl FollowRepository for InMemoryFollowRepository {
    async fn find(&self, user_id: Uuid, author_id: Uuid) -> Result<Option<Follow>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
            .cloned())
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<(Follow, bool), RepoError> {
        // Single write lock: lookup and insert cannot interleave with another caller.
        let mut tables = self.store.tables.write().await;
        if let Some(existing) = tables
            .follows
            .iter()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok((existing.clone(), false));
        }
        if !tables.user_exists(user_id) || !tables.user_exists(author_id) {
            return Err(constraint("follows references a missing user"));
        }
        let follow = Follow::new(user_id, author_id);
        tables.follows.push(follow.clone());
        Ok((follow, true))
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|f| f.author_id == author_id)
            .count() as u64)
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|f| f.user_id == user_id)
            .count() as u64)
    }
}
